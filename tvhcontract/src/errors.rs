use thiserror::Error;

/// Failure reported by a [`TvStore`](crate::store::TvStore) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("TV store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Transient failure of the external store, the caller may retry.
    #[error("TV store unavailable: {0}")]
    StoreUnavailable(String),
    /// The resource URI does not carry the expected kind.
    #[error("Invalid resource URI kind: {0}")]
    InvalidUriKind(String),
}

impl RegistryError {
    pub fn invalid_uri_kind(uri: &str) -> Self {
        RegistryError::InvalidUriKind(uri.to_string())
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => RegistryError::StoreUnavailable(msg),
        }
    }
}

use thiserror::Error;
use tvhcontract::{RegistryError, ResourceUri};

use crate::htsp::TransportError;

/// Failure while opening a data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The registry has no row behind the URI (never existed or deleted).
    #[error("Resource not found: {0}")]
    ResourceNotFound(ResourceUri),
    #[error("Subscription refused by server: {0}")]
    SubscriptionRefused(String),
    #[error("TV store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Invalid resource URI kind: {0}")]
    InvalidUriKind(String),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<RegistryError> for OpenError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::StoreUnavailable(msg) => OpenError::StoreUnavailable(msg),
            RegistryError::InvalidUriKind(msg) => OpenError::InvalidUriKind(msg),
        }
    }
}

/// Failure reported by an open data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    #[error("Unsupported speed: {0}")]
    UnsupportedSpeed(i32),
    #[error("Data source is not open")]
    NotOpen,
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<TransportError> for DataSourceError {
    fn from(err: TransportError) -> Self {
        DataSourceError::Transport(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error("Player has been released")]
    Released,
    #[error("Player controller thread is gone")]
    ControllerGone,
    #[error("Cannot spawn player controller: {0}")]
    Spawn(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackExceptionKind {
    /// Loading or parsing the stream failed.
    Source,
    /// A decoder or renderer failed.
    Renderer,
    Unexpected,
}

/// Fatal error reported by the decode/render pipeline.
///
/// The controller does not retry: the error is handed verbatim to the
/// listener.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?} playback error: {message}")]
pub struct PlaybackException {
    pub kind: PlaybackExceptionKind,
    pub message: String,
}

impl PlaybackException {
    pub fn new(kind: PlaybackExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

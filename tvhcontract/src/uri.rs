//! Resource URI codec.
//!
//! A resource URI addresses one row of the TV provider store. Its textual
//! form is `{kind}/{row_id}`, for instance `channel/42` or `recording/7`.
//! Callers treat it as opaque: only the registry and the player look inside.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::RegistryError;

/// Kind of row a [`ResourceUri`] points to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UriKind {
    Channel,
    Program,
    Recording,
}

impl UriKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UriKind::Channel => "channel",
            UriKind::Program => "program",
            UriKind::Recording => "recording",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "channel" => Some(UriKind::Channel),
            "program" => Some(UriKind::Program),
            "recording" => Some(UriKind::Recording),
            _ => None,
        }
    }
}

impl fmt::Display for UriKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle on a channel, program or recording row.
///
/// Row ids are never recycled by the store, but the external numbers they
/// map to may be: resolve again rather than caching URIs long term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceUri {
    Channel(u64),
    Program(u64),
    Recording(u64),
}

impl ResourceUri {
    pub fn encode(kind: UriKind, row_id: u64) -> Self {
        match kind {
            UriKind::Channel => ResourceUri::Channel(row_id),
            UriKind::Program => ResourceUri::Program(row_id),
            UriKind::Recording => ResourceUri::Recording(row_id),
        }
    }

    /// Parses the textual `{kind}/{row_id}` form.
    pub fn decode(uri: &str) -> Result<Self, RegistryError> {
        let (tag, id) = uri
            .trim()
            .trim_matches('/')
            .split_once('/')
            .ok_or_else(|| RegistryError::invalid_uri_kind(uri))?;

        let kind = UriKind::from_tag(tag).ok_or_else(|| RegistryError::invalid_uri_kind(uri))?;
        let row_id = id
            .parse::<u64>()
            .map_err(|_| RegistryError::invalid_uri_kind(uri))?;

        Ok(Self::encode(kind, row_id))
    }

    pub fn kind(&self) -> UriKind {
        match self {
            ResourceUri::Channel(_) => UriKind::Channel,
            ResourceUri::Program(_) => UriKind::Program,
            ResourceUri::Recording(_) => UriKind::Recording,
        }
    }

    pub fn row_id(&self) -> u64 {
        match self {
            ResourceUri::Channel(id) | ResourceUri::Program(id) | ResourceUri::Recording(id) => *id,
        }
    }

    /// Returns the row id if this URI has the expected kind.
    pub fn expect_kind(&self, kind: UriKind) -> Result<u64, RegistryError> {
        if self.kind() == kind {
            Ok(self.row_id())
        } else {
            Err(RegistryError::InvalidUriKind(format!(
                "{} (expected {})",
                self, kind
            )))
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.row_id())
    }
}

impl FromStr for ResourceUri {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<String> for ResourceUri {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::decode(&value)
    }
}

impl From<ResourceUri> for String {
    fn from(uri: ResourceUri) -> Self {
        uri.to_string()
    }
}

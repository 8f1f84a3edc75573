//! Read/delete interface onto the TV provider store.
//!
//! The store is the system of record for channels, programs and recordings.
//! Rows are created and updated by the EPG/DVR synchronisation path; this
//! crate only ever reads and deletes them.

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Row of the channels table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRow {
    pub id: u64,
    pub input_id: String,
    /// Tvheadend channel id, stored in the original network id column.
    pub original_network_id: i32,
    pub display_name: String,
}

/// Row of the programs table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRow {
    pub id: u64,
    pub channel_id: u64,
    /// Tvheadend event id, stored as text.
    pub internal_provider_data: Option<String>,
}

/// Row of the recorded programs table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingRow {
    pub id: u64,
    /// Tvheadend DVR entry id, stored as text.
    pub internal_provider_data: Option<String>,
}

/// Queries used by the identity registry.
///
/// Row-addressed queries return every matching row: zero rows means the
/// resource does not exist (or was deleted meanwhile), which is not an error.
pub trait TvStore: Send + Sync {
    fn channels(&self, input_id: &str) -> Result<Vec<ChannelRow>, StoreError>;

    fn channel(&self, row_id: u64) -> Result<Vec<ChannelRow>, StoreError>;

    fn programs(&self, channel_row_id: u64) -> Result<Vec<ProgramRow>, StoreError>;

    fn program(&self, row_id: u64) -> Result<Vec<ProgramRow>, StoreError>;

    fn recordings(&self) -> Result<Vec<RecordingRow>, StoreError>;

    fn recording(&self, row_id: u64) -> Result<Vec<RecordingRow>, StoreError>;

    /// Deletes a channel row, returns the number of deleted rows.
    fn delete_channel(&self, row_id: u64) -> Result<usize, StoreError>;

    /// Deletes a recording row, returns the number of deleted rows.
    fn delete_recording(&self, row_id: u64) -> Result<usize, StoreError>;

    /// Raw logo image attached to a channel, if any.
    fn channel_logo(&self, row_id: u64) -> Result<Option<Vec<u8>>, StoreError>;
}

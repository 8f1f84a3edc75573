//! Identity registry between Tvheadend identifiers and TV provider rows.
//!
//! Tvheadend addresses channels by channel id, EPG events by event id and
//! recordings by DVR entry id. The TV provider addresses the same things by
//! row id. Every lookup here is a fresh scan of the store: nothing is
//! cached, so two consecutive single-row lookups may observe different
//! store states. Use the `build_*_map` calls for a consistent snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::RegistryError;
use crate::store::{ProgramRow, RecordingRow, TvStore};
use crate::uri::{ResourceUri, UriKind};

#[derive(Clone)]
pub struct IdentityRegistry {
    store: Arc<dyn TvStore>,
    input_id: String,
}

impl std::fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("input_id", &self.input_id)
            .finish()
    }
}

fn parse_provider_data(row_id: u64, data: Option<&str>) -> Option<i32> {
    let data = data?;
    match data.trim().parse::<i32>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(row_id, provider_data = data, "Ignoring row with non numeric provider data");
            None
        }
    }
}

fn first_of<T>(uri: &ResourceUri, mut rows: Vec<T>) -> Option<T> {
    // Several rows for one row id should not happen: keep the first one,
    // but leave a trace since callers cannot tell the two cases apart.
    if rows.len() > 1 {
        warn!(%uri, rows = rows.len(), "Row-addressed query returned several rows, using the first");
    }
    if rows.is_empty() {
        None
    } else {
        Some(rows.swap_remove(0))
    }
}

impl IdentityRegistry {
    pub fn new(store: Arc<dyn TvStore>, input_id: impl Into<String>) -> Self {
        Self {
            store,
            input_id: input_id.into(),
        }
    }

    pub fn input_id(&self) -> &str {
        &self.input_id
    }

    pub fn store(&self) -> &Arc<dyn TvStore> {
        &self.store
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Row id of the first channel of this input carrying `channel_number`.
    fn channel_row_id(&self, channel_number: i32) -> Result<Option<u64>, RegistryError> {
        Ok(self
            .store
            .channels(&self.input_id)?
            .into_iter()
            .find(|row| row.original_network_id == channel_number)
            .map(|row| row.id))
    }

    /// Resolves a Tvheadend channel id to its channel URI.
    pub fn resolve_channel_row(
        &self,
        channel_number: i32,
    ) -> Result<Option<ResourceUri>, RegistryError> {
        Ok(self
            .channel_row_id(channel_number)?
            .map(ResourceUri::Channel))
    }

    pub fn resolve_channel_name(&self, channel_number: i32) -> Result<Option<String>, RegistryError> {
        Ok(self
            .store
            .channels(&self.input_id)?
            .into_iter()
            .find(|row| row.original_network_id == channel_number)
            .map(|row| row.display_name))
    }

    /// Tvheadend channel id behind a channel URI.
    ///
    /// Rows owned by another input resolve to `None`.
    pub fn reverse_resolve_channel(&self, uri: &ResourceUri) -> Result<Option<i32>, RegistryError> {
        let row_id = uri.expect_kind(UriKind::Channel)?;
        let rows: Vec<_> = self
            .store
            .channel(row_id)?
            .into_iter()
            .filter(|row| row.input_id == self.input_id)
            .collect();
        Ok(first_of(uri, rows).map(|row| row.original_network_id))
    }

    /// Maps every Tvheadend channel id of this input to its channel URI.
    ///
    /// If two rows share a channel id, the last one scanned wins.
    pub fn build_channel_map(&self) -> Result<HashMap<i32, ResourceUri>, RegistryError> {
        Ok(self
            .store
            .channels(&self.input_id)?
            .into_iter()
            .map(|row| (row.original_network_id, ResourceUri::Channel(row.id)))
            .collect())
    }

    /// Deletes every channel of this input. Returns the number of rows removed.
    ///
    /// URIs handed out before this call become dangling.
    pub fn remove_all_channels(&self) -> Result<usize, RegistryError> {
        let mut removed = 0;
        for row in self.store.channels(&self.input_id)? {
            debug!(row_id = row.id, "Deleting channel");
            removed += self.store.delete_channel(row.id)?;
        }
        Ok(removed)
    }

    /// Logo of the channel carrying `channel_number`, if one is stored.
    pub fn channel_logo(&self, channel_number: i32) -> Result<Option<Vec<u8>>, RegistryError> {
        match self.channel_row_id(channel_number)? {
            Some(row_id) => Ok(self.store.channel_logo(row_id)?),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Programs
    // =========================================================================

    /// Resolves an EPG event of a channel to its program URI.
    pub fn resolve_program_row(
        &self,
        channel_number: i32,
        event_id: i32,
    ) -> Result<Option<ResourceUri>, RegistryError> {
        let Some(channel_row_id) = self.channel_row_id(channel_number)? else {
            warn!(channel_number, event_id, "Failed to resolve program, unknown channel");
            return Ok(None);
        };

        Ok(self
            .store
            .programs(channel_row_id)?
            .into_iter()
            .find(|row| parse_provider_data(row.id, row.internal_provider_data.as_deref()) == Some(event_id))
            .map(|row| ResourceUri::Program(row.id)))
    }

    /// Tvheadend event id behind a program URI.
    pub fn reverse_resolve_program(&self, uri: &ResourceUri) -> Result<Option<i32>, RegistryError> {
        let row_id = uri.expect_kind(UriKind::Program)?;
        let rows = self.store.program(row_id)?;
        Ok(first_of(uri, rows)
            .and_then(|row| parse_provider_data(row.id, row.internal_provider_data.as_deref())))
    }

    fn program_map_for_channel(
        &self,
        channel_row_id: u64,
    ) -> Result<HashMap<i32, ResourceUri>, RegistryError> {
        Ok(self
            .store
            .programs(channel_row_id)?
            .into_iter()
            .filter_map(|row: ProgramRow| {
                parse_provider_data(row.id, row.internal_provider_data.as_deref())
                    .map(|event_id| (event_id, ResourceUri::Program(row.id)))
            })
            .collect())
    }

    /// Maps every known event id to its program URI, across all channels.
    pub fn build_program_map(&self) -> Result<HashMap<i32, ResourceUri>, RegistryError> {
        let mut program_map = HashMap::new();
        for channel in self.store.channels(&self.input_id)? {
            program_map.extend(self.program_map_for_channel(channel.id)?);
        }
        Ok(program_map)
    }

    // =========================================================================
    // Recordings
    // =========================================================================

    /// Resolves a DVR entry id to its recording URI.
    pub fn resolve_recording_row(
        &self,
        dvr_entry_id: i32,
    ) -> Result<Option<ResourceUri>, RegistryError> {
        Ok(self
            .store
            .recordings()?
            .into_iter()
            .find(|row| parse_provider_data(row.id, row.internal_provider_data.as_deref()) == Some(dvr_entry_id))
            .map(|row| ResourceUri::Recording(row.id)))
    }

    /// DVR entry id behind a recording URI.
    pub fn reverse_resolve_recording(&self, uri: &ResourceUri) -> Result<Option<i32>, RegistryError> {
        let row_id = uri.expect_kind(UriKind::Recording)?;
        let rows = self.store.recording(row_id)?;
        Ok(first_of(uri, rows)
            .and_then(|row| parse_provider_data(row.id, row.internal_provider_data.as_deref())))
    }

    pub fn build_recording_map(&self) -> Result<HashMap<i32, ResourceUri>, RegistryError> {
        Ok(self
            .store
            .recordings()?
            .into_iter()
            .filter_map(|row: RecordingRow| {
                parse_provider_data(row.id, row.internal_provider_data.as_deref())
                    .map(|entry_id| (entry_id, ResourceUri::Recording(row.id)))
            })
            .collect())
    }

    /// Deletes every recorded program. Returns the number of rows removed.
    pub fn remove_all_recordings(&self) -> Result<usize, RegistryError> {
        let mut removed = 0;
        for row in self.store.recordings()? {
            debug!(row_id = row.id, "Deleting recorded program");
            removed += self.store.delete_recording(row.id)?;
        }
        Ok(removed)
    }
}

//! In-memory [`TvStore`] used by tests, demos and headless setups.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

use crate::errors::StoreError;
use crate::store::{ChannelRow, ProgramRow, RecordingRow, TvStore};

#[derive(Debug, Default)]
struct Tables {
    channels: BTreeMap<u64, ChannelRow>,
    programs: BTreeMap<u64, ProgramRow>,
    recordings: BTreeMap<u64, RecordingRow>,
    logos: BTreeMap<u64, Vec<u8>>,
}

/// Thread-safe store keeping every table in memory.
///
/// Row ids come from a single monotonic counter and are never reused.
#[derive(Debug)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicU64,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates the store going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store offline".to_string()))
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Moves the id counter forward so the next row gets at least `row_id`.
    pub fn reserve_ids_up_to(&self, row_id: u64) {
        self.next_id.fetch_max(row_id, Ordering::SeqCst);
    }

    pub fn insert_channel(&self, input_id: &str, channel_number: i32, display_name: &str) -> u64 {
        let id = self.allocate_id();
        let row = ChannelRow {
            id,
            input_id: input_id.to_string(),
            original_network_id: channel_number,
            display_name: display_name.to_string(),
        };
        self.write().channels.insert(id, row);
        id
    }

    pub fn insert_program(&self, channel_row_id: u64, event_id: i32) -> u64 {
        self.insert_program_raw(channel_row_id, Some(event_id.to_string()))
    }

    /// Inserts a program whose provider data is stored verbatim.
    pub fn insert_program_raw(&self, channel_row_id: u64, provider_data: Option<String>) -> u64 {
        let id = self.allocate_id();
        let row = ProgramRow {
            id,
            channel_id: channel_row_id,
            internal_provider_data: provider_data,
        };
        self.write().programs.insert(id, row);
        id
    }

    pub fn insert_recording(&self, dvr_entry_id: i32) -> u64 {
        let id = self.allocate_id();
        let row = RecordingRow {
            id,
            internal_provider_data: Some(dvr_entry_id.to_string()),
        };
        self.write().recordings.insert(id, row);
        id
    }

    pub fn set_channel_logo(&self, channel_row_id: u64, logo: Vec<u8>) {
        self.write().logos.insert(channel_row_id, logo);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().expect("TV store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().expect("TV store lock poisoned")
    }
}

impl TvStore for InMemoryStore {
    fn channels(&self, input_id: &str) -> Result<Vec<ChannelRow>, StoreError> {
        self.check_available()?;
        Ok(self
            .read()
            .channels
            .values()
            .filter(|row| row.input_id == input_id)
            .cloned()
            .collect())
    }

    fn channel(&self, row_id: u64) -> Result<Vec<ChannelRow>, StoreError> {
        self.check_available()?;
        Ok(self.read().channels.get(&row_id).cloned().into_iter().collect())
    }

    fn programs(&self, channel_row_id: u64) -> Result<Vec<ProgramRow>, StoreError> {
        self.check_available()?;
        Ok(self
            .read()
            .programs
            .values()
            .filter(|row| row.channel_id == channel_row_id)
            .cloned()
            .collect())
    }

    fn program(&self, row_id: u64) -> Result<Vec<ProgramRow>, StoreError> {
        self.check_available()?;
        Ok(self.read().programs.get(&row_id).cloned().into_iter().collect())
    }

    fn recordings(&self) -> Result<Vec<RecordingRow>, StoreError> {
        self.check_available()?;
        Ok(self.read().recordings.values().cloned().collect())
    }

    fn recording(&self, row_id: u64) -> Result<Vec<RecordingRow>, StoreError> {
        self.check_available()?;
        Ok(self.read().recordings.get(&row_id).cloned().into_iter().collect())
    }

    fn delete_channel(&self, row_id: u64) -> Result<usize, StoreError> {
        self.check_available()?;
        let mut tables = self.write();
        let deleted = tables.channels.remove(&row_id).map_or(0, |_| 1);
        // Programs and logo follow their channel
        tables.programs.retain(|_, program| program.channel_id != row_id);
        tables.logos.remove(&row_id);
        debug!(row_id, deleted, "Deleted channel row");
        Ok(deleted)
    }

    fn delete_recording(&self, row_id: u64) -> Result<usize, StoreError> {
        self.check_available()?;
        let deleted = self.write().recordings.remove(&row_id).map_or(0, |_| 1);
        debug!(row_id, deleted, "Deleted recording row");
        Ok(deleted)
    }

    fn channel_logo(&self, row_id: u64) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        Ok(self.read().logos.get(&row_id).cloned())
    }
}

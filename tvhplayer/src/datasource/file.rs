use std::sync::Arc;

use tracing::{debug, info, warn};
use tvhcontract::{IdentityRegistry, ResourceUri};

use crate::datasource::DataSource;
use crate::errors::{DataSourceError, OpenError};
use crate::htsp::{FileHandle, HtspTransport, TransportError};
use crate::model::SourceKind;
use crate::speed::{NORMAL_RATE, is_supported_rate};

/// Server-side path of a DVR entry file.
pub fn dvr_file_path(dvr_entry_id: i32) -> String {
    format!("dvrfile/{}", dvr_entry_id)
}

/// Recording read through the server's file interface.
///
/// Recordings have no timeshift buffer: speed changes are applied by the
/// pipeline only, the source just keeps track of them.
pub struct FileDataSource {
    transport: Arc<dyn HtspTransport>,
    registry: IdentityRegistry,
    uri: Option<ResourceUri>,
    file: Option<FileHandle>,
    position: u64,
    rate: i32,
}

impl FileDataSource {
    pub fn new(transport: Arc<dyn HtspTransport>, registry: IdentityRegistry) -> Self {
        Self {
            transport,
            registry,
            uri: None,
            file: None,
            position: 0,
            rate: NORMAL_RATE,
        }
    }

    pub fn file(&self) -> Option<FileHandle> {
        self.file
    }

    /// Bytes read so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn rate(&self) -> i32 {
        self.rate
    }
}

impl DataSource for FileDataSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Recording
    }

    fn uri(&self) -> Option<ResourceUri> {
        self.uri
    }

    fn open(&mut self, uri: &ResourceUri) -> Result<(), OpenError> {
        if self.file.is_some() {
            self.close();
        }

        let dvr_entry_id = self
            .registry
            .reverse_resolve_recording(uri)?
            .ok_or(OpenError::ResourceNotFound(*uri))?;

        let path = dvr_file_path(dvr_entry_id);
        let handle = self.transport.file_open(&path).map_err(|err| match err {
            TransportError::NotFound(_) => OpenError::ResourceNotFound(*uri),
            other => OpenError::Transport(other.to_string()),
        })?;

        info!(file_id = handle.id, path = %path, size = ?handle.size, "Opened recording");
        self.uri = Some(*uri);
        self.file = Some(handle);
        self.position = 0;
        self.rate = NORMAL_RATE;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DataSourceError> {
        let handle = self.file.ok_or(DataSourceError::NotOpen)?;
        let chunk = self.transport.file_read(handle.id, buf.len())?;
        let count = chunk.len().min(buf.len());
        buf[..count].copy_from_slice(&chunk[..count]);
        self.position += count as u64;
        Ok(count)
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn set_speed(&mut self, rate: i32) -> Result<(), DataSourceError> {
        if !is_supported_rate(rate) {
            return Err(DataSourceError::UnsupportedSpeed(rate));
        }
        if self.file.is_none() {
            return Err(DataSourceError::NotOpen);
        }
        self.rate = rate;
        Ok(())
    }

    fn timeshift_start_time(&self) -> Option<i64> {
        None
    }

    fn timeshift_start_pts(&self) -> i64 {
        0
    }

    fn timeshift_offset_pts(&self) -> Option<i64> {
        None
    }

    fn close(&mut self) {
        let Some(handle) = self.file.take() else {
            return;
        };
        if let Err(err) = self.transport.file_close(handle.id) {
            warn!(file_id = handle.id, "Failed to close recording: {}", err);
        }
        debug!(file_id = handle.id, read = self.position, "Recording closed");
    }
}

impl Drop for FileDataSource {
    fn drop(&mut self) {
        self.close();
    }
}

//! Seam onto the HTSP connection.
//!
//! The wire protocol itself lives elsewhere: data sources only need a
//! handful of request/response calls, plus the asynchronous subscription
//! messages the connection routes back to them.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request refused: {0}")]
    Refused(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Connection lost")]
    Disconnected,
}

/// Parameters of a `subscribe` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubscribeRequest {
    pub subscription_id: u32,
    pub channel_id: i32,
    pub profile: String,
    /// Requested timeshift buffer, 0 disables timeshift.
    pub timeshift_period_secs: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHandle {
    pub id: u32,
    pub size: Option<u64>,
}

/// Blocking request/response calls used by the data sources.
pub trait HtspTransport: Send + Sync {
    fn subscribe(&self, request: &SubscribeRequest) -> Result<(), TransportError>;

    fn unsubscribe(&self, subscription_id: u32) -> Result<(), TransportError>;

    /// Sets the subscription speed, in hundredths (0 pauses).
    fn subscription_speed(&self, subscription_id: u32, speed: i32) -> Result<(), TransportError>;

    fn file_open(&self, path: &str) -> Result<FileHandle, TransportError>;

    /// Reads at most `size` bytes. An empty result means end of file.
    fn file_read(&self, file_id: u32, size: usize) -> Result<Vec<u8>, TransportError>;

    fn file_close(&self, file_id: u32) -> Result<(), TransportError>;
}

/// Server timeshift report. Times are in microseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TimeshiftStatus {
    pub full: bool,
    /// Signed distance to the live edge, negative when behind live. Absent
    /// while the buffer is still filling.
    pub shift: Option<i64>,
    /// Oldest PTS still in the timeshift buffer.
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Asynchronous messages the connection routes to a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Start,
    TimeshiftStatus(TimeshiftStatus),
    MuxPacket { pts: i64, payload: Vec<u8> },
    Stop { reason: Option<String> },
}

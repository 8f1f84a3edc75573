//! Data sources feeding the pipeline, and the factories handing them out.
//!
//! There are two concrete sources: live subscriptions and recording
//! files. Both sit behind [`HtspDataSource`] so the controller can hold
//! either without knowing which one it got.

mod factory;
mod file;
mod subscription;

use std::sync::{Arc, Mutex};

use tvhcontract::ResourceUri;

use crate::errors::{DataSourceError, OpenError};
use crate::htsp::SubscriptionEvent;
use crate::model::SourceKind;
use crate::pipeline::PipelineEventSink;

pub use factory::{DataSourceFactory, HtspDataSourceFactory};
pub use file::{FileDataSource, dvr_file_path};
pub use subscription::SubscriptionDataSource;

/// Source settings taken from the player configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSettings {
    pub stream_profile: String,
    pub timeshift_period_secs: u32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            stream_profile: "htsp".to_string(),
            timeshift_period_secs: 3600,
        }
    }
}

/// Byte stream plus timeshift bookkeeping for one opened resource.
///
/// Timestamps are in microseconds, like on the wire.
pub trait DataSource {
    fn kind(&self) -> SourceKind;

    /// URI passed to the last successful `open`.
    fn uri(&self) -> Option<ResourceUri>;

    fn open(&mut self, uri: &ResourceUri) -> Result<(), OpenError>;

    /// Copies buffered bytes into `buf`. Zero means nothing is available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DataSourceError>;

    /// Idempotent.
    fn pause(&mut self);

    fn resume(&mut self);

    /// `rate` is in hundredths and must be one of the supported rates.
    fn set_speed(&mut self, rate: i32) -> Result<(), DataSourceError>;

    /// Wall time matching the stream start, if known.
    fn timeshift_start_time(&self) -> Option<i64>;

    /// Oldest seekable PTS.
    fn timeshift_start_pts(&self) -> i64;

    /// Signed distance to live, when the server reported one.
    fn timeshift_offset_pts(&self) -> Option<i64>;

    /// Releases the server-side resource. Idempotent.
    fn close(&mut self);
}

pub enum HtspDataSource {
    Subscription(SubscriptionDataSource),
    File(FileDataSource),
}

/// Data source shared between the factory, the controller and the pipeline.
pub type SharedDataSource = Arc<Mutex<HtspDataSource>>;

impl HtspDataSource {
    pub fn is_subscription(&self) -> bool {
        matches!(self, HtspDataSource::Subscription(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, HtspDataSource::File(_))
    }

    pub fn subscription_id(&self) -> Option<u32> {
        match self {
            HtspDataSource::Subscription(source) => Some(source.subscription_id()),
            HtspDataSource::File(_) => None,
        }
    }

    pub fn as_subscription(&self) -> Option<&SubscriptionDataSource> {
        match self {
            HtspDataSource::Subscription(source) => Some(source),
            HtspDataSource::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileDataSource> {
        match self {
            HtspDataSource::File(source) => Some(source),
            HtspDataSource::Subscription(_) => None,
        }
    }

    /// Hands the session sink to the source. Files never report
    /// asynchronous failures, so only subscriptions keep it.
    pub fn attach_events(&mut self, events: PipelineEventSink) {
        if let HtspDataSource::Subscription(source) = self {
            source.attach_events(events);
        }
    }

    /// Routes a subscription message. Files ignore them.
    pub fn handle_event(&mut self, event: SubscriptionEvent) {
        if let HtspDataSource::Subscription(source) = self {
            source.handle_event(event);
        }
    }
}

impl DataSource for HtspDataSource {
    fn kind(&self) -> SourceKind {
        match self {
            HtspDataSource::Subscription(source) => source.kind(),
            HtspDataSource::File(source) => source.kind(),
        }
    }

    fn uri(&self) -> Option<ResourceUri> {
        match self {
            HtspDataSource::Subscription(source) => source.uri(),
            HtspDataSource::File(source) => source.uri(),
        }
    }

    fn open(&mut self, uri: &ResourceUri) -> Result<(), OpenError> {
        match self {
            HtspDataSource::Subscription(source) => source.open(uri),
            HtspDataSource::File(source) => source.open(uri),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DataSourceError> {
        match self {
            HtspDataSource::Subscription(source) => source.read(buf),
            HtspDataSource::File(source) => source.read(buf),
        }
    }

    fn pause(&mut self) {
        match self {
            HtspDataSource::Subscription(source) => source.pause(),
            HtspDataSource::File(source) => source.pause(),
        }
    }

    fn resume(&mut self) {
        match self {
            HtspDataSource::Subscription(source) => source.resume(),
            HtspDataSource::File(source) => source.resume(),
        }
    }

    fn set_speed(&mut self, rate: i32) -> Result<(), DataSourceError> {
        match self {
            HtspDataSource::Subscription(source) => source.set_speed(rate),
            HtspDataSource::File(source) => source.set_speed(rate),
        }
    }

    fn timeshift_start_time(&self) -> Option<i64> {
        match self {
            HtspDataSource::Subscription(source) => source.timeshift_start_time(),
            HtspDataSource::File(source) => source.timeshift_start_time(),
        }
    }

    fn timeshift_start_pts(&self) -> i64 {
        match self {
            HtspDataSource::Subscription(source) => source.timeshift_start_pts(),
            HtspDataSource::File(source) => source.timeshift_start_pts(),
        }
    }

    fn timeshift_offset_pts(&self) -> Option<i64> {
        match self {
            HtspDataSource::Subscription(source) => source.timeshift_offset_pts(),
            HtspDataSource::File(source) => source.timeshift_offset_pts(),
        }
    }

    fn close(&mut self) {
        match self {
            HtspDataSource::Subscription(source) => source.close(),
            HtspDataSource::File(source) => source.close(),
        }
    }
}

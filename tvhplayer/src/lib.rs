//! # tvhplayer
//!
//! Timeshift-aware playback of Tvheadend live channels and recordings.
//!
//! - [`PlayerController`]: command handle on the controller thread.
//! - [`datasource`]: live subscription and recording file sources, and the
//!   factories handing them out one at a time.
//! - [`Pipeline`], [`HtspTransport`], [`PlayerListener`]: seams onto the
//!   decoder, the server connection and the owner of the player.

pub mod clock;
pub mod controller;
pub mod datasource;
pub mod errors;
pub mod events;
pub mod htsp;
pub mod model;
pub mod pipeline;
pub mod settings;
pub mod speed;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{PlayerBuilder, PlayerController, PlayerParts};
pub use datasource::{
    DataSource, DataSourceFactory, HtspDataSource, HtspDataSourceFactory, SharedDataSource,
};
pub use errors::{DataSourceError, OpenError, PlaybackException, PlaybackExceptionKind, PlayerError};
pub use events::{NullListener, PlayerEvent, PlayerEventBus, PlayerListener};
pub use htsp::{HtspTransport, SubscriptionEvent, TimeshiftStatus, TransportError};
pub use model::{
    ControllerState, OverlayState, PipelineState, SelectedTracks, SessionInfo, SourceKind,
    TrackEntry, TrackFormat, TrackInfo, TrackType,
};
pub use pipeline::{MediaDescriptor, Pipeline, PipelineEvent, PipelineEventSink, PipelineOptions};
pub use settings::PlayerSettings;

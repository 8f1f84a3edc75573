use std::collections::BTreeMap;

use serde::Serialize;
use tvhcontract::ResourceUri;

/// Which data source factory serves a URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SourceKind {
    /// Live channel, streamed through a server-side subscription.
    Live,
    /// Finished or ongoing recording, read as a file.
    Recording,
}

/// Lifecycle of the playback controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ControllerState {
    Idle,
    Opening,
    Playing,
    Paused,
    Stopped,
    Releasing,
    Released,
}

impl ControllerState {
    pub fn is_released(self) -> bool {
        matches!(self, ControllerState::Releasing | ControllerState::Released)
    }
}

/// State reported by the decode/render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    Buffering,
    Ready,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TrackType {
    Video,
    Audio,
    Subtitle,
}

/// Format of one track as seen by the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrackFormat {
    pub id: String,
    pub sample_mime_type: String,
    pub language: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f32>,
    pub channel_count: Option<u32>,
    pub sample_rate: Option<u32>,
}

/// One entry of the pipeline's track report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackEntry {
    pub format: TrackFormat,
    /// The pipeline can decode this format.
    pub handled: bool,
    pub selected: bool,
}

/// Track description handed to the player listener.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackInfo {
    pub track_type: TrackType,
    pub id: String,
    pub language: Option<String>,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub video_frame_rate: Option<f32>,
    pub audio_channel_count: Option<u32>,
    pub audio_sample_rate: Option<u32>,
}

/// Currently selected track id per track type.
pub type SelectedTracks = BTreeMap<TrackType, String>;

/// Radio overlay shown when the stream carries no video.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OverlayState {
    pub radio_mode: bool,
    pub channel_name: Option<String>,
    #[serde(skip)]
    pub channel_logo: Option<Vec<u8>>,
}

/// Snapshot of the active playback session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub active_uri: Option<ResourceUri>,
    pub source_kind: Option<SourceKind>,
    pub has_data_source: bool,
    /// Bumped on every open and stop, pipeline callbacks carry it.
    pub generation: u64,
}

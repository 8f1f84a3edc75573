//! Seam onto the decode/render pipeline.

use crossbeam_channel::Sender;
use tracing::trace;
use tvhcontract::ResourceUri;

use crate::controller::Message;
use crate::datasource::SharedDataSource;
use crate::errors::PlaybackException;
use crate::model::{PipelineState, SourceKind, TrackEntry, TrackType};

/// Pipeline tuning taken from the player settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Buffered media required before playback starts.
    pub buffer_for_playback_ms: u64,
    pub audio_tunneling: bool,
    pub apply_embedded_caption_styles: bool,
}

/// Everything the pipeline needs to start loading a resource.
pub struct MediaDescriptor {
    pub uri: ResourceUri,
    pub kind: SourceKind,
    pub data_source: SharedDataSource,
    pub options: PipelineOptions,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    TracksChanged(Vec<TrackEntry>),
    LoadingChanged(bool),
    StateChanged {
        play_when_ready: bool,
        state: PipelineState,
    },
    Error(PlaybackException),
}

/// Callback handle given to the pipeline on `prepare`.
///
/// Events are queued to the controller and tagged with the session they
/// belong to. Once that session is stopped they are dropped on arrival,
/// so a pipeline may keep calling a stale sink.
#[derive(Clone, Debug)]
pub struct PipelineEventSink {
    generation: u64,
    tx: Sender<Message>,
}

impl PipelineEventSink {
    pub(crate) fn new(generation: u64, tx: Sender<Message>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn emit(&self, event: PipelineEvent) {
        let message = Message::Pipeline {
            generation: self.generation,
            event,
        };
        if self.tx.send(message).is_err() {
            trace!(generation = self.generation, "Controller gone, pipeline event dropped");
        }
    }

    pub fn tracks_changed(&self, tracks: Vec<TrackEntry>) {
        self.emit(PipelineEvent::TracksChanged(tracks));
    }

    pub fn loading_changed(&self, loading: bool) {
        self.emit(PipelineEvent::LoadingChanged(loading));
    }

    pub fn state_changed(&self, play_when_ready: bool, state: PipelineState) {
        self.emit(PipelineEvent::StateChanged {
            play_when_ready,
            state,
        });
    }

    pub fn error(&self, error: PlaybackException) {
        self.emit(PipelineEvent::Error(error));
    }
}

/// Decode/render pipeline driven by the controller.
///
/// Every call is made from the controller thread.
pub trait Pipeline: Send {
    /// Starts loading a resource. Callbacks go through `events`.
    fn prepare(&mut self, media: MediaDescriptor, events: PipelineEventSink);

    fn stop(&mut self);

    fn release(&mut self);

    fn set_play_when_ready(&mut self, play_when_ready: bool);

    fn seek_to(&mut self, position_ms: i64);

    fn set_playback_speed(&mut self, multiplier: f32);

    /// Playback position in milliseconds.
    fn current_position(&self) -> i64;

    fn set_volume(&mut self, volume: f32);

    /// Forces the track with id `track_id`. Returns false if unknown.
    fn select_track(&mut self, track_type: TrackType, track_id: &str) -> bool;

    fn clear_track_overrides(&mut self);

    fn set_renderer_disabled(&mut self, track_type: TrackType, disabled: bool);
}

//! Controller state machine. Runs on the controller thread only.

use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};
use tvhcontract::{IdentityRegistry, ResourceUri, UriKind};

use crate::clock::Clock;
use crate::controller::Message;
use crate::controller::tracks::adapt_tracks;
use crate::datasource::{DataSource, DataSourceFactory, SharedDataSource};
use crate::errors::{OpenError, PlaybackException, PlaybackExceptionKind, PlayerError};
use crate::events::PlayerListener;
use crate::model::{
    ControllerState, OverlayState, PipelineState, SessionInfo, SourceKind, TrackEntry, TrackType,
};
use crate::pipeline::{MediaDescriptor, Pipeline, PipelineEvent, PipelineEventSink};
use crate::settings::PlayerSettings;
use crate::speed::{rate_to_multiplier, translate_speed};

/// Pipeline position matching a wall-clock seek target.
///
/// `start_time_us` is the wall time of the stream start (unknown for
/// recordings, taken as 0), `start_pts_us` the oldest seekable PTS.
pub fn seek_position_ms(target_ms: i64, start_time_us: Option<i64>, start_pts_us: i64) -> i64 {
    let seek_pts = target_ms
        .saturating_mul(1000)
        .saturating_sub(start_time_us.unwrap_or(0))
        .max(start_pts_us);
    seek_pts / 1000
}

/// Wall-clock position of the playhead.
///
/// Without a timeshift offset the pipeline position is the best we have.
pub fn current_position_ms(now_ms: i64, offset_us: Option<i64>, pipeline_position_ms: i64) -> i64 {
    match offset_us {
        Some(offset) => now_ms + offset / 1000,
        None => pipeline_position_ms,
    }
}

#[derive(Default)]
struct PlaybackSession {
    active_uri: Option<ResourceUri>,
    source_kind: Option<SourceKind>,
    data_source: Option<SharedDataSource>,
}

/// Collaborators of the controller.
pub struct PlayerParts {
    pub settings: PlayerSettings,
    pub registry: IdentityRegistry,
    pub live_factory: Arc<dyn DataSourceFactory>,
    pub recording_factory: Arc<dyn DataSourceFactory>,
    pub pipeline: Box<dyn Pipeline>,
    pub listener: Arc<dyn PlayerListener>,
    pub clock: Arc<dyn Clock>,
}

pub(crate) struct PlayerCore {
    settings: PlayerSettings,
    registry: IdentityRegistry,
    live_factory: Arc<dyn DataSourceFactory>,
    recording_factory: Arc<dyn DataSourceFactory>,
    pipeline: Box<dyn Pipeline>,
    listener: Arc<dyn PlayerListener>,
    clock: Arc<dyn Clock>,
    events_tx: Sender<Message>,
    state: ControllerState,
    session: PlaybackSession,
    generation: u64,
    overlay: OverlayState,
}

impl PlayerCore {
    pub(crate) fn new(parts: PlayerParts, events_tx: Sender<Message>) -> Self {
        Self {
            settings: parts.settings,
            registry: parts.registry,
            live_factory: parts.live_factory,
            recording_factory: parts.recording_factory,
            pipeline: parts.pipeline,
            listener: parts.listener,
            clock: parts.clock,
            events_tx,
            state: ControllerState::Idle,
            session: PlaybackSession::default(),
            generation: 0,
            overlay: OverlayState::default(),
        }
    }

    fn set_state(&mut self, state: ControllerState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Controller state change");
            self.state = state;
            self.listener.on_controller_state(state);
        }
    }

    fn set_overlay(&mut self, overlay: OverlayState) {
        if self.overlay != overlay {
            self.overlay = overlay;
            self.listener.on_overlay_changed(&self.overlay);
        }
    }

    pub(crate) fn state(&self) -> ControllerState {
        self.state
    }

    pub(crate) fn overlay(&self) -> OverlayState {
        self.overlay.clone()
    }

    pub(crate) fn session_info(&self) -> SessionInfo {
        SessionInfo {
            active_uri: self.session.active_uri,
            source_kind: self.session.source_kind,
            has_data_source: self.session.data_source.is_some(),
            generation: self.generation,
        }
    }

    fn factory_for(&self, uri: &ResourceUri) -> Result<&Arc<dyn DataSourceFactory>, OpenError> {
        match uri.kind() {
            UriKind::Channel => Ok(&self.live_factory),
            UriKind::Recording => Ok(&self.recording_factory),
            UriKind::Program => Err(OpenError::InvalidUriKind(format!(
                "{} is not playable",
                uri
            ))),
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub(crate) fn open(&mut self, uri: ResourceUri) -> Result<(), PlayerError> {
        if self.state.is_released() {
            return Err(PlayerError::Released);
        }
        self.stop();

        let factory = self.factory_for(&uri)?.clone();
        self.set_state(ControllerState::Opening);

        let data_source = match factory.open(&uri) {
            Ok(source) => source,
            Err(err) => {
                warn!(%uri, "Failed to open data source: {}", err);
                if matches!(err, OpenError::SubscriptionRefused(_)) {
                    self.listener.on_player_error(&PlaybackException::new(
                        PlaybackExceptionKind::Source,
                        err.to_string(),
                    ));
                }
                self.set_state(ControllerState::Stopped);
                return Err(err.into());
            }
        };
        let sink = PipelineEventSink::new(self.generation, self.events_tx.clone());
        data_source
            .lock()
            .expect("data source mutex poisoned")
            .attach_events(sink.clone());

        info!(%uri, kind = ?factory.kind(), generation = self.generation, "Opening media");
        self.session = PlaybackSession {
            active_uri: Some(uri),
            source_kind: Some(factory.kind()),
            data_source: Some(data_source.clone()),
        };

        let media = MediaDescriptor {
            uri,
            kind: factory.kind(),
            data_source,
            options: self.settings.pipeline_options(),
        };
        self.pipeline.prepare(media, sink);
        Ok(())
    }

    /// Stops playback and releases every data source. Idempotent.
    pub(crate) fn stop(&mut self) {
        self.pipeline.stop();
        self.pipeline.clear_track_overrides();
        self.live_factory.release_current();
        self.recording_factory.release_current();

        if self.session.active_uri.is_some() {
            debug!(generation = self.generation, "Session stopped");
        }
        self.session = PlaybackSession::default();
        // Callbacks of the stopped session are dropped from now on
        self.generation += 1;
        self.set_overlay(OverlayState::default());

        if !matches!(self.state, ControllerState::Idle) && !self.state.is_released() {
            self.set_state(ControllerState::Stopped);
        }
    }

    pub(crate) fn release(&mut self) {
        if self.state == ControllerState::Released {
            return;
        }
        self.set_state(ControllerState::Releasing);
        self.stop();
        self.pipeline.release();
        self.set_state(ControllerState::Released);
        info!("Player released");
    }

    // ========================================================================
    // Transport
    // ========================================================================

    fn active_source(&self, operation: &str) -> Option<SharedDataSource> {
        if self.state.is_released() {
            warn!(operation, "Player released, ignoring");
            return None;
        }
        let source = self.session.data_source.clone();
        if source.is_none() {
            warn!(operation, "No active data source, ignoring");
        }
        source
    }

    pub(crate) fn play(&mut self) {
        if self.active_source("play").is_none() {
            return;
        }
        self.pipeline.set_play_when_ready(true);
        self.set_state(ControllerState::Playing);
    }

    pub(crate) fn pause(&mut self) {
        let Some(source) = self.active_source("pause") else {
            return;
        };
        self.pipeline.set_play_when_ready(false);
        source.lock().expect("data source mutex poisoned").pause();
        self.set_state(ControllerState::Paused);
    }

    pub(crate) fn resume(&mut self) {
        let Some(source) = self.active_source("resume") else {
            return;
        };
        source.lock().expect("data source mutex poisoned").resume();
        self.pipeline.set_play_when_ready(true);
        self.set_state(ControllerState::Playing);
    }

    pub(crate) fn seek(&mut self, target_ms: i64) {
        let Some(source) = self.active_source("seek") else {
            return;
        };
        let (start_time, start_pts) = {
            let source = source.lock().expect("data source mutex poisoned");
            (source.timeshift_start_time(), source.timeshift_start_pts())
        };
        let position = seek_position_ms(target_ms, start_time, start_pts);
        debug!(target_ms, ?start_time, start_pts, position, "Seeking");
        self.pipeline.seek_to(position);
    }

    pub(crate) fn set_trick_play_speed(&mut self, speed: f32) {
        let Some(rate) = translate_speed(speed) else {
            warn!(speed, "Unsupported trick play speed, ignoring");
            return;
        };
        let Some(source) = self.active_source("set_trick_play_speed") else {
            return;
        };
        if let Err(err) = source.lock().expect("data source mutex poisoned").set_speed(rate) {
            warn!(speed, rate, "Data source refused speed change: {}", err);
            return;
        }
        self.pipeline.set_playback_speed(rate_to_multiplier(rate));
    }

    /// Oldest reachable position, in wall-clock milliseconds.
    pub(crate) fn timeshift_start_position(&self) -> Option<i64> {
        let source = self.session.data_source.as_ref()?;
        let start_time = source
            .lock()
            .expect("data source mutex poisoned")
            .timeshift_start_time();
        Some(start_time.map_or(0, |time| time / 1000))
    }

    /// Current playhead, in wall-clock milliseconds.
    pub(crate) fn timeshift_current_position(&self) -> Option<i64> {
        let source = self.session.data_source.as_ref()?;
        let offset = source
            .lock()
            .expect("data source mutex poisoned")
            .timeshift_offset_pts();
        Some(current_position_ms(
            self.clock.now_ms(),
            offset,
            self.pipeline.current_position(),
        ))
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    pub(crate) fn select_track(&mut self, track_type: TrackType, track_id: &str) -> bool {
        if self.state.is_released() {
            return false;
        }
        let selected = self.pipeline.select_track(track_type, track_id);
        if !selected {
            warn!(?track_type, track_id, "Unknown track");
        }
        selected
    }

    pub(crate) fn set_caption_enabled(&mut self, enabled: bool) {
        if self.state.is_released() {
            return;
        }
        self.pipeline
            .set_renderer_disabled(TrackType::Subtitle, !enabled);
    }

    pub(crate) fn set_volume(&mut self, volume: f32) {
        if self.state.is_released() {
            return;
        }
        self.pipeline.set_volume(volume.clamp(0.0, 1.0));
    }

    fn on_tracks_changed(&mut self, entries: &[TrackEntry]) {
        let adapted = adapt_tracks(entries);
        if adapted.has_video {
            if self.overlay.radio_mode {
                debug!("Video track selected, hiding radio overlay");
            }
            self.set_overlay(OverlayState::default());
        } else {
            self.enable_radio_info();
        }
        self.listener
            .on_tracks_changed(&adapted.tracks, &adapted.selected);
    }

    /// Shows channel name and logo when the stream has no video.
    fn enable_radio_info(&mut self) {
        let Some(uri) = self.session.active_uri else {
            return;
        };
        if uri.kind() != UriKind::Channel {
            self.set_overlay(OverlayState {
                radio_mode: true,
                ..Default::default()
            });
            return;
        }

        let channel_number = match self.registry.reverse_resolve_channel(&uri) {
            Ok(Some(number)) => number,
            Ok(None) => {
                warn!(%uri, "Radio overlay: channel no longer in the store");
                return;
            }
            Err(err) => {
                warn!(%uri, "Radio overlay: channel lookup failed: {}", err);
                return;
            }
        };
        let channel_name = match self.registry.resolve_channel_name(channel_number) {
            Ok(Some(name)) => name,
            Ok(None) => {
                warn!(channel_number, "Radio overlay: no channel name");
                return;
            }
            Err(err) => {
                warn!(channel_number, "Radio overlay: name lookup failed: {}", err);
                return;
            }
        };
        let channel_logo = self
            .registry
            .channel_logo(channel_number)
            .unwrap_or_else(|err| {
                warn!(channel_number, "Radio overlay: logo lookup failed: {}", err);
                None
            });

        self.set_overlay(OverlayState {
            radio_mode: true,
            channel_name: Some(channel_name),
            channel_logo,
        });
    }

    // ========================================================================
    // Pipeline callbacks
    // ========================================================================

    pub(crate) fn handle_pipeline_event(&mut self, generation: u64, event: PipelineEvent) {
        if generation != self.generation || self.state.is_released() {
            debug!(generation, current = self.generation, "Dropping stale pipeline event");
            return;
        }
        match event {
            PipelineEvent::TracksChanged(entries) => self.on_tracks_changed(&entries),
            PipelineEvent::LoadingChanged(loading) => {
                if loading {
                    let current = self
                        .live_factory
                        .current()
                        .or_else(|| self.recording_factory.current());
                    if current.is_some() {
                        self.session.data_source = current;
                    }
                }
            }
            PipelineEvent::StateChanged {
                play_when_ready,
                state,
            } => {
                if state == PipelineState::Ready
                    && play_when_ready
                    && self.state == ControllerState::Opening
                {
                    self.set_state(ControllerState::Playing);
                }
                self.listener.on_state_changed(play_when_ready, state);
            }
            PipelineEvent::Error(error) => {
                warn!(generation, "Playback error: {}", error);
                self.listener.on_player_error(&error);
            }
        }
    }
}

//! Timeshift-aware playback controller.
//!
//! The controller state lives on a dedicated thread. [`PlayerController`]
//! is a handle posting commands to it; pipeline callbacks are posted to
//! the same mailbox, so every state change happens in one place and in
//! arrival order.

mod player;
pub mod tracks;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use tracing::{debug, error, info};
use tvhcontract::{IdentityRegistry, ResourceUri};

use crate::clock::{Clock, SystemClock};
use crate::datasource::{DataSourceFactory, HtspDataSourceFactory};
use crate::errors::PlayerError;
use crate::events::{NullListener, PlayerListener};
use crate::htsp::HtspTransport;
use crate::model::{ControllerState, OverlayState, SessionInfo, TrackType};
use crate::pipeline::{Pipeline, PipelineEvent};
use crate::settings::PlayerSettings;

pub use self::player::{PlayerParts, current_position_ms, seek_position_ms};
use self::player::PlayerCore;

pub(crate) enum Command {
    Open {
        uri: ResourceUri,
        reply: Sender<Result<(), PlayerError>>,
    },
    Play(Sender<()>),
    Pause(Sender<()>),
    Resume(Sender<()>),
    Seek {
        target_ms: i64,
        reply: Sender<()>,
    },
    SetTrickPlaySpeed {
        speed: f32,
        reply: Sender<()>,
    },
    Stop(Sender<()>),
    SelectTrack {
        track_type: TrackType,
        track_id: String,
        reply: Sender<bool>,
    },
    SetCaptionEnabled {
        enabled: bool,
        reply: Sender<()>,
    },
    SetVolume {
        volume: f32,
        reply: Sender<()>,
    },
    TimeshiftStartPosition(Sender<Option<i64>>),
    TimeshiftCurrentPosition(Sender<Option<i64>>),
    State(Sender<ControllerState>),
    Overlay(Sender<OverlayState>),
    Session(Sender<SessionInfo>),
    Release(Sender<()>),
}

/// Mailbox entry of the controller thread.
pub(crate) enum Message {
    Command(Command),
    Pipeline { generation: u64, event: PipelineEvent },
}

fn run(mut core: PlayerCore, rx: Receiver<Message>) {
    // Reply send errors only mean the caller went away
    for message in rx.iter() {
        match message {
            Message::Pipeline { generation, event } => core.handle_pipeline_event(generation, event),
            Message::Command(command) => match command {
                Command::Open { uri, reply } => {
                    let _ = reply.send(core.open(uri));
                }
                Command::Play(reply) => {
                    core.play();
                    let _ = reply.send(());
                }
                Command::Pause(reply) => {
                    core.pause();
                    let _ = reply.send(());
                }
                Command::Resume(reply) => {
                    core.resume();
                    let _ = reply.send(());
                }
                Command::Seek { target_ms, reply } => {
                    core.seek(target_ms);
                    let _ = reply.send(());
                }
                Command::SetTrickPlaySpeed { speed, reply } => {
                    core.set_trick_play_speed(speed);
                    let _ = reply.send(());
                }
                Command::Stop(reply) => {
                    if !core.state().is_released() {
                        core.stop();
                    }
                    let _ = reply.send(());
                }
                Command::SelectTrack {
                    track_type,
                    track_id,
                    reply,
                } => {
                    let _ = reply.send(core.select_track(track_type, &track_id));
                }
                Command::SetCaptionEnabled { enabled, reply } => {
                    core.set_caption_enabled(enabled);
                    let _ = reply.send(());
                }
                Command::SetVolume { volume, reply } => {
                    core.set_volume(volume);
                    let _ = reply.send(());
                }
                Command::TimeshiftStartPosition(reply) => {
                    let _ = reply.send(core.timeshift_start_position());
                }
                Command::TimeshiftCurrentPosition(reply) => {
                    let _ = reply.send(core.timeshift_current_position());
                }
                Command::State(reply) => {
                    let _ = reply.send(core.state());
                }
                Command::Overlay(reply) => {
                    let _ = reply.send(core.overlay());
                }
                Command::Session(reply) => {
                    let _ = reply.send(core.session_info());
                }
                Command::Release(reply) => {
                    core.release();
                    let _ = reply.send(());
                    break;
                }
            },
        }
    }
    debug!("Player controller thread exiting");
}

/// Handle on a running playback controller.
///
/// Every call blocks until the controller thread has processed it, so
/// calls made from one thread are applied in order.
pub struct PlayerController {
    tx: Sender<Message>,
    thread: Option<JoinHandle<()>>,
}

impl PlayerController {
    /// Starts the controller thread.
    pub fn spawn(parts: PlayerParts) -> Result<Self, PlayerError> {
        let (tx, rx) = unbounded::<Message>();
        let core = PlayerCore::new(parts, tx.clone());
        let thread = thread::Builder::new()
            .name("tvh-player".to_string())
            .spawn(move || run(core, rx))
            .map_err(|err| PlayerError::Spawn(err.to_string()))?;
        info!("Player controller started");
        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    pub fn builder(
        registry: IdentityRegistry,
        transport: Arc<dyn HtspTransport>,
        pipeline: Box<dyn Pipeline>,
    ) -> PlayerBuilder {
        PlayerBuilder::new(registry, transport, pipeline)
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Command) -> Result<T, PlayerError> {
        let (reply_tx, reply_rx) = bounded::<T>(1);
        self.tx
            .send(Message::Command(build(reply_tx)))
            .map_err(|_| PlayerError::ControllerGone)?;
        reply_rx.recv().map_err(|_| PlayerError::ControllerGone)
    }

    /// Opens a channel or recording, stopping whatever was playing.
    pub fn open(&self, uri: ResourceUri) -> Result<(), PlayerError> {
        self.request(|reply| Command::Open { uri, reply })?
    }

    pub fn play(&self) -> Result<(), PlayerError> {
        self.request(Command::Play)
    }

    pub fn pause(&self) -> Result<(), PlayerError> {
        self.request(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), PlayerError> {
        self.request(Command::Resume)
    }

    /// Seeks to a wall-clock position, in milliseconds.
    pub fn seek(&self, target_ms: i64) -> Result<(), PlayerError> {
        self.request(|reply| Command::Seek { target_ms, reply })
    }

    pub fn set_trick_play_speed(&self, speed: f32) -> Result<(), PlayerError> {
        self.request(|reply| Command::SetTrickPlaySpeed { speed, reply })
    }

    pub fn stop(&self) -> Result<(), PlayerError> {
        self.request(Command::Stop)
    }

    pub fn select_track(&self, track_type: TrackType, track_id: &str) -> Result<bool, PlayerError> {
        let track_id = track_id.to_string();
        self.request(|reply| Command::SelectTrack {
            track_type,
            track_id,
            reply,
        })
    }

    pub fn set_caption_enabled(&self, enabled: bool) -> Result<(), PlayerError> {
        self.request(|reply| Command::SetCaptionEnabled { enabled, reply })
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        self.request(|reply| Command::SetVolume { volume, reply })
    }

    pub fn timeshift_start_position(&self) -> Result<Option<i64>, PlayerError> {
        self.request(Command::TimeshiftStartPosition)
    }

    pub fn timeshift_current_position(&self) -> Result<Option<i64>, PlayerError> {
        self.request(Command::TimeshiftCurrentPosition)
    }

    pub fn state(&self) -> Result<ControllerState, PlayerError> {
        self.request(Command::State)
    }

    pub fn overlay(&self) -> Result<OverlayState, PlayerError> {
        self.request(Command::Overlay)
    }

    pub fn session(&self) -> Result<SessionInfo, PlayerError> {
        self.request(Command::Session)
    }

    /// Stops playback, releases the pipeline and joins the controller thread.
    pub fn release(&mut self) -> Result<(), PlayerError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        let result = self.request(Command::Release);
        if thread.join().is_err() {
            error!("Player controller thread panicked");
        }
        result
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            debug!("Release on drop failed: {}", err);
        }
    }
}

/// Wires a controller with the default data source factories.
pub struct PlayerBuilder {
    registry: IdentityRegistry,
    transport: Arc<dyn HtspTransport>,
    pipeline: Box<dyn Pipeline>,
    settings: PlayerSettings,
    listener: Arc<dyn PlayerListener>,
    clock: Arc<dyn Clock>,
    factories: Option<(Arc<dyn DataSourceFactory>, Arc<dyn DataSourceFactory>)>,
}

impl PlayerBuilder {
    pub fn new(
        registry: IdentityRegistry,
        transport: Arc<dyn HtspTransport>,
        pipeline: Box<dyn Pipeline>,
    ) -> Self {
        Self {
            registry,
            transport,
            pipeline,
            settings: PlayerSettings::default(),
            listener: Arc::new(NullListener),
            clock: Arc::new(SystemClock),
            factories: None,
        }
    }

    pub fn settings(mut self, settings: PlayerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn PlayerListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Uses the given factories instead of building them from the transport.
    pub fn factories(
        mut self,
        live: Arc<dyn DataSourceFactory>,
        recording: Arc<dyn DataSourceFactory>,
    ) -> Self {
        self.factories = Some((live, recording));
        self
    }

    pub fn into_parts(self) -> PlayerParts {
        let (live_factory, recording_factory) = match self.factories {
            Some(factories) => factories,
            None => {
                let live: Arc<dyn DataSourceFactory> = Arc::new(HtspDataSourceFactory::subscription(
                    self.transport.clone(),
                    self.registry.clone(),
                    self.clock.clone(),
                    self.settings.source_settings(),
                ));
                let recording: Arc<dyn DataSourceFactory> = Arc::new(HtspDataSourceFactory::file(
                    self.transport.clone(),
                    self.registry.clone(),
                    self.clock.clone(),
                    self.settings.source_settings(),
                ));
                (live, recording)
            }
        };
        PlayerParts {
            settings: self.settings,
            registry: self.registry,
            live_factory,
            recording_factory,
            pipeline: self.pipeline,
            listener: self.listener,
            clock: self.clock,
        }
    }

    pub fn spawn(self) -> Result<PlayerController, PlayerError> {
        PlayerController::spawn(self.into_parts())
    }
}

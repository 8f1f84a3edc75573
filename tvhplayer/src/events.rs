use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::errors::PlaybackException;
use crate::model::{ControllerState, OverlayState, PipelineState, SelectedTracks, TrackInfo};

/// Callbacks from the controller to its owner.
///
/// Called on the controller thread: implementations must not block.
pub trait PlayerListener: Send + Sync {
    fn on_tracks_changed(&self, tracks: &[TrackInfo], selected: &SelectedTracks);

    fn on_state_changed(&self, play_when_ready: bool, state: PipelineState);

    fn on_player_error(&self, error: &PlaybackException);

    fn on_controller_state(&self, _state: ControllerState) {}

    fn on_overlay_changed(&self, _overlay: &OverlayState) {}
}

/// Listener that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullListener;

impl PlayerListener for NullListener {
    fn on_tracks_changed(&self, _tracks: &[TrackInfo], _selected: &SelectedTracks) {}

    fn on_state_changed(&self, _play_when_ready: bool, _state: PipelineState) {}

    fn on_player_error(&self, _error: &PlaybackException) {}
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    TracksChanged {
        tracks: Vec<TrackInfo>,
        selected: SelectedTracks,
    },
    StateChanged {
        play_when_ready: bool,
        state: PipelineState,
    },
    Error(PlaybackException),
    ControllerState(ControllerState),
    OverlayChanged(OverlayState),
}

/// Fans player callbacks out to channel subscribers.
#[derive(Clone, Default)]
pub struct PlayerEventBus {
    subscribers: Arc<Mutex<Vec<Sender<PlayerEvent>>>>,
}

impl PlayerEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (tx, rx) = unbounded::<PlayerEvent>();
        {
            let mut subscribers = self.subscribers.lock().expect("event bus mutex poisoned");
            subscribers.push(tx);
        }
        rx
    }

    pub fn broadcast(&self, event: PlayerEvent) {
        let mut subscribers = self.subscribers.lock().expect("event bus mutex poisoned");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl PlayerListener for PlayerEventBus {
    fn on_tracks_changed(&self, tracks: &[TrackInfo], selected: &SelectedTracks) {
        self.broadcast(PlayerEvent::TracksChanged {
            tracks: tracks.to_vec(),
            selected: selected.clone(),
        });
    }

    fn on_state_changed(&self, play_when_ready: bool, state: PipelineState) {
        self.broadcast(PlayerEvent::StateChanged {
            play_when_ready,
            state,
        });
    }

    fn on_player_error(&self, error: &PlaybackException) {
        self.broadcast(PlayerEvent::Error(error.clone()));
    }

    fn on_controller_state(&self, state: ControllerState) {
        self.broadcast(PlayerEvent::ControllerState(state));
    }

    fn on_overlay_changed(&self, overlay: &OverlayState) {
        self.broadcast(PlayerEvent::OverlayChanged(overlay.clone()));
    }
}

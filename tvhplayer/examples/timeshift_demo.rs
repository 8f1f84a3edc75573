//! Drives the controller against an in-memory store and a fake server.
//!
//! ```bash
//! cargo run -p tvhplayer --example timeshift_demo
//! ```

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tvhconfig::{get_config, init_logging};
use tvhcontract::{IdentityRegistry, InMemoryStore, ResourceUri};
use tvhplayer::htsp::{FileHandle, SubscribeRequest};
use tvhplayer::{
    DataSource, HtspDataSourceFactory, HtspTransport, MediaDescriptor, Pipeline,
    PipelineEventSink, PipelineState, PlayerController, PlayerEvent, PlayerEventBus,
    PlayerSettings, SharedDataSource, SubscriptionEvent, SystemClock, TimeshiftStatus,
    TrackEntry, TrackFormat, TrackType, TransportError,
};

/// Server stand-in: accepts everything and logs it.
struct LoggingTransport;

impl HtspTransport for LoggingTransport {
    fn subscribe(&self, request: &SubscribeRequest) -> Result<(), TransportError> {
        info!(?request, "subscribe");
        Ok(())
    }

    fn unsubscribe(&self, subscription_id: u32) -> Result<(), TransportError> {
        info!(subscription_id, "unsubscribe");
        Ok(())
    }

    fn subscription_speed(&self, subscription_id: u32, speed: i32) -> Result<(), TransportError> {
        info!(subscription_id, speed, "subscriptionSpeed");
        Ok(())
    }

    fn file_open(&self, path: &str) -> Result<FileHandle, TransportError> {
        info!(path, "fileOpen");
        Ok(FileHandle {
            id: 1,
            size: Some(0),
        })
    }

    fn file_read(&self, _file_id: u32, _size: usize) -> Result<Vec<u8>, TransportError> {
        Ok(Vec::new())
    }

    fn file_close(&self, file_id: u32) -> Result<(), TransportError> {
        info!(file_id, "fileClose");
        Ok(())
    }
}

/// Pipeline that drains the data source and reports an audio-only stream.
#[derive(Default)]
struct DemoPipeline {
    source: Option<SharedDataSource>,
    sink: Option<PipelineEventSink>,
    position_ms: i64,
}

impl Pipeline for DemoPipeline {
    fn prepare(&mut self, media: MediaDescriptor, events: PipelineEventSink) {
        info!(uri = %media.uri, kind = ?media.kind, "prepare");
        events.loading_changed(true);
        events.tracks_changed(vec![TrackEntry {
            format: TrackFormat {
                id: "audio-1".to_string(),
                sample_mime_type: "audio/mpeg".to_string(),
                language: Some("fre".to_string()),
                channel_count: Some(2),
                sample_rate: Some(48_000),
                ..Default::default()
            },
            handled: true,
            selected: true,
        }]);
        events.state_changed(true, PipelineState::Ready);
        self.source = Some(media.data_source);
        self.sink = Some(events);
    }

    fn stop(&mut self) {
        self.source = None;
        self.sink = None;
    }

    fn release(&mut self) {
        info!("pipeline released");
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) {
        info!(play_when_ready, "play when ready");
    }

    fn seek_to(&mut self, position_ms: i64) {
        info!(position_ms, "seek");
        self.position_ms = position_ms;
        if let Some(sink) = &self.sink {
            sink.state_changed(true, PipelineState::Buffering);
            sink.state_changed(true, PipelineState::Ready);
        }
    }

    fn set_playback_speed(&mut self, multiplier: f32) {
        info!(multiplier, "playback speed");
    }

    fn current_position(&self) -> i64 {
        if let Some(source) = &self.source {
            let mut buf = [0u8; 188];
            let read = source
                .lock()
                .expect("data source mutex poisoned")
                .read(&mut buf)
                .unwrap_or(0);
            info!(read, "drained");
        }
        self.position_ms
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn select_track(&mut self, _track_type: TrackType, _track_id: &str) -> bool {
        false
    }

    fn clear_track_overrides(&mut self) {}

    fn set_renderer_disabled(&mut self, _track_type: TrackType, _disabled: bool) {}
}

fn main() -> Result<()> {
    let config = get_config();
    let _log = init_logging(&config);
    let settings = PlayerSettings::from_config(&config)?;

    let store = Arc::new(InMemoryStore::new());
    let registry = IdentityRegistry::new(store.clone(), config.input_id()?);
    let row_id = store.insert_channel(registry.input_id(), 101, "Radio Classique");
    store.set_channel_logo(row_id, vec![0x89, b'P', b'N', b'G']);

    let transport: Arc<dyn HtspTransport> = Arc::new(LoggingTransport);
    let clock = Arc::new(SystemClock);
    let live = Arc::new(HtspDataSourceFactory::subscription(
        transport.clone(),
        registry.clone(),
        clock.clone(),
        settings.source_settings(),
    ));
    let recordings = Arc::new(HtspDataSourceFactory::file(
        transport.clone(),
        registry.clone(),
        clock.clone(),
        settings.source_settings(),
    ));

    let bus = PlayerEventBus::new();
    let events = bus.subscribe();
    let mut player = PlayerController::builder(registry, transport, Box::new(DemoPipeline::default()))
        .settings(settings)
        .listener(Arc::new(bus))
        .clock(clock)
        .factories(live.clone(), recordings)
        .spawn()?;

    player.open(ResourceUri::Channel(row_id))?;
    player.play()?;

    // What the server connection would push
    let subscription_id = 1;
    live.dispatch(subscription_id, SubscriptionEvent::Start);
    live.dispatch(subscription_id, SubscriptionEvent::MuxPacket {
        pts: 0,
        payload: vec![0x47; 188],
    });
    live.dispatch(
        subscription_id,
        SubscriptionEvent::TimeshiftStatus(TimeshiftStatus {
            full: false,
            shift: Some(-30_000_000),
            start: Some(0),
            end: None,
        }),
    );

    info!(
        start = ?player.timeshift_start_position()?,
        current = ?player.timeshift_current_position()?,
        "timeshift"
    );
    info!(overlay = ?player.overlay()?, "overlay");

    player.seek(chrono::Utc::now().timestamp_millis() - 10_000)?;
    player.set_trick_play_speed(2.0)?;
    player.pause()?;
    player.resume()?;
    player.release()?;

    for event in events.try_iter() {
        match event {
            PlayerEvent::TracksChanged { tracks, selected } => {
                info!(tracks = tracks.len(), ?selected, "tracks changed")
            }
            other => info!(?other, "event"),
        }
    }
    Ok(())
}

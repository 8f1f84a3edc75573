#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::Receiver;
use tvhcontract::{IdentityRegistry, InMemoryStore, ResourceUri};
use tvhplayer::datasource::SourceSettings;
use tvhplayer::htsp::{FileHandle, SubscribeRequest};
use tvhplayer::{
    HtspDataSourceFactory, HtspTransport, ManualClock, MediaDescriptor, Pipeline,
    PipelineEventSink, PipelineOptions, PlayerController, PlayerEvent, PlayerEventBus,
    PlayerSettings, SharedDataSource, SourceKind, TrackEntry, TrackFormat, TrackType,
    TransportError,
};

pub const INPUT_ID: &str = "ie.macinnes.tvheadend/.tv.TvheadendTvInputService";
pub const NOW_MS: i64 = 1_700_000_000_000;

// ============================================================================
// Transport
// ============================================================================

#[derive(Default)]
pub struct TransportState {
    pub subscriptions: Vec<SubscribeRequest>,
    pub active_subscriptions: HashSet<u32>,
    pub speeds: Vec<(u32, i32)>,
    pub opened_paths: Vec<String>,
    pub open_files: HashMap<u32, (String, usize)>,
    pub files: HashMap<String, Vec<u8>>,
    pub refuse_reason: Option<String>,
    pub max_open: usize,
    next_file_id: u32,
}

impl TransportState {
    pub fn open_count(&self) -> usize {
        self.active_subscriptions.len() + self.open_files.len()
    }

    fn track_max(&mut self) {
        self.max_open = self.max_open.max(self.open_count());
    }
}

/// Transport recording every request, with files served from memory.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<TransportState>,
}

impl MockTransport {
    pub fn state(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap()
    }

    pub fn add_file(&self, path: &str, content: Vec<u8>) {
        self.state().files.insert(path.to_string(), content);
    }

    pub fn refuse_subscriptions(&self, reason: &str) {
        self.state().refuse_reason = Some(reason.to_string());
    }
}

impl HtspTransport for MockTransport {
    fn subscribe(&self, request: &SubscribeRequest) -> Result<(), TransportError> {
        let mut state = self.state();
        if let Some(reason) = state.refuse_reason.clone() {
            return Err(TransportError::Refused(reason));
        }
        state.subscriptions.push(request.clone());
        state.active_subscriptions.insert(request.subscription_id);
        state.track_max();
        Ok(())
    }

    fn unsubscribe(&self, subscription_id: u32) -> Result<(), TransportError> {
        self.state().active_subscriptions.remove(&subscription_id);
        Ok(())
    }

    fn subscription_speed(&self, subscription_id: u32, speed: i32) -> Result<(), TransportError> {
        self.state().speeds.push((subscription_id, speed));
        Ok(())
    }

    fn file_open(&self, path: &str) -> Result<FileHandle, TransportError> {
        let mut state = self.state();
        let size = match state.files.get(path) {
            Some(content) => content.len() as u64,
            None => return Err(TransportError::NotFound(path.to_string())),
        };
        state.next_file_id += 1;
        let id = state.next_file_id;
        state.opened_paths.push(path.to_string());
        state.open_files.insert(id, (path.to_string(), 0));
        state.track_max();
        Ok(FileHandle {
            id,
            size: Some(size),
        })
    }

    fn file_read(&self, file_id: u32, size: usize) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state();
        let (path, offset) = state
            .open_files
            .get(&file_id)
            .cloned()
            .ok_or_else(|| TransportError::Io(format!("file {} not open", file_id)))?;
        let content = state.files.get(&path).cloned().unwrap_or_default();
        let end = (offset + size).min(content.len());
        let chunk = content[offset..end].to_vec();
        state.open_files.insert(file_id, (path, end));
        Ok(chunk)
    }

    fn file_close(&self, file_id: u32) -> Result<(), TransportError> {
        self.state().open_files.remove(&file_id);
        Ok(())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

#[derive(Default)]
pub struct PipelineLog {
    pub prepared: Vec<(ResourceUri, SourceKind, PipelineOptions)>,
    pub sink: Option<PipelineEventSink>,
    pub data_source: Option<SharedDataSource>,
    pub play_when_ready: bool,
    pub seeks: Vec<i64>,
    pub speeds: Vec<f32>,
    pub position_ms: i64,
    pub volume: Option<f32>,
    pub stop_calls: usize,
    pub override_clears: usize,
    pub released: bool,
    pub known_tracks: HashSet<String>,
    pub selected_tracks: Vec<(TrackType, String)>,
    pub disabled_renderers: HashMap<TrackType, bool>,
}

/// Pipeline recording every call into a shared log.
#[derive(Clone, Default)]
pub struct MockPipeline {
    log: Arc<Mutex<PipelineLog>>,
}

impl MockPipeline {
    pub fn log(&self) -> MutexGuard<'_, PipelineLog> {
        self.log.lock().unwrap()
    }

    /// Sink handed over by the last `prepare`.
    pub fn sink(&self) -> PipelineEventSink {
        self.log().sink.clone().expect("pipeline was never prepared")
    }
}

impl Pipeline for MockPipeline {
    fn prepare(&mut self, media: MediaDescriptor, events: PipelineEventSink) {
        let mut log = self.log();
        log.prepared.push((media.uri, media.kind, media.options));
        log.data_source = Some(media.data_source);
        log.sink = Some(events);
    }

    fn stop(&mut self) {
        let mut log = self.log();
        log.stop_calls += 1;
        log.data_source = None;
        log.play_when_ready = false;
    }

    fn release(&mut self) {
        self.log().released = true;
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) {
        self.log().play_when_ready = play_when_ready;
    }

    fn seek_to(&mut self, position_ms: i64) {
        self.log().seeks.push(position_ms);
    }

    fn set_playback_speed(&mut self, multiplier: f32) {
        self.log().speeds.push(multiplier);
    }

    fn current_position(&self) -> i64 {
        self.log().position_ms
    }

    fn set_volume(&mut self, volume: f32) {
        self.log().volume = Some(volume);
    }

    fn select_track(&mut self, track_type: TrackType, track_id: &str) -> bool {
        let mut log = self.log();
        if !log.known_tracks.contains(track_id) {
            return false;
        }
        log.selected_tracks.push((track_type, track_id.to_string()));
        true
    }

    fn clear_track_overrides(&mut self) {
        self.log().override_clears += 1;
    }

    fn set_renderer_disabled(&mut self, track_type: TrackType, disabled: bool) {
        self.log().disabled_renderers.insert(track_type, disabled);
    }
}

// ============================================================================
// Fixture
// ============================================================================

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub registry: IdentityRegistry,
    pub transport: Arc<MockTransport>,
    pub live_factory: Arc<HtspDataSourceFactory>,
    pub recording_factory: Arc<HtspDataSourceFactory>,
    pub pipeline: MockPipeline,
    pub clock: Arc<ManualClock>,
    pub events: Receiver<PlayerEvent>,
    pub player: PlayerController,
}

pub fn fixture() -> Fixture {
    fixture_with(PlayerSettings::default())
}

pub fn fixture_with(settings: PlayerSettings) -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let registry = IdentityRegistry::new(store.clone(), INPUT_ID);
    let transport = Arc::new(MockTransport::default());
    let clock = Arc::new(ManualClock::new(NOW_MS));
    let source_settings: SourceSettings = settings.source_settings();

    let live_factory = Arc::new(HtspDataSourceFactory::subscription(
        transport.clone(),
        registry.clone(),
        clock.clone(),
        source_settings.clone(),
    ));
    let recording_factory = Arc::new(HtspDataSourceFactory::file(
        transport.clone(),
        registry.clone(),
        clock.clone(),
        source_settings,
    ));

    let bus = PlayerEventBus::new();
    let events = bus.subscribe();
    let pipeline = MockPipeline::default();

    let player = PlayerController::builder(
        registry.clone(),
        transport.clone(),
        Box::new(pipeline.clone()),
    )
    .settings(settings)
    .listener(Arc::new(bus))
    .clock(clock.clone())
    .factories(live_factory.clone(), recording_factory.clone())
    .spawn()
    .unwrap();

    Fixture {
        store,
        registry,
        transport,
        live_factory,
        recording_factory,
        pipeline,
        clock,
        events,
        player,
    }
}

impl Fixture {
    /// Adds a channel and returns its URI.
    pub fn add_channel(&self, channel_number: i32, name: &str) -> ResourceUri {
        let row_id = self.store.insert_channel(INPUT_ID, channel_number, name);
        ResourceUri::Channel(row_id)
    }

    /// Adds a recording with its file and returns its URI.
    pub fn add_recording(&self, dvr_entry_id: i32, content: Vec<u8>) -> ResourceUri {
        let row_id = self.store.insert_recording(dvr_entry_id);
        self.transport
            .add_file(&format!("dvrfile/{}", dvr_entry_id), content);
        ResourceUri::Recording(row_id)
    }

    /// Subscription id of the outstanding live source.
    pub fn subscription_id(&self) -> u32 {
        use tvhplayer::DataSourceFactory;
        self.live_factory
            .current()
            .and_then(|source| source.lock().unwrap().subscription_id())
            .expect("no live source")
    }

    pub fn drain_events(&self) -> Vec<PlayerEvent> {
        self.events.try_iter().collect()
    }
}

pub fn track(id: &str, mime: &str, selected: bool) -> TrackEntry {
    TrackEntry {
        format: TrackFormat {
            id: id.to_string(),
            sample_mime_type: mime.to_string(),
            ..Default::default()
        },
        handled: true,
        selected,
    }
}

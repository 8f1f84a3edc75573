mod common;

use common::{NOW_MS, fixture, track};
use tvhcontract::ResourceUri;
use tvhplayer::DataSourceFactory;
use tvhplayer::{
    ControllerState, OpenError, OverlayState, PipelineState, PlaybackException,
    PlaybackExceptionKind, PlayerError, PlayerEvent, SourceKind, SubscriptionEvent,
    TimeshiftStatus, TrackType,
};

fn timeshift(start: Option<i64>, shift: Option<i64>) -> SubscriptionEvent {
    SubscriptionEvent::TimeshiftStatus(TimeshiftStatus {
        full: false,
        shift,
        start,
        end: None,
    })
}

#[test]
fn test_open_channel_subscribes_and_prepares() {
    let fx = fixture();
    fx.store.reserve_ids_up_to(42);
    let uri = fx.add_channel(5, "News HD");
    assert_eq!(uri, ResourceUri::Channel(42));

    fx.player.open(uri).unwrap();

    {
        let transport = fx.transport.state();
        assert_eq!(transport.subscriptions.len(), 1);
        assert_eq!(transport.subscriptions[0].channel_id, 5);
        assert_eq!(transport.subscriptions[0].profile, "htsp");
        assert_eq!(transport.subscriptions[0].timeshift_period_secs, 3600);
    }
    {
        let log = fx.pipeline.log();
        assert_eq!(log.prepared.len(), 1);
        assert_eq!(log.prepared[0].0, uri);
        assert_eq!(log.prepared[0].1, SourceKind::Live);
        assert_eq!(log.prepared[0].2.buffer_for_playback_ms, 500);
    }
    assert_eq!(fx.player.state().unwrap(), ControllerState::Opening);

    let session = fx.player.session().unwrap();
    assert_eq!(session.active_uri, Some(uri));
    assert_eq!(session.source_kind, Some(SourceKind::Live));
    assert!(session.has_data_source);

    fx.player.play().unwrap();
    assert_eq!(fx.player.state().unwrap(), ControllerState::Playing);
    assert!(fx.pipeline.log().play_when_ready);
}

#[test]
fn test_pipeline_ready_moves_to_playing() {
    let fx = fixture();
    let uri = fx.add_channel(1, "One");
    fx.player.open(uri).unwrap();

    fx.pipeline.sink().state_changed(true, PipelineState::Ready);
    assert_eq!(fx.player.state().unwrap(), ControllerState::Playing);

    let forwarded = fx.drain_events().into_iter().any(|event| {
        event
            == PlayerEvent::StateChanged {
                play_when_ready: true,
                state: PipelineState::Ready,
            }
    });
    assert!(forwarded);
}

#[test]
fn test_open_errors() {
    let fx = fixture();

    // Never inserted
    let missing = ResourceUri::Channel(999);
    assert_eq!(
        fx.player.open(missing),
        Err(PlayerError::Open(OpenError::ResourceNotFound(missing)))
    );
    assert!(!fx.player.session().unwrap().has_data_source);

    // Programs are not playable
    assert!(matches!(
        fx.player.open(ResourceUri::Program(1)),
        Err(PlayerError::Open(OpenError::InvalidUriKind(_)))
    ));

    // Recording without a file on the server
    let row = fx.store.insert_recording(12);
    let recording = ResourceUri::Recording(row);
    assert_eq!(
        fx.player.open(recording),
        Err(PlayerError::Open(OpenError::ResourceNotFound(recording)))
    );

    assert!(fx.pipeline.log().prepared.is_empty());
    assert_eq!(fx.transport.state().open_count(), 0);
}

#[test]
fn test_subscription_refused() {
    let fx = fixture();
    let uri = fx.add_channel(3, "Three");
    fx.transport.refuse_subscriptions("No free adapter");

    assert_eq!(
        fx.player.open(uri),
        Err(PlayerError::Open(OpenError::SubscriptionRefused(
            "No free adapter".to_string()
        )))
    );
    assert_eq!(fx.player.state().unwrap(), ControllerState::Stopped);

    let errors: Vec<_> = fx
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            PlayerEvent::Error(error) => Some(error),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, PlaybackExceptionKind::Source);
    assert!(errors[0].message.contains("No free adapter"));
}

#[test]
fn test_missing_resource_is_not_a_player_error() {
    let fx = fixture();
    let _ = fx.player.open(ResourceUri::Channel(999));

    let has_error = fx
        .drain_events()
        .iter()
        .any(|event| matches!(event, PlayerEvent::Error(_)));
    assert!(!has_error);
}

#[test]
fn test_server_stop_is_forwarded() {
    let fx = fixture();
    let uri = fx.add_channel(5, "News HD");
    fx.player.open(uri).unwrap();
    let first = fx.subscription_id();

    assert!(fx.live_factory.dispatch(first, SubscriptionEvent::Stop {
        reason: Some("bad signal".to_string()),
    }));
    fx.player.state().unwrap();

    let errors: Vec<_> = fx
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            PlayerEvent::Error(error) => Some(error),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, PlaybackExceptionKind::Source);
    assert!(errors[0].message.contains("bad signal"));
}

#[test]
fn test_server_stop_of_replaced_session_is_dropped() {
    let fx = fixture();
    let uri = fx.add_channel(5, "News HD");
    fx.player.open(uri).unwrap();
    let source = fx.live_factory.current().unwrap();

    // Late stop for the subscription the reopen replaced
    fx.player.open(uri).unwrap();
    fx.drain_events();
    source.lock().unwrap().handle_event(SubscriptionEvent::Stop { reason: None });
    fx.player.state().unwrap();

    assert!(fx.drain_events().is_empty());
}

#[test]
fn test_store_unavailable_on_open() {
    let fx = fixture();
    let uri = fx.add_channel(3, "Three");
    fx.store.set_available(false);

    assert!(matches!(
        fx.player.open(uri),
        Err(PlayerError::Open(OpenError::StoreUnavailable(_)))
    ));
}

#[test]
fn test_never_two_sources_open() {
    let fx = fixture();
    let channel = fx.add_channel(5, "News HD");
    let recording = fx.add_recording(77, vec![0x47; 188 * 4]);

    fx.player.open(channel).unwrap();
    fx.player.open(recording).unwrap();

    let transport = fx.transport.state();
    assert_eq!(transport.max_open, 1);
    assert!(transport.active_subscriptions.is_empty());
    assert_eq!(transport.open_files.len(), 1);
    assert_eq!(transport.opened_paths, vec!["dvrfile/77".to_string()]);
    drop(transport);

    let session = fx.player.session().unwrap();
    assert_eq!(session.active_uri, Some(recording));
    assert_eq!(session.source_kind, Some(SourceKind::Recording));
}

#[test]
fn test_reopening_same_channel_resubscribes() {
    let fx = fixture();
    let channel = fx.add_channel(5, "News HD");

    fx.player.open(channel).unwrap();
    let first = fx.subscription_id();
    fx.player.open(channel).unwrap();
    let second = fx.subscription_id();

    assert_ne!(first, second);
    let transport = fx.transport.state();
    assert_eq!(transport.max_open, 1);
    assert_eq!(transport.active_subscriptions.len(), 1);
    assert!(transport.active_subscriptions.contains(&second));
}

#[test]
fn test_stop_twice_equals_once() {
    let fx = fixture();
    let uri = fx.add_channel(5, "News HD");
    fx.player.open(uri).unwrap();
    fx.player.play().unwrap();

    fx.player.stop().unwrap();
    let state_once = fx.player.state().unwrap();
    let session_once = fx.player.session().unwrap();
    let open_once = fx.transport.state().open_count();

    fx.player.stop().unwrap();
    let session_twice = fx.player.session().unwrap();

    assert_eq!(state_once, ControllerState::Stopped);
    assert_eq!(fx.player.state().unwrap(), state_once);
    assert_eq!(session_twice.active_uri, session_once.active_uri);
    assert_eq!(session_twice.has_data_source, session_once.has_data_source);
    assert!(!session_twice.has_data_source);
    assert_eq!(fx.transport.state().open_count(), open_once);
    assert_eq!(open_once, 0);
    assert!(fx.pipeline.log().override_clears >= 2);
}

#[test]
fn test_commands_without_source_are_noops() {
    let fx = fixture();

    fx.player.seek(NOW_MS).unwrap();
    fx.player.pause().unwrap();
    fx.player.set_trick_play_speed(2.0).unwrap();

    let log = fx.pipeline.log();
    assert!(log.seeks.is_empty());
    assert!(log.speeds.is_empty());
    drop(log);
    assert!(fx.transport.state().speeds.is_empty());
    assert_eq!(fx.player.state().unwrap(), ControllerState::Idle);
    assert_eq!(fx.player.timeshift_start_position().unwrap(), None);
    assert_eq!(fx.player.timeshift_current_position().unwrap(), None);
}

#[test]
fn test_live_seek_uses_timeshift_start() {
    let fx = fixture();
    let uri = fx.add_channel(5, "News HD");
    fx.player.open(uri).unwrap();

    let id = fx.subscription_id();
    assert!(fx.live_factory.dispatch(id, SubscriptionEvent::Start));
    assert!(fx.live_factory.dispatch(id, timeshift(Some(1_000_000), Some(0))));

    // 10 s after the stream start
    fx.player.seek(NOW_MS + 10_000).unwrap();
    // Before the oldest buffered point: clamped to it
    fx.player.seek(NOW_MS - 60_000).unwrap();

    assert_eq!(fx.pipeline.log().seeks, vec![10_000, 1_000]);
}

#[test]
fn test_live_positions() {
    let fx = fixture();
    let uri = fx.add_channel(5, "News HD");
    fx.player.open(uri).unwrap();
    fx.pipeline.log().position_ms = 4_242;

    let id = fx.subscription_id();
    fx.live_factory.dispatch(id, SubscriptionEvent::Start);

    // Start pts known, offset not reported yet: pipeline position
    assert!(fx.live_factory.dispatch(id, timeshift(Some(1_000_000), None)));
    assert_eq!(fx.player.timeshift_start_position().unwrap(), Some(NOW_MS));
    assert_eq!(fx.player.timeshift_current_position().unwrap(), Some(4_242));
    // The start pts is in effect: seeking before it clamps
    fx.player.seek(NOW_MS - 1).unwrap();
    assert_eq!(fx.pipeline.log().seeks, vec![1_000]);

    // Five seconds behind live
    fx.live_factory.dispatch(id, timeshift(Some(1_000_000), Some(-5_000_000)));
    fx.clock.advance(1_000);
    assert_eq!(
        fx.player.timeshift_current_position().unwrap(),
        Some(NOW_MS + 1_000 - 5_000)
    );
}

#[test]
fn test_recording_positions_and_seek() {
    let fx = fixture();
    let uri = fx.add_recording(9, vec![1, 2, 3, 4]);
    fx.player.open(uri).unwrap();
    fx.pipeline.log().position_ms = 1_234;

    assert_eq!(fx.player.timeshift_start_position().unwrap(), Some(0));
    assert_eq!(fx.player.timeshift_current_position().unwrap(), Some(1_234));

    fx.player.seek(42_000).unwrap();
    assert_eq!(fx.pipeline.log().seeks, vec![42_000]);
}

#[test]
fn test_trick_play_speed() {
    let fx = fixture();
    let uri = fx.add_channel(5, "News HD");
    fx.player.open(uri).unwrap();
    let id = fx.subscription_id();

    fx.player.set_trick_play_speed(2.0).unwrap();
    fx.player.set_trick_play_speed(-48.0).unwrap();
    // No mapping: ignored
    fx.player.set_trick_play_speed(3.0).unwrap();
    fx.player.set_trick_play_speed(-1.0).unwrap();
    // Native rate passes through
    fx.player.set_trick_play_speed(300.0).unwrap();

    assert_eq!(
        fx.transport.state().speeds,
        vec![(id, 200), (id, -500), (id, 300)]
    );
    assert_eq!(fx.pipeline.log().speeds, vec![2.0, -5.0, 3.0]);
}

#[test]
fn test_pause_resume() {
    let fx = fixture();
    let uri = fx.add_channel(5, "News HD");
    fx.player.open(uri).unwrap();
    fx.player.play().unwrap();
    let id = fx.subscription_id();

    fx.player.pause().unwrap();
    fx.player.pause().unwrap();
    assert_eq!(fx.player.state().unwrap(), ControllerState::Paused);
    assert!(!fx.pipeline.log().play_when_ready);

    fx.player.resume().unwrap();
    assert_eq!(fx.player.state().unwrap(), ControllerState::Playing);
    assert!(fx.pipeline.log().play_when_ready);

    // Pausing twice sends a single speed 0
    assert_eq!(fx.transport.state().speeds, vec![(id, 0), (id, 100)]);
}

#[test]
fn test_speed_change_while_paused_waits_for_resume() {
    let fx = fixture();
    let uri = fx.add_channel(5, "News HD");
    fx.player.open(uri).unwrap();
    fx.player.play().unwrap();
    let id = fx.subscription_id();

    fx.player.pause().unwrap();
    fx.player.set_trick_play_speed(4.0).unwrap();
    assert_eq!(fx.player.state().unwrap(), ControllerState::Paused);
    assert_eq!(fx.transport.state().speeds, vec![(id, 0)]);

    fx.player.resume().unwrap();
    assert_eq!(fx.transport.state().speeds, vec![(id, 0), (id, 300)]);
}

#[test]
fn test_radio_overlay() {
    let fx = fixture();
    let uri = fx.add_channel(8, "Radio 8");
    fx.store.set_channel_logo(uri.row_id(), vec![0x89, 0x50]);
    fx.player.open(uri).unwrap();

    fx.pipeline.sink().tracks_changed(vec![
        track("a1", "audio/mpeg", true),
        track("v1", "video/hevc", false),
    ]);
    let overlay = fx.player.overlay().unwrap();
    assert!(overlay.radio_mode);
    assert_eq!(overlay.channel_name.as_deref(), Some("Radio 8"));
    assert_eq!(overlay.channel_logo, Some(vec![0x89, 0x50]));

    let tracks_event = fx
        .drain_events()
        .into_iter()
        .find_map(|event| match event {
            PlayerEvent::TracksChanged { tracks, selected } => Some((tracks, selected)),
            _ => None,
        })
        .unwrap();
    assert_eq!(tracks_event.0.len(), 2);
    assert_eq!(tracks_event.1.get(&TrackType::Audio).map(String::as_str), Some("a1"));
    assert!(!tracks_event.1.contains_key(&TrackType::Video));

    // Video shows up: overlay hidden
    fx.pipeline.sink().tracks_changed(vec![
        track("a1", "audio/mpeg", true),
        track("v1", "video/hevc", true),
    ]);
    assert_eq!(fx.player.overlay().unwrap(), OverlayState::default());
}

#[test]
fn test_radio_overlay_lookup_failure_keeps_state() {
    let fx = fixture();
    let uri = fx.add_channel(8, "Radio 8");
    fx.player.open(uri).unwrap();

    // Channel vanishes from the store mid-session
    fx.registry.remove_all_channels().unwrap();
    fx.pipeline
        .sink()
        .tracks_changed(vec![track("a1", "audio/mpeg", true)]);

    assert_eq!(fx.player.overlay().unwrap(), OverlayState::default());
}

#[test]
fn test_stale_callbacks_are_dropped() {
    let fx = fixture();
    let uri = fx.add_channel(8, "Radio 8");
    fx.player.open(uri).unwrap();
    let stale = fx.pipeline.sink();

    fx.player.stop().unwrap();
    fx.drain_events();

    stale.tracks_changed(vec![track("a1", "audio/mpeg", true)]);
    stale.error(PlaybackException::new(PlaybackExceptionKind::Source, "late"));
    stale.loading_changed(true);

    assert_eq!(fx.player.overlay().unwrap(), OverlayState::default());
    assert!(!fx.player.session().unwrap().has_data_source);
    assert!(fx.drain_events().is_empty());

    // Same once a new session is running
    fx.player.open(uri).unwrap();
    fx.drain_events();
    stale.tracks_changed(vec![track("a1", "audio/mpeg", true)]);
    assert_eq!(fx.player.overlay().unwrap(), OverlayState::default());
    assert!(fx.drain_events().is_empty());
}

#[test]
fn test_player_error_is_forwarded() {
    let fx = fixture();
    let uri = fx.add_channel(1, "One");
    fx.player.open(uri).unwrap();

    let error = PlaybackException::new(PlaybackExceptionKind::Renderer, "decoder init failed");
    fx.pipeline.sink().error(error.clone());
    fx.player.state().unwrap();

    assert!(fx.drain_events().contains(&PlayerEvent::Error(error)));
}

#[test]
fn test_loading_refreshes_data_source() {
    let fx = fixture();
    let uri = fx.add_recording(4, vec![9; 32]);
    fx.player.open(uri).unwrap();

    fx.pipeline.sink().loading_changed(true);
    let session = fx.player.session().unwrap();
    assert!(session.has_data_source);
    assert_eq!(session.source_kind, Some(SourceKind::Recording));
}

#[test]
fn test_track_controls() {
    let fx = fixture();
    fx.pipeline.log().known_tracks.insert("a2".to_string());

    assert!(fx.player.select_track(TrackType::Audio, "a2").unwrap());
    assert!(!fx.player.select_track(TrackType::Audio, "nope").unwrap());
    fx.player.set_caption_enabled(false).unwrap();
    fx.player.set_volume(1.5).unwrap();

    let log = fx.pipeline.log();
    assert_eq!(log.selected_tracks, vec![(TrackType::Audio, "a2".to_string())]);
    assert_eq!(log.disabled_renderers.get(&TrackType::Subtitle), Some(&true));
    assert_eq!(log.volume, Some(1.0));
}

#[test]
fn test_release() {
    let mut fx = fixture();
    let uri = fx.add_channel(5, "News HD");
    fx.player.open(uri).unwrap();

    fx.player.release().unwrap();
    assert!(fx.pipeline.log().released);
    assert_eq!(fx.transport.state().open_count(), 0);

    // Second release is a no-op, later commands find the thread gone
    fx.player.release().unwrap();
    assert_eq!(fx.player.open(uri), Err(PlayerError::ControllerGone));

    let states: Vec<_> = fx
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            PlayerEvent::ControllerState(state) => Some(state),
            _ => None,
        })
        .collect();
    assert!(states.ends_with(&[ControllerState::Releasing, ControllerState::Released]));
}

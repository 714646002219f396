use std::sync::Arc;
use std::time::Duration;

use super::support::*;
use crate::audio::EngineEvent;
use crate::error::PlaybackError;
use crate::models::{AudioItem, PlayerState};

fn seek_completed(seconds: f64, did_finish: bool) -> EngineEvent {
    EngineEvent::SeekCompleted {
        seconds,
        did_finish,
    }
}

async fn playing_harness(script: Script) -> Harness {
    let resolver = ScriptedResolver::new().script("a.mp3", script);
    let mut h = Harness::start(Arc::new(resolver));
    h.manager.load(AudioItem::new("a.mp3"), true).unwrap();
    h.wait_for_state(PlayerState::Playing(1.0)).await;
    h
}

#[tokio::test(start_paused = true)]
async fn test_seek_targets_are_clamped() {
    let mut h = playing_harness(Script::ok(100.0)).await;

    h.manager.seek(-5.0).unwrap();
    let events = without_samples(h.wait_for_state(PlayerState::Playing(1.0)).await);
    assert_eq!(
        events,
        vec![
            EngineEvent::StateChanged(PlayerState::Seeking),
            seek_completed(0.0, true),
            EngineEvent::StateChanged(PlayerState::Playing(1.0)),
        ]
    );
    assert_close(h.manager.current_time(), 0.0);

    // Clamped to the end: playback resumes there and completes at once
    h.manager.seek(150.0).unwrap();
    let events = without_samples(
        h.events_until(|e| *e == EngineEvent::ItemDidComplete).await,
    );
    assert_eq!(
        events,
        vec![
            EngineEvent::StateChanged(PlayerState::Seeking),
            seek_completed(100.0, true),
            EngineEvent::StateChanged(PlayerState::Playing(1.0)),
            EngineEvent::StateChanged(PlayerState::Completed),
            EngineEvent::ItemDidComplete,
        ]
    );
    assert_close(h.manager.current_time(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_seek_moves_the_clock() {
    let mut h = playing_harness(Script::ok(300.0)).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    h.manager.seek(120.0).unwrap();
    h.wait_for_state(PlayerState::Playing(1.0)).await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_close(h.manager.current_time(), 123.0);
    assert_close(h.info.snapshot().elapsed_playback_time, 120.0);

    let log = h.manager.session_log().get_event_statistics();
    assert_eq!(log.seek_operations, 1);
}

#[tokio::test(start_paused = true)]
async fn test_newer_seek_supersedes_pending_one() {
    let mut h =
        playing_harness(Script::ok(100.0).with_seek_delay(Duration::from_millis(200))).await;

    h.manager.seek(50.0).unwrap();
    h.manager.seek(80.0).unwrap();
    let events = without_samples(h.wait_for_state(PlayerState::Playing(1.0)).await);

    assert_eq!(
        events,
        vec![
            EngineEvent::StateChanged(PlayerState::Seeking),
            seek_completed(50.0, false),
            seek_completed(80.0, true),
            EngineEvent::StateChanged(PlayerState::Playing(1.0)),
        ]
    );
    assert_close(h.manager.current_time(), 80.0);
}

#[tokio::test(start_paused = true)]
async fn test_seek_while_paused_stays_paused() {
    let resolver = ScriptedResolver::new().script(
        "a.mp3",
        Script::ok(100.0).with_seek_delay(Duration::from_millis(50)),
    );
    let mut h = Harness::start(Arc::new(resolver));
    h.manager.load(AudioItem::new("a.mp3"), false).unwrap();
    h.wait_for_state(PlayerState::Paused).await;

    h.manager.seek(30.0).unwrap();
    let events = h.wait_for_state(PlayerState::Paused).await;

    assert_eq!(
        events,
        vec![
            EngineEvent::StateChanged(PlayerState::Seeking),
            seek_completed(30.0, true),
            EngineEvent::StateChanged(PlayerState::Paused),
        ]
    );
    assert_close(h.manager.current_time(), 30.0);
    assert!(h.events_within(Duration::from_secs(5)).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_seek_outside_a_session_is_ignored() {
    let resolver = ScriptedResolver::new()
        .script("a.mp3", Script::ok(100.0).with_delay(Duration::from_secs(1)));
    let mut h = Harness::start(Arc::new(resolver));

    // Idle
    h.manager.seek(10.0).unwrap();
    assert!(h.events_within(Duration::from_millis(100)).await.is_empty());

    // Loading
    h.manager.load(AudioItem::new("a.mp3"), false).unwrap();
    h.manager.seek(10.0).unwrap();
    let events = h.wait_for_state(PlayerState::Paused).await;
    assert!(!events
        .iter()
        .any(|e| matches!(e, EngineEvent::SeekCompleted { .. })));
    assert_eq!(h.manager.current_time(), 0.0);

    let history = h.manager.session_log().get_recent_events(100);
    let rejected = history
        .iter()
        .filter(|e| e.details.starts_with("seek rejected"))
        .count();
    assert_eq!(rejected, 2);
}

#[tokio::test(start_paused = true)]
async fn test_load_abandons_pending_seek() {
    let resolver = ScriptedResolver::new()
        .script("a.mp3", Script::ok(100.0).with_seek_delay(Duration::from_secs(1)))
        .script("b.mp3", Script::ok(50.0));
    let mut h = Harness::start(Arc::new(resolver));
    h.manager.load(AudioItem::new("a.mp3"), true).unwrap();
    h.wait_for_state(PlayerState::Playing(1.0)).await;

    h.manager.seek(40.0).unwrap();
    h.manager.load(AudioItem::new("b.mp3"), false).unwrap();
    let events = without_samples(h.events_within(Duration::from_secs(3)).await);

    assert_eq!(
        events,
        vec![
            EngineEvent::StateChanged(PlayerState::Seeking),
            seek_completed(40.0, false),
            EngineEvent::StateChanged(PlayerState::Idle),
            EngineEvent::StateChanged(PlayerState::Loading),
            EngineEvent::StateChanged(PlayerState::Ready),
            EngineEvent::StateChanged(PlayerState::Paused),
        ]
    );
    assert_eq!(h.manager.current_time(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_seek_fails_the_session() {
    let error = PlaybackError::DecodeFailure("seek table missing".to_string());
    let mut h = playing_harness(Script::ok(100.0).with_seek_error(error.clone())).await;

    h.manager.seek(60.0).unwrap();
    let events = without_samples(
        h.events_until(|e| matches!(e, EngineEvent::FailedWithError(_)))
            .await,
    );

    assert_eq!(
        events,
        vec![
            EngineEvent::StateChanged(PlayerState::Seeking),
            seek_completed(60.0, false),
            EngineEvent::StateChanged(PlayerState::Failed(error.clone())),
            EngineEvent::FailedWithError(Some(error)),
        ]
    );

    // No samples after failure
    assert!(h.events_within(Duration::from_secs(10)).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_duration_only_clamps_below() {
    let mut h = playing_harness(Script::unknown_duration()).await;

    h.manager.seek(500.0).unwrap();
    let events = without_samples(h.wait_for_state(PlayerState::Playing(1.0)).await);

    assert!(events.contains(&seek_completed(500.0, true)));
    assert_close(h.manager.current_time(), 500.0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_abandons_pending_seek() {
    let mut h =
        playing_harness(Script::ok(100.0).with_seek_delay(Duration::from_secs(10))).await;

    h.manager.seek(25.0).unwrap();
    h.wait_for_state(PlayerState::Seeking).await;

    let Harness {
        manager,
        observer: _observer,
        mut events,
        ..
    } = h;
    manager.shutdown().await;

    assert_eq!(events.try_recv().ok(), Some(seek_completed(25.0, false)));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(events.try_recv().is_err());
}

//! End-to-end manager tests: decode workers, sequencing and events
//!
//! The manager is driven the way a UI shell would drive it: commands,
//! then a poll loop that drains the event receiver.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use aura_audio::test_utils::{write_sine_wav, CaptureHandle, CaptureSink};
use aura_core::{AudioSink, Track};
use aura_playback::{
    ErrorKind, PlaybackConfig, PlaybackEvent, PlaybackManager, PlayerState, RepeatMode,
    SharedSinkFactory,
};
use crossbeam_channel::Receiver;

const SAMPLE_RATE: u32 = 8_000;
const TIMEOUT: Duration = Duration::from_secs(10);

/// Sink factory producing one instant-drain capture sink per session,
/// recording every handle for later inspection
fn capture_factory() -> (SharedSinkFactory, Arc<Mutex<Vec<CaptureHandle>>>) {
    let handles: Arc<Mutex<Vec<CaptureHandle>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&handles);
    let factory: SharedSinkFactory = Arc::new(move |spec| {
        let (sink, handle) = CaptureSink::new(spec);
        recorded.lock().expect("handles poisoned").push(handle);
        Ok(Box::new(sink) as Box<dyn AudioSink>)
    });
    (factory, handles)
}

fn write_fixture(dir: &Path, name: &str, duration_ms: u64) -> Track {
    let path = dir.join(name);
    write_sine_wav(&path, SAMPLE_RATE, duration_ms, 440.0);
    Track::new(path)
}

/// Poll the manager until the predicate sees a matching event
fn poll_until(
    manager: &mut PlaybackManager,
    events: &Receiver<PlaybackEvent>,
    seen: &mut Vec<PlaybackEvent>,
    mut matches: impl FnMut(&PlaybackEvent) -> bool,
) {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        manager.poll();
        let mut found = false;
        for event in events.try_iter() {
            if matches(&event) {
                found = true;
            }
            seen.push(event);
        }
        if found {
            return;
        }
        assert!(Instant::now() < deadline, "event never arrived: saw {seen:#?}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn playlist_advances_and_pauses_at_the_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracks = vec![
        write_fixture(dir.path(), "a.wav", 50),
        write_fixture(dir.path(), "b.wav", 50),
    ];
    let (factory, handles) = capture_factory();
    let (mut manager, events) = PlaybackManager::new(PlaybackConfig::default(), factory);
    manager.load_tracks(tracks);

    manager.play().expect("playlist is loaded");
    let mut seen = Vec::new();
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::Completed { index: 1 })
    });
    // End of playlist holds at the end of the last track inside the same
    // poll that saw the final completion.
    seen.extend(events.try_iter());
    assert!(seen.iter().any(|e| matches!(
        e,
        PlaybackEvent::StateChanged {
            state: PlayerState::Paused
        }
    )));

    assert!(seen
        .iter()
        .any(|e| matches!(e, PlaybackEvent::Completed { index: 0 })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, PlaybackEvent::TrackChanged { index: 1 })));
    assert_eq!(manager.state(), PlayerState::Paused);
    assert_eq!(manager.position_ms(), 50, "position is pinned to the end");
    // One session (and one sink) per track
    assert_eq!(handles.lock().expect("handles poisoned").len(), 2);
}

#[test]
fn play_after_the_playlist_ends_restarts_the_last_track() {
    let dir = tempfile::tempdir().expect("tempdir");
    let track = write_fixture(dir.path(), "finale.wav", 50);
    let (factory, handles) = capture_factory();
    let (mut manager, events) = PlaybackManager::new(PlaybackConfig::default(), factory);
    manager.load_tracks(vec![track]);

    manager.play().expect("playlist is loaded");
    let mut seen = Vec::new();
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::Completed { index: 0 })
    });
    manager.poll();
    assert_eq!(manager.state(), PlayerState::Paused);

    // The finished session cannot resume; play() prepares it again.
    manager.play().expect("playlist is loaded");
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::Prepared { index: 0, .. })
    });
    assert_eq!(handles.lock().expect("handles poisoned").len(), 2);
    manager.release();
}

#[test]
fn previous_past_the_threshold_restarts_a_finished_track() {
    let dir = tempfile::tempdir().expect("tempdir");
    let track = write_fixture(dir.path(), "replay.wav", 50);
    let (factory, handles) = capture_factory();
    let config = PlaybackConfig {
        restart_threshold_ms: 10,
        ..PlaybackConfig::default()
    };
    let (mut manager, events) = PlaybackManager::new(config, factory);
    manager.load_tracks(vec![track]);

    manager.play().expect("playlist is loaded");
    let mut seen = Vec::new();
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::Completed { index: 0 })
    });
    manager.poll();
    assert!(manager.position_ms() > 10, "position is past the threshold");

    // Past the threshold this is a restart, and the decode worker behind
    // the finished session is gone, so a new session must be prepared.
    manager.previous().expect("playlist is loaded");
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::Prepared { index: 0, .. })
    });
    assert_eq!(handles.lock().expect("handles poisoned").len(), 2);
    manager.release();
}

#[test]
fn repeat_one_replays_the_same_track() {
    let dir = tempfile::tempdir().expect("tempdir");
    let track = write_fixture(dir.path(), "loop.wav", 50);
    let (factory, _handles) = capture_factory();
    let config = PlaybackConfig {
        repeat: RepeatMode::One,
        ..PlaybackConfig::default()
    };
    let (mut manager, events) = PlaybackManager::new(config, factory);
    manager.load_tracks(vec![track]);

    manager.play().expect("playlist is loaded");
    let mut completions = 0usize;
    let mut seen = Vec::new();
    while completions < 2 {
        poll_until(&mut manager, &events, &mut seen, |e| {
            matches!(e, PlaybackEvent::Completed { index: 0 })
        });
        completions += 1;
    }
    manager.release();
    assert_eq!(manager.state(), PlayerState::Idle);
}

#[test]
fn prepared_track_gains_duration_metadata() {
    let dir = tempfile::tempdir().expect("tempdir");
    let track = write_fixture(dir.path(), "meta.wav", 50);
    let (factory, _handles) = capture_factory();
    let (mut manager, events) = PlaybackManager::new(PlaybackConfig::default(), factory);
    manager.load_tracks(vec![track]);

    manager.play_index(0).expect("index is valid");
    let mut seen = Vec::new();
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::MetadataUpdated { index: 0, .. })
    });

    let current = manager.current_track().expect("track is loaded");
    assert_eq!(current.duration_ms, 50);
    manager.release();
}

#[test]
fn unreadable_track_reports_one_error() {
    let (factory, _handles) = capture_factory();
    let (mut manager, events) = PlaybackManager::new(PlaybackConfig::default(), factory);
    manager.load_tracks(vec![Track::new(PathBuf::from("/missing/ghost.wav"))]);

    manager.play().expect("playlist is loaded");
    let mut seen = Vec::new();
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(
            e,
            PlaybackEvent::Error {
                kind: ErrorKind::NotFound,
                ..
            }
        )
    });

    // Extra polls must not repeat the failure
    for _ in 0..10 {
        manager.poll();
        thread::sleep(Duration::from_millis(5));
    }
    seen.extend(events.try_iter());
    let errors = seen
        .iter()
        .filter(|e| matches!(e, PlaybackEvent::Error { .. }))
        .count();
    assert_eq!(errors, 1);
    assert_eq!(manager.state(), PlayerState::Stopped);
}

#[test]
fn next_moves_to_the_following_track() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracks = vec![
        write_fixture(dir.path(), "a.wav", 50),
        write_fixture(dir.path(), "b.wav", 50),
    ];
    let (factory, _handles) = capture_factory();
    let (mut manager, events) = PlaybackManager::new(PlaybackConfig::default(), factory);
    manager.load_tracks(tracks);

    manager.play().expect("playlist is loaded");
    let mut seen = Vec::new();
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::Prepared { index: 0, .. })
    });

    manager.next().expect("playlist is loaded");
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::Prepared { index: 1, .. })
    });
    assert!(seen
        .iter()
        .any(|e| matches!(e, PlaybackEvent::TrackChanged { index: 1 })));
    manager.release();
}

#[test]
fn stop_then_play_restarts_the_current_track() {
    let dir = tempfile::tempdir().expect("tempdir");
    let track = write_fixture(dir.path(), "again.wav", 50);
    let (factory, handles) = capture_factory();
    let (mut manager, events) = PlaybackManager::new(PlaybackConfig::default(), factory);
    manager.load_tracks(vec![track]);

    manager.play().expect("playlist is loaded");
    let mut seen = Vec::new();
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::Prepared { index: 0, .. })
    });
    manager.stop();
    assert_eq!(manager.state(), PlayerState::Stopped);

    // A terminal session is replaced, not resumed
    manager.play().expect("playlist is loaded");
    poll_until(&mut manager, &events, &mut seen, |e| {
        matches!(e, PlaybackEvent::Prepared { index: 0, .. })
    });
    assert_eq!(handles.lock().expect("handles poisoned").len(), 2);
    manager.release();
}

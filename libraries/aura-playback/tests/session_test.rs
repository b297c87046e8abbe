//! Session state machine tests against real decode workers
//!
//! Each test drives a [`PlaybackSession`] the way the manager does: issue
//! a command, then pump until the worker's answer lands.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use aura_audio::test_utils::{write_ramp_wav, CaptureHandle, CaptureSink};
use aura_audio::{PipelineEvent, SinkFactory};
use aura_core::{AudioSink, AudioSpec};
use aura_playback::{PlaybackSession, PlayerState};

const SAMPLE_RATE: u32 = 8_000;
const TIMEOUT: Duration = Duration::from_secs(5);

fn instant_sink() -> (SinkFactory, CaptureHandle) {
    let (sink, handle) = CaptureSink::new(AudioSpec::new(SAMPLE_RATE, 2));
    let factory: SinkFactory = Box::new(move |_spec| Ok(Box::new(sink) as Box<dyn AudioSink>));
    (factory, handle)
}

fn realtime_sink() -> (SinkFactory, CaptureHandle) {
    let (sink, handle) = CaptureSink::realtime(AudioSpec::new(SAMPLE_RATE, 2), 512);
    let factory: SinkFactory = Box::new(move |_spec| Ok(Box::new(sink) as Box<dyn AudioSink>));
    (factory, handle)
}

fn fixture(dir: &Path, duration_ms: u64) -> std::path::PathBuf {
    let path = dir.join("track.wav");
    write_ramp_wav(&path, SAMPLE_RATE, duration_ms);
    path
}

/// Pump the session until the predicate sees a matching event
fn pump_until(
    session: &mut PlaybackSession,
    mut matches: impl FnMut(&PipelineEvent) -> bool,
) -> PipelineEvent {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        for event in session.pump() {
            if matches(&event) {
                return event;
            }
        }
        assert!(Instant::now() < deadline, "event never arrived");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn prepare_reports_stream_info_and_reaches_ready() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = fixture(dir.path(), 80);
    let (factory, _handle) = instant_sink();

    let mut session = PlaybackSession::prepare(path, 0, factory);
    assert_eq!(session.state(), PlayerState::Preparing);

    let prepared = pump_until(&mut session, |e| matches!(e, PipelineEvent::Prepared(_)));
    if let PipelineEvent::Prepared(info) = prepared {
        assert_eq!(info.duration_ms, 80);
    }
    assert_eq!(session.state(), PlayerState::Ready);
    assert_eq!(session.duration_ms(), 80);
    assert_eq!(session.position_ms(), 0);
}

#[test]
fn play_runs_to_completion_and_pins_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = fixture(dir.path(), 80);
    let (factory, handle) = instant_sink();

    let mut session = PlaybackSession::prepare(path, 0, factory);
    pump_until(&mut session, |e| matches!(e, PipelineEvent::Prepared(_)));
    session.play();
    assert_eq!(session.state(), PlayerState::Playing);

    pump_until(&mut session, |e| matches!(e, PipelineEvent::Completed));
    assert!(session.is_completed());
    assert_eq!(session.position_ms(), 80, "clock pinned to the duration");
    assert_eq!(handle.played_len(), (SAMPLE_RATE as usize * 80 / 1000) * 2);
}

#[test]
fn completion_is_never_reported_for_stop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = fixture(dir.path(), 500);
    let (factory, handle) = realtime_sink();

    let mut session = PlaybackSession::prepare(path, 0, factory);
    pump_until(&mut session, |e| matches!(e, PipelineEvent::Prepared(_)));
    session.play();

    let deadline = Instant::now() + TIMEOUT;
    while handle.played_len() == 0 {
        assert!(Instant::now() < deadline, "no audio flowed");
        session.pump();
        thread::sleep(Duration::from_millis(5));
    }

    session.stop();
    assert_eq!(session.state(), PlayerState::Stopped);
    assert!(!session.is_completed());
    assert!(session
        .pump()
        .iter()
        .all(|e| !matches!(e, PipelineEvent::Completed)));
}

#[test]
fn pause_freezes_the_reported_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = fixture(dir.path(), 500);
    let (factory, _handle) = realtime_sink();

    let mut session = PlaybackSession::prepare(path, 0, factory);
    pump_until(&mut session, |e| matches!(e, PipelineEvent::Prepared(_)));
    session.play();
    thread::sleep(Duration::from_millis(30));

    session.pause();
    assert_eq!(session.state(), PlayerState::Paused);
    let frozen = session.position_ms();
    assert!(frozen > 0, "position never advanced");
    thread::sleep(Duration::from_millis(40));
    assert_eq!(session.position_ms(), frozen);

    session.play();
    assert_eq!(session.state(), PlayerState::Playing);
    session.stop();
}

#[test]
fn seek_round_trips_through_seeking_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = fixture(dir.path(), 500);
    let (factory, _handle) = realtime_sink();

    let mut session = PlaybackSession::prepare(path, 0, factory);
    pump_until(&mut session, |e| matches!(e, PipelineEvent::Prepared(_)));
    session.play();

    session.seek(400);
    assert_eq!(session.state(), PlayerState::Seeking);
    // The clock jumps immediately, before the worker confirms
    assert!(session.position_ms() >= 400);

    pump_until(&mut session, |e| {
        matches!(e, PipelineEvent::SeekComplete { .. })
    });
    assert_eq!(
        session.state(),
        PlayerState::Playing,
        "seek must resume the originating state"
    );
    session.stop();
}

#[test]
fn seek_while_paused_stays_paused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = fixture(dir.path(), 500);
    let (factory, _handle) = realtime_sink();

    let mut session = PlaybackSession::prepare(path, 0, factory);
    pump_until(&mut session, |e| matches!(e, PipelineEvent::Prepared(_)));
    session.play();
    session.pause();

    session.seek(200);
    pump_until(&mut session, |e| {
        matches!(e, PipelineEvent::SeekComplete { .. })
    });
    assert_eq!(session.state(), PlayerState::Paused);
    assert_eq!(session.position_ms(), 200);
    session.release();
}

#[test]
fn failure_is_reported_once_and_stops_the_session() {
    let (factory, _handle) = instant_sink();
    let mut session =
        PlaybackSession::prepare(std::path::PathBuf::from("/missing/track.wav"), 0, factory);

    let failed = pump_until(&mut session, |e| matches!(e, PipelineEvent::Failed(_)));
    assert!(matches!(
        failed,
        PipelineEvent::Failed(aura_audio::AudioError::FileNotFound(_))
    ));
    assert_eq!(session.state(), PlayerState::Stopped);

    thread::sleep(Duration::from_millis(20));
    assert!(session.pump().is_empty(), "failure reported twice");
}

#[test]
fn terminal_sessions_ignore_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = fixture(dir.path(), 80);
    let (factory, _handle) = instant_sink();

    let mut session = PlaybackSession::prepare(path, 0, factory);
    pump_until(&mut session, |e| matches!(e, PipelineEvent::Prepared(_)));
    session.stop();

    session.play();
    assert_eq!(session.state(), PlayerState::Stopped);
    session.seek(10);
    assert_eq!(session.state(), PlayerState::Stopped);
    session.stop();
    assert_eq!(session.state(), PlayerState::Stopped);

    session.release();
    assert_eq!(session.state(), PlayerState::Released);
}

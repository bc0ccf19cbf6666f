//! Control loop tests
//!
//! The end-to-end test runs the session loop against a pump thread that pulls
//! frames from the sink the way the device callback does.

mod helpers;

use helpers::{MockDecoder, RecordingSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tuneq_ap::control::{Command, Session, SessionOptions, SessionOutcome, StatusSurface};
use tuneq_ap::playback::{EngineSettings, EngineState, PlaybackEngine, StatusSnapshot, Track, TrackQueue};
use tuneq_ap::{Error, Result};

/// Keeps every snapshot the loop draws
#[derive(Default)]
struct RecordingSurface {
    snapshots: Vec<StatusSnapshot>,
}

impl RecordingSurface {
    /// Track names in the order they were first shown
    fn track_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.snapshots.iter().filter_map(|s| s.track_name.clone()) {
            if names.last() != Some(&name) {
                names.push(name);
            }
        }
        names
    }
}

impl StatusSurface for RecordingSurface {
    fn render(&mut self, snapshot: &StatusSnapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}

/// Surface whose terminal is gone
struct BrokenSurface;

impl StatusSurface for BrokenSurface {
    fn render(&mut self, _snapshot: &StatusSnapshot) -> Result<()> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "terminal closed",
        )))
    }
}

fn session_with(
    decoder: &Arc<MockDecoder>,
    sink: &Arc<RecordingSink>,
    tracks: &[&Track],
    options: SessionOptions,
) -> Session {
    let mut queue = TrackQueue::new();
    queue.enqueue_many(tracks.iter().map(|t| (*t).clone()).collect(), false);
    let (engine, notices) =
        PlaybackEngine::new(decoder.clone(), sink.clone(), EngineSettings::default());
    Session::new(engine, notices, queue, options)
}

/// Pulls frames from the sink until stopped, like a device callback
struct Pump {
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Pump {
    fn start(sink: Arc<RecordingSink>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::SeqCst) {
                sink.render(50);
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_plays_queue_to_the_end() {
    let decoder = Arc::new(MockDecoder::new());
    let sink = RecordingSink::new();
    let a = decoder.add("a", 300);
    let b = decoder.add("b", 300);
    let options = SessionOptions {
        tick_interval: Duration::from_millis(5),
        upcoming_preview: 5,
    };
    let mut session = session_with(&decoder, &sink, &[&a, &b], options);
    session.start().unwrap();

    let _pump = Pump::start(sink.clone());
    let (_command_tx, mut commands) = mpsc::unbounded_channel();
    let mut surface = RecordingSurface::default();

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        session.run(&mut commands, &mut surface),
    )
    .await
    .expect("session did not finish")
    .unwrap();

    assert_eq!(outcome, SessionOutcome::QueueExhausted);
    assert_eq!(surface.track_names(), vec!["a.mp3", "b.mp3"]);
    assert_eq!(sink.submissions().len(), 2);
    assert_eq!(decoder.decode_count(&b), 1);

    let history: Vec<String> = session
        .queue()
        .history()
        .iter()
        .map(|e| e.track.display_name())
        .collect();
    assert_eq!(history, vec!["a.mp3", "b.mp3"]);
    assert!(sink.current_entry().is_none());
}

#[tokio::test]
async fn test_quit_command_ends_session() {
    let decoder = Arc::new(MockDecoder::new());
    let sink = RecordingSink::new();
    let a = decoder.add("a", 10_000);
    let mut session = session_with(&decoder, &sink, &[&a], SessionOptions::default());
    session.start().unwrap();

    let (command_tx, mut commands) = mpsc::unbounded_channel();
    command_tx.send(Command::VolumeUp).unwrap();
    command_tx.send(Command::Quit).unwrap();
    let mut surface = RecordingSurface::default();

    let outcome = session.run(&mut commands, &mut surface).await.unwrap();

    assert_eq!(outcome, SessionOutcome::Quit);
    assert_eq!(session.engine().state(), EngineState::Stopped);
    assert!(sink.current_entry().is_none());
    assert!(!surface.snapshots.is_empty());
    // The device itself stays open until the player exits
    assert!(!sink.is_released());
}

#[tokio::test]
async fn test_closed_command_channel_counts_as_quit() {
    let decoder = Arc::new(MockDecoder::new());
    let sink = RecordingSink::new();
    let a = decoder.add("a", 10_000);
    let mut session = session_with(&decoder, &sink, &[&a], SessionOptions::default());
    session.start().unwrap();

    let (command_tx, mut commands) = mpsc::unbounded_channel::<Command>();
    drop(command_tx);
    let mut surface = RecordingSurface::default();

    let outcome = session.run(&mut commands, &mut surface).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Quit);
}

#[tokio::test]
async fn test_return_to_selection_clears_queue() {
    let decoder = Arc::new(MockDecoder::new());
    let sink = RecordingSink::new();
    let a = decoder.add("a", 10_000);
    let b = decoder.add("b", 10_000);
    let mut session = session_with(&decoder, &sink, &[&a, &b], SessionOptions::default());
    session.start().unwrap();

    let outcome = session.apply(Command::ReturnToSelection).unwrap();

    assert_eq!(outcome, Some(SessionOutcome::ReturnToSelection));
    assert!(session.queue().is_empty());
    assert!(session.queue().history().is_empty());
    assert_eq!(session.engine().state(), EngineState::Stopped);
    assert!(sink.current_entry().is_none());
}

#[tokio::test]
async fn test_skipping_last_track_exhausts_queue() {
    let decoder = Arc::new(MockDecoder::new());
    let sink = RecordingSink::new();
    let a = decoder.add("a", 10_000);
    let mut session = session_with(&decoder, &sink, &[&a], SessionOptions::default());
    session.start().unwrap();

    assert_eq!(session.apply(Command::TogglePause).unwrap(), None);
    assert_eq!(
        session.apply(Command::Skip).unwrap(),
        Some(SessionOutcome::QueueExhausted)
    );
}

#[tokio::test]
async fn test_run_on_empty_queue_returns_immediately() {
    let decoder = Arc::new(MockDecoder::new());
    let sink = RecordingSink::new();
    let mut session = session_with(&decoder, &sink, &[], SessionOptions::default());
    session.start().unwrap();

    let (_command_tx, mut commands) = mpsc::unbounded_channel();
    let mut surface = RecordingSurface::default();

    let outcome = session.run(&mut commands, &mut surface).await.unwrap();
    assert_eq!(outcome, SessionOutcome::QueueExhausted);
    assert!(surface.snapshots.is_empty());
}

#[tokio::test]
async fn test_snapshot_reports_current_and_upcoming() {
    let decoder = Arc::new(MockDecoder::new());
    let sink = RecordingSink::new();
    let tracks: Vec<Track> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|name| decoder.add(name, 2_000))
        .collect();
    let refs: Vec<&Track> = tracks.iter().collect();
    let options = SessionOptions {
        tick_interval: Duration::from_millis(100),
        upcoming_preview: 3,
    };
    let mut session = session_with(&decoder, &sink, &refs, options);
    session.start().unwrap();

    session.apply(Command::SeekForward).unwrap();
    session.apply(Command::VolumeDown).unwrap();
    let snapshot = session.snapshot();

    assert_eq!(snapshot.state, EngineState::Playing);
    assert_eq!(snapshot.track_name.as_deref(), Some("a.mp3"));
    assert_eq!(snapshot.sample_rate, helpers::TEST_RATE);
    assert_eq!(snapshot.total_frames, 2_000);
    // A 10 s step does not fit in a 2 s track
    assert_eq!(snapshot.position_frames, 0);
    assert!(snapshot.volume_percent < 50.0);
    assert!(!snapshot.paused);
    assert_eq!(snapshot.upcoming, vec!["b.mp3", "c.mp3", "d.mp3"]);
}

#[tokio::test]
async fn test_render_failure_of_current_track_ends_session() {
    let decoder = Arc::new(MockDecoder::new());
    let sink = RecordingSink::new();
    let a = decoder.add("a", 10_000);
    let b = decoder.add("b", 10_000);
    let options = SessionOptions {
        tick_interval: Duration::from_millis(5),
        upcoming_preview: 5,
    };
    let mut session = session_with(&decoder, &sink, &[&a, &b], options);
    session.start().unwrap();
    sink.current().unwrap().fail("bad packet".to_string());

    let (_command_tx, mut commands) = mpsc::unbounded_channel();
    let mut surface = RecordingSurface::default();

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        session.run(&mut commands, &mut surface),
    )
    .await
    .expect("session did not finish")
    .unwrap_err();

    assert!(matches!(err, Error::DecodeFailure(ref reason) if reason == "bad packet"));
    assert_eq!(session.engine().state(), EngineState::Stopped);
    assert!(sink.current_entry().is_none());
    assert!(sink.is_released());
    // b is never promoted
    assert_eq!(sink.submissions().len(), 1);
}

#[tokio::test]
async fn test_surface_failure_stops_and_releases_output() {
    let decoder = Arc::new(MockDecoder::new());
    let sink = RecordingSink::new();
    let a = decoder.add("a", 10_000);
    let mut session = session_with(&decoder, &sink, &[&a], SessionOptions::default());
    session.start().unwrap();

    let (_command_tx, mut commands) = mpsc::unbounded_channel();
    let err = session
        .run(&mut commands, &mut BrokenSurface)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert_eq!(session.engine().state(), EngineState::Stopped);
    assert!(sink.current_entry().is_none());
    assert!(sink.is_released());
}

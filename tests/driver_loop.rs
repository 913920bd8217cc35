//! The async driver end to end, on paused tokio time.

use std::sync::Arc;
use std::time::Duration;

use arcadeflow::adapter::recording::{AudioCall, RecordingAudio, RecordingMinigame, RecordingPresenter};
use arcadeflow::adapter::TokioClock;
use arcadeflow::config::SessionConfig;
use arcadeflow::driver;
use arcadeflow::engine::content::{ContentLibrary, ContentSelector};
use arcadeflow::engine::events::Inbound;
use arcadeflow::engine::session::{Collaborators, Session};
use arcadeflow::engine::state::SessionPhase;
use tokio::sync::mpsc;
use tokio::time::sleep;

fn build(presenter: &RecordingPresenter, minigame: &RecordingMinigame) -> Session {
    let collab = Collaborators {
        audio: Box::new(RecordingAudio::new()),
        minigame: Box::new(minigame.clone()),
        presenter: Box::new(presenter.clone()),
        clock: Arc::new(TokioClock::new()),
    };
    Session::new(
        SessionConfig::default(),
        ContentSelector::seeded(ContentLibrary::builtin(), 21),
        collab,
    )
}

async fn send(tx: &mpsc::Sender<Inbound>, line: &str) {
    let inbound = Inbound::parse_line(line).unwrap();
    tx.send(inbound).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn driver_runs_a_full_session() {
    let presenter = RecordingPresenter::new();
    let minigame = RecordingMinigame::new();
    let session = build(&presenter, &minigame);
    let (tx, rx) = mpsc::channel(16);

    let script = async move {
        for line in ["enter", "confirm", "start", "success", "success", "complete continue"] {
            send(&tx, line).await;
        }
        // Timers fire on their own between answers.
        for _ in 0..5 {
            send(&tx, "answer 5").await;
            sleep(Duration::from_millis(1_000)).await;
        }
        send(&tx, "begin").await;
        send(&tx, r#"{"type": "complete", "roundId": "followTheFade", "final": true}"#).await;
        sleep(Duration::from_millis(10)).await;
    };

    let (stats, ()) = tokio::join!(driver::run(session, rx), script);

    assert_eq!(stats.successes, 2);
    assert_eq!(stats.responses, 5);
    assert_eq!(stats.rounds_started, 2);
    assert_eq!(stats.rounds_completed, 2);
    assert!((stats.peak_depth - 0.45).abs() < 1e-9);

    let last = presenter.last().unwrap();
    assert_eq!(last.phase, SessionPhase::Complete);
    assert_eq!(last.environment.depth_level, 0.0);
    assert_eq!(minigame.started_rounds().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn driver_clears_affirmation_on_schedule() {
    let presenter = RecordingPresenter::new();
    let minigame = RecordingMinigame::new();
    let session = build(&presenter, &minigame);
    let (tx, rx) = mpsc::channel(16);

    let watcher = presenter.clone();
    let script = async move {
        for line in ["enter", "confirm", "start", "success"] {
            send(&tx, line).await;
        }
        sleep(Duration::from_millis(100)).await;
        assert!(watcher.last().unwrap().last_affirmation.is_some());

        sleep(Duration::from_millis(1_000)).await;
        let snap = watcher.last().unwrap();
        assert_eq!(snap.phase, SessionPhase::RoundActive);
        assert!(snap.last_affirmation.is_none());
    };

    let (stats, ()) = tokio::join!(driver::run(session, rx), script);
    assert_eq!(stats.successes, 1);
}

#[tokio::test]
async fn driver_returns_when_inbox_closes_immediately() {
    let presenter = RecordingPresenter::new();
    let minigame = RecordingMinigame::new();
    let session = build(&presenter, &minigame);
    let (tx, rx) = mpsc::channel::<Inbound>(1);
    drop(tx);
    let stats = driver::run(session, rx).await;
    assert_eq!(stats.rounds_started, 0);
    assert_eq!(presenter.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn driver_silences_audio_when_inbox_closes() {
    let audio = RecordingAudio::new();
    let collab = Collaborators {
        audio: Box::new(audio.clone()),
        minigame: Box::new(RecordingMinigame::new()),
        presenter: Box::new(RecordingPresenter::new()),
        clock: Arc::new(TokioClock::new()),
    };
    let session = Session::new(
        SessionConfig::default(),
        ContentSelector::seeded(ContentLibrary::builtin(), 21),
        collab,
    );
    let (tx, rx) = mpsc::channel(16);

    let script = async move {
        for line in ["enter", "confirm", "start", "success"] {
            send(&tx, line).await;
        }
    };

    let (stats, ()) = tokio::join!(driver::run(session, rx), script);
    assert_eq!(stats.successes, 1);
    assert_eq!(audio.starts(), 1);
    // One stop on entering Intro, one at shutdown.
    assert_eq!(audio.stops(), 2);
    assert_eq!(audio.calls().last(), Some(&AudioCall::Stop));
}

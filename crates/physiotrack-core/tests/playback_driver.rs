//! Real-time driver tests on tokio's paused clock.

use std::time::Duration;

use physiotrack_core::cue::NullCuePlayer;
use physiotrack_core::exercise::{Exercise, SessionDefinition, SessionExercise};
use physiotrack_core::session::{run_playback, Command, SessionCoordinator};
use physiotrack_core::storage::Database;
use physiotrack_core::timer::{TimerSettings, TimerState};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

fn settings() -> TimerSettings {
    TimerSettings {
        countdown_secs: 0,
        rest_between_sets_secs: 0,
        pause_between_exercises_secs: 0,
        ..TimerSettings::default()
    }
}

fn seeded(target_secs: u32) -> (Database, SessionDefinition) {
    let db = Database::open_memory().unwrap();
    db.add_exercise(&Exercise::duration("plank", "Plank", target_secs)).unwrap();
    let definition = SessionDefinition {
        id: "s".into(),
        name: "Plank only".into(),
        exercises: vec![SessionExercise::new("plank")],
        auto_advance: true,
    };
    db.add_session_definition(&definition).unwrap();
    (db, definition)
}

#[tokio::test(start_paused = true)]
async fn ticks_once_per_second_until_complete() {
    let (db, definition) = seeded(3);
    let mut coordinator = SessionCoordinator::new(&db, NullCuePlayer);
    coordinator.start_session(&definition, &settings()).unwrap();
    let view = coordinator.subscribe();

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(Command::Play).unwrap();

    let started = Instant::now();
    let coordinator = run_playback(coordinator, rx).await;

    assert!(coordinator.is_complete());
    assert_eq!(started.elapsed(), Duration::from_secs(3));
    assert_eq!(coordinator.engine_state().total_elapsed_secs, 3);
    assert_eq!(view.borrow().snapshot.timer_state, TimerState::Completed);
    drop(tx);
}

#[tokio::test(start_paused = true)]
async fn quit_returns_without_completing() {
    let (db, definition) = seeded(3);
    let mut coordinator = SessionCoordinator::new(&db, NullCuePlayer);
    coordinator.start_session(&definition, &settings()).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(Command::Quit).unwrap();
    let coordinator = run_playback(coordinator, rx).await;

    assert!(!coordinator.is_complete());
    assert_eq!(coordinator.engine_state().timer_state, TimerState::Paused);
}

#[tokio::test(start_paused = true)]
async fn closed_channel_stops_playback() {
    let (db, definition) = seeded(3);
    let mut coordinator = SessionCoordinator::new(&db, NullCuePlayer);
    coordinator.start_session(&definition, &settings()).unwrap();

    let (tx, rx) = mpsc::unbounded_channel::<Command>();
    drop(tx);
    let coordinator = run_playback(coordinator, rx).await;
    assert_eq!(coordinator.engine_state().timer_state, TimerState::Paused);
}

#[tokio::test(start_paused = true)]
async fn pause_holds_progress_until_play() {
    let (db, definition) = seeded(5);
    let mut coordinator = SessionCoordinator::new(&db, NullCuePlayer);
    coordinator.start_session(&definition, &settings()).unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(Command::TogglePlay).unwrap();
    let started = Instant::now();

    let remote = async {
        sleep(Duration::from_millis(2_500)).await;
        tx.send(Command::TogglePlay).unwrap();
        sleep(Duration::from_secs(10)).await;
        tx.send(Command::Play).unwrap();
    };
    let (coordinator, ()) = tokio::join!(run_playback(coordinator, rx), remote);

    assert!(coordinator.is_complete());
    assert_eq!(coordinator.engine_state().total_elapsed_secs, 5);
    // Two ticks before the pause, three after the 10 s hold.
    assert_eq!(started.elapsed(), Duration::from_millis(15_500));
}

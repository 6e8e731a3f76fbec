//! End-to-end playback scenarios: the engine on its own, and the coordinator
//! writing through to an on-disk database.

use physiotrack_core::cue::{AudioCue, NullCuePlayer};
use physiotrack_core::exercise::{
    resolve, Exercise, ExerciseOverrides, SessionDefinition, SessionExercise, SideMode,
};
use physiotrack_core::session::{SessionCoordinator, SessionStatus, SessionStore};
use physiotrack_core::storage::Database;
use physiotrack_core::timer::{Side, TimerEngine, TimerSettings, TimerState};
use physiotrack_core::{CoreError, Event, SessionError};

fn quick(rest: u32) -> TimerSettings {
    TimerSettings {
        countdown_secs: 0,
        rest_between_sets_secs: rest,
        pause_between_exercises_secs: 0,
        ..TimerSettings::default()
    }
}

fn cues(events: &[Event]) -> Vec<AudioCue> {
    events.iter().filter_map(Event::cue).collect()
}

#[test]
fn three_by_ten_with_zero_rest_runs_straight_through() {
    let plan = resolve(
        &Exercise::reps("sq", "Squat", 10, 3, 2).with_rest_between_sets(0),
        &ExerciseOverrides::default(),
        &TimerSettings::default(),
    );
    let mut engine = TimerEngine::new();
    engine.initialize(vec![plan], TimerSettings { countdown_secs: 0, ..TimerSettings::default() }, true);
    engine.play();

    let mut heard = Vec::new();
    for _ in 0..60 {
        assert_eq!(engine.state(), TimerState::Active);
        heard.extend(cues(&engine.tick()));
    }
    assert_eq!(engine.state(), TimerState::Completed);
    assert!(!heard.contains(&AudioCue::RestStart));
    assert!(!heard.contains(&AudioCue::RestEnd));
    assert_eq!(heard.iter().filter(|c| **c == AudioCue::RepEnd).count(), 30);
    assert_eq!(engine.total_elapsed_secs(), 60);
}

#[test]
fn unilateral_rest_then_waits_for_continuation() {
    let plan = resolve(
        &Exercise::reps("lunge", "Lunge", 5, 2, 2).with_side_mode(SideMode::Unilateral),
        &ExerciseOverrides::default(),
        &TimerSettings::default(),
    );
    let mut engine = TimerEngine::new();
    engine.initialize(vec![plan], quick(10), false);
    engine.play();

    let mut heard = Vec::new();
    for _ in 0..10 {
        heard.extend(cues(&engine.tick()));
    }
    assert_eq!(heard.iter().filter(|c| **c == AudioCue::SwitchSides).count(), 1);
    assert_eq!(heard.iter().filter(|c| **c == AudioCue::RepEnd).count(), 4);
    assert_eq!(engine.state(), TimerState::Resting);
    assert_eq!(engine.exercise_state().side, Side::Right);
    assert_eq!(engine.exercise_state().set, 1);

    for _ in 0..9 {
        engine.tick();
        assert_eq!(engine.state(), TimerState::Resting);
    }
    assert_eq!(cues(&engine.tick()), vec![AudioCue::RestEnd]);
    assert_eq!(engine.state(), TimerState::Paused);
    assert!(engine.is_awaiting_set_continuation());

    assert_eq!(cues(&engine.play()), vec![AudioCue::RepStart]);
    assert_eq!(engine.state(), TimerState::Active);
    assert!(!engine.is_awaiting_set_continuation());
    assert_eq!(engine.exercise_state().side, Side::Right);
    assert_eq!(engine.exercise_state().rep, 1);
}

#[test]
fn go_to_exercise_while_active_changes_nothing() {
    let plans = ["a", "b", "c"]
        .iter()
        .map(|id| {
            resolve(
                &Exercise::duration(*id, "Hold", 20),
                &ExerciseOverrides::default(),
                &TimerSettings::default(),
            )
        })
        .collect();
    let mut engine = TimerEngine::new();
    engine.initialize(plans, quick(0), true);
    engine.play();
    engine.tick();
    assert_eq!(engine.state(), TimerState::Active);

    let before = engine.snapshot();
    assert!(engine.go_to_exercise(2).is_empty());
    assert_eq!(engine.snapshot(), before);
}

fn seed(db: &Database) -> SessionDefinition {
    db.add_exercise(&Exercise::duration("plank", "Plank", 2)).unwrap();
    db.add_exercise(&Exercise::reps("bridge", "Bridge", 2, 1, 1)).unwrap();
    let definition = SessionDefinition {
        id: "core".into(),
        name: "Core stability".into(),
        exercises: vec![SessionExercise::new("plank"), SessionExercise::new("bridge")],
        auto_advance: false,
    };
    db.add_session_definition(&definition).unwrap();
    definition
}

#[test]
fn progress_survives_a_restart_and_resumes_at_next_exercise() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("physiotrack.db");
    let settings = quick(0);

    let instance_id = {
        let db = Database::open_at(&path).unwrap();
        let definition = seed(&db);
        let mut coordinator = SessionCoordinator::new(&db, NullCuePlayer);
        let id = coordinator.start_session(&definition, &settings).unwrap();
        assert!(coordinator.play());
        coordinator.tick();
        coordinator.tick();
        // Auto-advance is off, so the second exercise waits.
        assert_eq!(coordinator.engine_state().timer_state, TimerState::Paused);
        assert_eq!(coordinator.engine_state().exercise_state.exercise_index, 1);
        id
    };

    let db = Database::open_at(&path).unwrap();
    let stored = db.get_session_instance(&instance_id).unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::InProgress);
    assert!(stored.exercises[0].completed);
    assert_eq!(stored.exercises[0].actual_duration_secs, Some(2));
    assert_eq!(stored.elapsed_secs, 2);
    assert_eq!(db.latest_in_progress().unwrap().map(|i| i.id), Some(instance_id.clone()));

    let mut coordinator = SessionCoordinator::new(&db, NullCuePlayer);
    coordinator.resume_session(stored, &settings).unwrap();
    let view = coordinator.view();
    assert_eq!(view.snapshot.timer_state, TimerState::Paused);
    assert_eq!(view.snapshot.exercise_state.exercise_index, 1);
    assert_eq!(view.snapshot.total_elapsed_secs, 2);
    assert_eq!(view.instance_id.as_deref(), Some(instance_id.as_str()));

    coordinator.play();
    coordinator.tick();
    coordinator.tick();
    assert!(coordinator.is_complete());

    let stored = db.get_session_instance(&instance_id).unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert!(stored.ended_at.is_some());
    assert_eq!(stored.elapsed_secs, 4);
    assert!(stored.exercises.iter().all(|e| e.completed));

    db.mark_logged(&instance_id).unwrap();
    let stats = db.stats().unwrap();
    assert_eq!(stats.completed_sessions, 1);
    assert_eq!(stats.exercises_completed, 2);
}

#[test]
fn skipping_everything_completes_with_skipped_records() {
    let db = Database::open_memory().unwrap();
    let definition = seed(&db);
    let mut coordinator = SessionCoordinator::new(&db, NullCuePlayer);
    let id = coordinator.start_session(&definition, &quick(0)).unwrap();

    assert!(coordinator.skip());
    assert!(coordinator.skip());
    assert!(coordinator.is_complete());
    assert!(!coordinator.skip());

    let stored = db.get_session_instance(&id).unwrap().unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert!(stored.exercises.iter().all(|e| e.skipped && !e.completed));
    assert_eq!(db.stats().unwrap().exercises_skipped, 2);
}

#[test]
fn starting_a_missing_or_empty_definition_fails() {
    let db = Database::open_memory().unwrap();
    let mut coordinator = SessionCoordinator::new(&db, NullCuePlayer);

    let empty = SessionDefinition {
        id: "empty".into(),
        name: "Empty".into(),
        exercises: Vec::new(),
        auto_advance: true,
    };
    let err = coordinator
        .start_session(&empty, &TimerSettings::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::Session(SessionError::NoExercises)));
    assert!(coordinator.instance().is_none());
    assert!(db.list_session_instances(None).unwrap().is_empty());
    assert!(db.get_session_definition("nope").unwrap().is_none());
}

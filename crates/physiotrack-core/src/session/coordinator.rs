//! Bridges the timer engine to the store, the cue player, and the UI.
//!
//! The coordinator is the only layer that touches persistence or audio.
//! Engine events are dispatched synchronously: cues go straight to the
//! player, progress is written through to the store, and a fresh
//! [`SessionView`] is published on a `watch` channel after every batch.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use super::{SessionInstance, SessionStatus, SessionStore};
use crate::cue::{play_cue, CuePlayer};
use crate::error::{CoreError, Result, SessionError};
use crate::events::Event;
use crate::exercise::{resolve, Exercise, ExercisePlan, SessionDefinition, SessionExercise};
use crate::timer::{EngineSnapshot, ResumeState, TimerEngine, TimerSettings, TimerState};

/// Read-only state published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionView {
    pub snapshot: EngineSnapshot,
    pub instance_id: Option<String>,
    pub session_name: Option<String>,
    pub current_exercise: Option<ExercisePlan>,
    pub is_running: bool,
    pub completion_pct: f64,
    /// Last persistence failure, kept until dismissed.
    pub notice: Option<String>,
}

pub struct SessionCoordinator<S, P> {
    store: S,
    player: P,
    engine: TimerEngine,
    instance: Option<SessionInstance>,
    definition: Option<SessionDefinition>,
    notice: Option<String>,
    view: watch::Sender<SessionView>,
}

impl<S: SessionStore, P: CuePlayer> SessionCoordinator<S, P> {
    pub fn new(store: S, player: P) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self {
            store,
            player,
            engine: TimerEngine::new(),
            instance: None,
            definition: None,
            notice: None,
            view,
        }
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn instance(&self) -> Option<&SessionInstance> {
        self.instance.as_ref()
    }

    pub fn definition(&self) -> Option<&SessionDefinition> {
        self.definition.as_ref()
    }

    pub fn engine_state(&self) -> EngineSnapshot {
        self.engine.snapshot()
    }

    pub fn current_exercise(&self) -> Option<&ExercisePlan> {
        self.engine.current_exercise()
    }

    /// Active or counting down.
    pub fn is_running(&self) -> bool {
        self.engine.state().is_running()
    }

    pub fn is_complete(&self) -> bool {
        self.engine.state() == TimerState::Completed
    }

    pub fn completion_pct(&self) -> f64 {
        self.instance
            .as_ref()
            .map(SessionInstance::completion_pct)
            .unwrap_or(0.0)
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
        self.publish();
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Resolve the definition, persist a new in-progress instance, and load
    /// the engine paused at the first exercise. Returns the instance id.
    ///
    /// Nothing changes if any step fails.
    pub fn start_session(
        &mut self,
        definition: &SessionDefinition,
        settings: &TimerSettings,
    ) -> Result<String> {
        let plans = self.build_plans(&definition.exercises, settings)?;
        let mut instance = SessionInstance::start(definition, &plans, Utc::now());
        let id = self.store.add_session_instance(&instance)?;
        instance.id = id.clone();
        info!(instance_id = %id, session = %definition.name, exercises = plans.len(), "session started");

        self.engine.destroy();
        self.definition = Some(definition.clone());
        self.instance = Some(instance);
        let events = self
            .engine
            .initialize(plans, settings.clone(), definition.auto_advance);
        self.dispatch(events);
        Ok(id)
    }

    /// Pick a persisted instance back up at its first unfinished exercise.
    pub fn resume_session(
        &mut self,
        mut instance: SessionInstance,
        settings: &TimerSettings,
    ) -> Result<()> {
        let definition = self
            .store
            .get_session_definition(&instance.session_id)?
            .ok_or_else(|| SessionError::DefinitionNotFound(instance.session_id.clone()))?;

        // Records fix the order; the definition entry at the same position
        // contributes overrides when it still names the same exercise.
        let entries: Vec<SessionExercise> = instance
            .exercises
            .iter()
            .enumerate()
            .map(|(i, record)| match definition.exercises.get(i) {
                Some(entry) if entry.exercise_id == record.exercise_id => entry.clone(),
                _ => SessionExercise::new(record.exercise_id.clone()),
            })
            .collect();
        let plans = self.build_plans(&entries, settings)?;

        let resume = ResumeState {
            exercise_index: instance.resume_index().unwrap_or(plans.len()),
            completed_indices: instance.completed_indices(),
            total_elapsed_secs: instance.elapsed_secs,
            auto_advance: definition.auto_advance,
        };
        if !instance.is_finished() {
            instance.status = SessionStatus::InProgress;
        }
        instance.started_at.get_or_insert_with(Utc::now);
        self.store.update_session_instance(&instance)?;
        info!(instance_id = %instance.id, resume_index = resume.exercise_index, "session resumed");

        self.engine.destroy();
        self.definition = Some(definition);
        self.instance = Some(instance);
        let events = self.engine.resume(plans, settings.clone(), resume);
        self.dispatch(events);
        Ok(())
    }

    /// Tear down the engine and forget the instance. Persisted data stays.
    pub fn destroy(&mut self) {
        self.engine.destroy();
        self.instance = None;
        self.definition = None;
        self.notice = None;
        self.publish();
    }

    // ── Actions ──────────────────────────────────────────────────────
    //
    // Each returns whether the engine accepted the command.

    pub fn play(&mut self) -> bool {
        let events = self.engine.play();
        self.dispatch(events)
    }

    pub fn pause(&mut self) -> bool {
        let events = self.engine.pause();
        self.dispatch(events)
    }

    pub fn skip(&mut self) -> bool {
        let events = self.engine.skip();
        self.dispatch(events)
    }

    pub fn go_to_exercise(&mut self, index: usize) -> bool {
        let events = self.engine.go_to_exercise(index);
        self.dispatch(events)
    }

    pub fn toggle_auto_advance(&mut self) -> bool {
        let events = self.engine.toggle_auto_advance();
        self.dispatch(events)
    }

    pub fn finish(&mut self) -> bool {
        let events = self.engine.finish();
        self.dispatch(events)
    }

    /// One elapsed second.
    pub fn tick(&mut self) -> bool {
        let events = self.engine.tick();
        self.dispatch(events)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn build_plans(
        &self,
        entries: &[SessionExercise],
        settings: &TimerSettings,
    ) -> Result<Vec<ExercisePlan>> {
        if entries.is_empty() {
            return Err(SessionError::NoExercises.into());
        }
        let library = self.store.get_exercises()?;
        let by_id: HashMap<&str, &Exercise> =
            library.iter().map(|e| (e.id.as_str(), e)).collect();
        entries
            .iter()
            .map(|entry| {
                by_id
                    .get(entry.exercise_id.as_str())
                    .map(|exercise| resolve(exercise, &entry.overrides, settings))
                    .ok_or_else(|| {
                        CoreError::from(SessionError::ExerciseNotFound(entry.exercise_id.clone()))
                    })
            })
            .collect()
    }

    fn dispatch(&mut self, events: Vec<Event>) -> bool {
        if events.is_empty() {
            return false;
        }
        for event in events {
            match event {
                Event::Cue { cue } => play_cue(&mut self.player, cue),
                Event::ExerciseCompleted {
                    index,
                    skipped,
                    actual_duration_secs,
                    at,
                    ..
                } => {
                    if let Some(instance) = self.instance.as_mut() {
                        instance.mark_exercise(index, skipped, actual_duration_secs, at);
                    }
                    self.persist();
                }
                Event::SessionCompleted {
                    total_elapsed_secs,
                    at,
                } => {
                    if let Some(instance) = self.instance.as_mut() {
                        instance.elapsed_secs = total_elapsed_secs;
                        if instance.status != SessionStatus::Logged {
                            instance.status = SessionStatus::Completed;
                        }
                        instance.ended_at = Some(at);
                        info!(instance_id = %instance.id, total_elapsed_secs, "session marked completed");
                    }
                    self.persist();
                }
                Event::StateChanged { snapshot } => {
                    if let Some(instance) = self.instance.as_mut() {
                        instance.elapsed_secs = snapshot.total_elapsed_secs;
                    }
                    self.persist();
                }
            }
        }
        self.publish();
        true
    }

    /// Write-through. Failures never stop playback; they become a notice.
    fn persist(&mut self) {
        let Some(instance) = self.instance.as_ref() else {
            return;
        };
        if let Err(e) = self.store.update_session_instance(instance) {
            warn!(instance_id = %instance.id, error = %e, "failed to persist session progress");
            self.notice = Some(format!("Progress could not be saved: {e}"));
        }
    }

    fn publish(&self) {
        let view = SessionView {
            snapshot: self.engine.snapshot(),
            instance_id: self.instance.as_ref().map(|i| i.id.clone()),
            session_name: self.definition.as_ref().map(|d| d.name.clone()),
            current_exercise: self.engine.current_exercise().cloned(),
            is_running: self.is_running(),
            completion_pct: self.completion_pct(),
            notice: self.notice.clone(),
        };
        self.view.send_replace(view);
    }
}

//! Session playback engine.
//!
//! The engine is a tick-driven state machine. It owns no threads or
//! timers -- the caller invokes `tick()` once per elapsed second, and every
//! command or tick returns the events it produced.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Paused <-> Countdown -> Active <-> (Resting | Preparing) -> Completed
//! ```
//!
//! `Paused` is also entered between sets and exercises when auto-advance is
//! off. `Active` re-enters itself across rep and set boundaries when the rest
//! duration is zero.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.initialize(plans, settings, true);
//! engine.play();
//! // Once per second:
//! for event in engine.tick() { /* dispatch */ }
//! ```

use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::settings::TimerSettings;
use super::state::{EngineSnapshot, ExerciseState, ResumeState, Side, SidePhase, TimerState};
use crate::cue::AudioCue;
use crate::events::Event;
use crate::exercise::{ExerciseKind, ExercisePlan, SideMode};

/// Number of closing seconds of a duration exercise that get a lead-in cue.
pub const LEAD_IN_CUE_SECS: u32 = 3;

/// Core playback engine.
///
/// All runtime fields live here and are only mutated by the engine's own
/// methods; observers get [`EngineSnapshot`] copies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerEngine {
    settings: TimerSettings,
    exercises: Vec<ExercisePlan>,
    state: TimerState,
    exercise: ExerciseState,
    total_elapsed_secs: u64,
    auto_advance: bool,
    awaiting_set_continuation: bool,
    /// State interrupted by `pause`; `play` returns to it.
    #[serde(default)]
    paused_from: Option<TimerState>,
    /// Indices already completed or skipped; forward progression passes them.
    #[serde(default)]
    finished: BTreeSet<usize>,
    #[serde(skip)]
    outbox: Vec<Event>,
}

impl TimerEngine {
    /// Create an idle engine with no exercises loaded.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn exercise_state(&self) -> &ExerciseState {
        &self.exercise
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn exercises(&self) -> &[ExercisePlan] {
        &self.exercises
    }

    pub fn current_exercise(&self) -> Option<&ExercisePlan> {
        self.exercises.get(self.exercise.exercise_index)
    }

    pub fn total_elapsed_secs(&self) -> u64 {
        self.total_elapsed_secs
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn is_awaiting_set_continuation(&self) -> bool {
        self.awaiting_set_continuation
    }

    /// Build an immutable snapshot of the current state.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            timer_state: self.state,
            exercise_state: self.exercise.clone(),
            exercise_count: self.exercises.len(),
            total_elapsed_secs: self.total_elapsed_secs,
            auto_advance: self.auto_advance,
            awaiting_set_continuation: self.awaiting_set_continuation,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load a fresh session, paused at the first exercise.
    ///
    /// An empty exercise list leaves the engine idle.
    pub fn initialize(
        &mut self,
        exercises: Vec<ExercisePlan>,
        settings: TimerSettings,
        auto_advance: bool,
    ) -> Vec<Event> {
        self.destroy();
        if exercises.is_empty() {
            debug!("initialize called with no exercises; staying idle");
            return Vec::new();
        }
        self.settings = settings;
        self.exercises = exercises;
        self.auto_advance = auto_advance;
        self.load_exercise(0);
        self.set_state(TimerState::Paused);
        self.flush()
    }

    /// Rebuild a paused engine from persisted progress.
    ///
    /// Playback resumes at the first exercise at or after
    /// `resume.exercise_index` that is not in `completed_indices`. When no
    /// such exercise exists the session completes immediately.
    pub fn resume(
        &mut self,
        exercises: Vec<ExercisePlan>,
        settings: TimerSettings,
        resume: ResumeState,
    ) -> Vec<Event> {
        self.destroy();
        if exercises.is_empty() {
            debug!("resume called with no exercises; staying idle");
            return Vec::new();
        }
        self.settings = settings;
        self.exercises = exercises;
        self.auto_advance = resume.auto_advance;
        self.total_elapsed_secs = resume.total_elapsed_secs;
        self.finished = resume.completed_indices;

        let next = (resume.exercise_index..self.exercises.len())
            .find(|i| !self.finished.contains(i));
        match next {
            Some(index) => {
                self.load_exercise(index);
                self.set_state(TimerState::Paused);
            }
            None => {
                self.load_exercise(self.exercises.len() - 1);
                self.complete_session();
            }
        }
        self.flush()
    }

    /// Disarm every timer and drop the loaded session.
    pub fn destroy(&mut self) {
        *self = Self::default();
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn play(&mut self) -> Vec<Event> {
        match self.state {
            TimerState::Paused => {
                if self.awaiting_set_continuation {
                    self.awaiting_set_continuation = false;
                    self.set_state(TimerState::Active);
                    self.cue(AudioCue::RepStart);
                } else if let Some(from) = self.paused_from.take() {
                    self.set_state(from);
                } else {
                    self.start_countdown();
                }
                self.flush()
            }
            TimerState::Preparing => {
                self.exercise.preparing_remaining_secs = 0;
                self.start_countdown();
                self.flush()
            }
            _ => Vec::new(),
        }
    }

    pub fn pause(&mut self) -> Vec<Event> {
        match self.state {
            TimerState::Active | TimerState::Countdown => {
                self.paused_from = Some(self.state);
                self.set_state(TimerState::Paused);
                self.flush()
            }
            _ => Vec::new(),
        }
    }

    /// Mark the current exercise skipped and move on. Paused only.
    pub fn skip(&mut self) -> Vec<Event> {
        if self.state != TimerState::Paused {
            return Vec::new();
        }
        self.report_exercise(true);
        match self.next_unfinished() {
            Some(next) => {
                self.load_exercise(next);
                self.set_state(TimerState::Paused);
            }
            None => self.complete_session(),
        }
        self.flush()
    }

    /// Jump to any exercise. Paused only; out-of-range indices are ignored.
    pub fn go_to_exercise(&mut self, index: usize) -> Vec<Event> {
        if self.state != TimerState::Paused || index >= self.exercises.len() {
            return Vec::new();
        }
        self.load_exercise(index);
        self.flush()
    }

    pub fn toggle_auto_advance(&mut self) -> Vec<Event> {
        if matches!(self.state, TimerState::Idle | TimerState::Completed) {
            return Vec::new();
        }
        self.auto_advance = !self.auto_advance;
        self.flush()
    }

    /// End the session early.
    pub fn finish(&mut self) -> Vec<Event> {
        if matches!(self.state, TimerState::Idle | TimerState::Completed) {
            return Vec::new();
        }
        self.complete_session();
        self.flush()
    }

    /// Advance by one second. A no-op unless a timed state is armed.
    pub fn tick(&mut self) -> Vec<Event> {
        if !self.state.is_timed() {
            return Vec::new();
        }
        if self.state.is_running() {
            self.total_elapsed_secs += 1;
        }
        match self.state {
            TimerState::Countdown => self.tick_countdown(),
            TimerState::Active => match self.current_exercise().map(|p| p.kind) {
                Some(ExerciseKind::Duration { target_secs }) => self.tick_duration(target_secs),
                Some(ExerciseKind::Reps {
                    reps,
                    sets,
                    rep_duration_secs,
                    pause_between_reps_secs,
                    rest_between_sets_secs,
                    side_mode,
                }) => self.tick_reps(RepsParams {
                    reps,
                    sets,
                    rep_duration_secs,
                    pause_between_reps_secs,
                    rest_secs: rest_between_sets_secs
                        .unwrap_or(self.settings.rest_between_sets_secs),
                    side_mode,
                }),
                None => {}
            },
            TimerState::Resting => self.tick_rest(),
            TimerState::Preparing => self.tick_preparing(),
            _ => {}
        }
        self.flush()
    }

    // ── Tick handlers ────────────────────────────────────────────────

    fn tick_countdown(&mut self) {
        self.exercise.countdown_secs = self.exercise.countdown_secs.saturating_sub(1);
        if self.exercise.countdown_secs > 0 {
            self.cue(AudioCue::CountdownTick);
        } else {
            self.begin_exercise();
        }
    }

    fn tick_duration(&mut self, target_secs: u32) {
        self.exercise.elapsed_secs += 1;
        let remaining = target_secs.saturating_sub(self.exercise.elapsed_secs);
        if remaining == 0 {
            self.cue(AudioCue::DurationEnd);
            self.complete_exercise();
        } else if self.settings.lead_in_cues_enabled && remaining <= LEAD_IN_CUE_SECS {
            self.cue(AudioCue::CountdownTick);
        }
    }

    fn tick_reps(&mut self, params: RepsParams) {
        if self.exercise.pausing_between_reps {
            self.exercise.rep_pause_remaining_secs =
                self.exercise.rep_pause_remaining_secs.saturating_sub(1);
            if self.exercise.rep_pause_remaining_secs == 0 {
                self.exercise.pausing_between_reps = false;
                self.cue(AudioCue::RepStart);
            }
            return;
        }

        self.exercise.elapsed_secs += 1;
        self.exercise.rep_elapsed_secs += 1;
        let last_in_phase = self.is_last_rep_of_phase(params.reps, params.side_mode);

        if self.exercise.rep_elapsed_secs == rep_end_cue_at(params.rep_duration_secs) {
            let switching_sides = last_in_phase
                && params.side_mode == SideMode::Unilateral
                && self.exercise.side_phase == SidePhase::First;
            // The switch cue replaces the rep-end cue for this rep.
            if switching_sides {
                self.cue(AudioCue::SwitchSides);
            } else {
                self.cue(AudioCue::RepEnd);
            }
        }

        if self.exercise.rep_elapsed_secs >= params.rep_duration_secs {
            if last_in_phase {
                self.complete_phase(&params);
            } else {
                self.advance_rep(&params);
            }
        }
    }

    fn tick_rest(&mut self) {
        self.exercise.rest_elapsed_secs += 1;
        if self.exercise.rest_elapsed_secs >= self.exercise.rest_duration_secs {
            if self.settings.rest_cues_enabled {
                self.cue(AudioCue::RestEnd);
            }
            self.exercise.rest_elapsed_secs = 0;
            self.exercise.rest_duration_secs = 0;
            self.continue_or_await();
        }
    }

    fn tick_preparing(&mut self) {
        self.exercise.preparing_remaining_secs =
            self.exercise.preparing_remaining_secs.saturating_sub(1);
        if self.exercise.preparing_remaining_secs == 0 {
            self.start_countdown();
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_last_rep_of_phase(&self, reps: u32, side_mode: SideMode) -> bool {
        match side_mode {
            // Each rep number covers both sides; the pair ends off the start side.
            SideMode::Alternating => {
                self.exercise.rep >= reps && self.exercise.side != self.exercise.set_start_side
            }
            _ => self.exercise.rep >= reps,
        }
    }

    fn advance_rep(&mut self, params: &RepsParams) {
        match params.side_mode {
            SideMode::Alternating => {
                if self.exercise.side != self.exercise.set_start_side {
                    self.exercise.rep += 1;
                }
                self.exercise.side = self.exercise.side.opposite();
            }
            _ => self.exercise.rep += 1,
        }
        self.exercise.rep_elapsed_secs = 0;
        if params.pause_between_reps_secs > 0 {
            self.exercise.pausing_between_reps = true;
            self.exercise.rep_pause_remaining_secs = params.pause_between_reps_secs;
        } else {
            self.cue(AudioCue::RepStart);
        }
    }

    fn complete_phase(&mut self, params: &RepsParams) {
        let ex = &mut self.exercise;
        if params.side_mode == SideMode::Unilateral && ex.side_phase == SidePhase::First {
            ex.side_phase = SidePhase::Second;
            ex.side = ex.set_start_side.opposite();
            ex.rep = 1;
            debug!(set = ex.set, side = ?ex.side, "switching sides");
            self.begin_set_transition(params.rest_secs, true);
        } else if ex.set < params.sets {
            ex.set += 1;
            ex.rep = 1;
            ex.side_phase = SidePhase::First;
            ex.side = ex.set_start_side;
            debug!(set = ex.set, "starting next set");
            self.begin_set_transition(params.rest_secs, false);
        } else {
            self.complete_exercise();
        }
    }

    fn begin_set_transition(&mut self, rest_secs: u32, side_switch: bool) {
        self.exercise.rep_elapsed_secs = 0;
        self.exercise.pausing_between_reps = false;
        self.exercise.rep_pause_remaining_secs = 0;
        if rest_secs > 0 {
            self.exercise.rest_elapsed_secs = 0;
            self.exercise.rest_duration_secs = rest_secs;
            self.set_state(TimerState::Resting);
            // A side switch already played its own tone.
            if self.settings.rest_cues_enabled && !side_switch {
                self.cue(AudioCue::RestStart);
            }
        } else {
            self.continue_or_await();
        }
    }

    fn continue_or_await(&mut self) {
        if self.auto_advance {
            self.set_state(TimerState::Active);
            self.cue(AudioCue::RepStart);
        } else {
            self.awaiting_set_continuation = true;
            self.set_state(TimerState::Paused);
        }
    }

    fn start_countdown(&mut self) {
        if self.settings.countdown_secs == 0 {
            self.begin_exercise();
            return;
        }
        self.exercise.countdown_secs = self.settings.countdown_secs;
        self.set_state(TimerState::Countdown);
        self.cue(AudioCue::CountdownTick);
    }

    fn begin_exercise(&mut self) {
        self.exercise.countdown_secs = 0;
        self.exercise.rep_elapsed_secs = 0;
        self.exercise.pausing_between_reps = false;
        self.set_state(TimerState::Active);
        match self.current_exercise().map(|p| p.kind) {
            Some(ExerciseKind::Duration { .. }) => self.cue(AudioCue::DurationStart),
            Some(ExerciseKind::Reps { .. }) => self.cue(AudioCue::RepStart),
            None => {}
        }
    }

    fn complete_exercise(&mut self) {
        self.report_exercise(false);
        let Some(next) = self.next_unfinished() else {
            self.complete_session();
            return;
        };
        self.load_exercise(next);
        if !self.auto_advance {
            self.set_state(TimerState::Paused);
            return;
        }
        let prepare = self.settings.pause_between_exercises_secs;
        if prepare > 0 {
            self.exercise.preparing_remaining_secs = prepare;
            self.set_state(TimerState::Preparing);
        } else {
            self.start_countdown();
        }
    }

    /// First exercise after the current one that has not been finished.
    fn next_unfinished(&self) -> Option<usize> {
        (self.exercise.exercise_index + 1..self.exercises.len())
            .find(|i| !self.finished.contains(i))
    }

    fn report_exercise(&mut self, skipped: bool) {
        let Some(plan) = self.current_exercise() else {
            return;
        };
        let event = Event::ExerciseCompleted {
            index: self.exercise.exercise_index,
            exercise_id: plan.exercise_id.clone(),
            skipped,
            actual_duration_secs: self.exercise.elapsed_secs,
            at: Utc::now(),
        };
        self.finished.insert(self.exercise.exercise_index);
        self.outbox.push(event);
    }

    fn complete_session(&mut self) {
        self.paused_from = None;
        self.awaiting_set_continuation = false;
        self.set_state(TimerState::Completed);
        self.cue(AudioCue::SessionComplete);
        info!(total_elapsed_secs = self.total_elapsed_secs, "session complete");
        self.outbox.push(Event::SessionCompleted {
            total_elapsed_secs: self.total_elapsed_secs,
            at: Utc::now(),
        });
    }

    /// Reset per-exercise runtime state at `index`.
    fn load_exercise(&mut self, index: usize) {
        let start_side = match self.exercises.get(index).map(ExercisePlan::side_mode) {
            Some(SideMode::Unilateral) | Some(SideMode::Alternating) => self.settings.first_side(),
            _ => Side::None,
        };
        self.exercise = ExerciseState {
            exercise_index: index,
            side: start_side,
            set_start_side: start_side,
            ..ExerciseState::default()
        };
        self.awaiting_set_continuation = false;
        self.paused_from = None;
    }

    fn set_state(&mut self, next: TimerState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, index = self.exercise.exercise_index, "timer state");
            self.state = next;
        }
    }

    fn cue(&mut self, cue: AudioCue) {
        self.outbox.push(Event::Cue { cue });
    }

    /// Close a batch: append the resulting snapshot and hand the events out.
    fn flush(&mut self) -> Vec<Event> {
        let snapshot = self.snapshot();
        self.outbox.push(Event::StateChanged { snapshot });
        std::mem::take(&mut self.outbox)
    }
}

#[derive(Debug, Clone, Copy)]
struct RepsParams {
    reps: u32,
    sets: u32,
    rep_duration_secs: u32,
    pause_between_reps_secs: u32,
    rest_secs: u32,
    side_mode: SideMode,
}

/// Rep-end cue lands one second before the rep's nominal end, never at 0.
fn rep_end_cue_at(rep_duration_secs: u32) -> u32 {
    rep_duration_secs.saturating_sub(1).max(1)
}

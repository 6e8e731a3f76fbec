use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    #[default]
    Idle,
    Paused,
    Countdown,
    Active,
    Resting,
    Preparing,
    Completed,
}

impl TimerState {
    /// States in which the total-session timer accumulates.
    pub fn is_running(self) -> bool {
        matches!(self, TimerState::Active | TimerState::Countdown)
    }

    /// States with an armed per-second exercise timer.
    pub fn is_timed(self) -> bool {
        matches!(
            self,
            TimerState::Countdown | TimerState::Active | TimerState::Resting | TimerState::Preparing
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    #[default]
    None,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::None => Side::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidePhase {
    #[default]
    First,
    Second,
}

/// Progress within the current exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseState {
    pub exercise_index: usize,
    /// 1-based.
    pub set: u32,
    /// 1-based.
    pub rep: u32,
    pub side: Side,
    pub side_phase: SidePhase,
    /// Side the current set started on; alternating exercises flip away from
    /// it and back within a set.
    pub set_start_side: Side,
    /// Active seconds spent in this exercise, excluding inter-rep pauses.
    pub elapsed_secs: u32,
    pub rep_elapsed_secs: u32,
    pub pausing_between_reps: bool,
    pub rep_pause_remaining_secs: u32,
    pub rest_elapsed_secs: u32,
    pub rest_duration_secs: u32,
    pub countdown_secs: u32,
    pub preparing_remaining_secs: u32,
}

impl Default for ExerciseState {
    fn default() -> Self {
        Self {
            exercise_index: 0,
            set: 1,
            rep: 1,
            side: Side::None,
            side_phase: SidePhase::First,
            set_start_side: Side::None,
            elapsed_secs: 0,
            rep_elapsed_secs: 0,
            pausing_between_reps: false,
            rep_pause_remaining_secs: 0,
            rest_elapsed_secs: 0,
            rest_duration_secs: 0,
            countdown_secs: 0,
            preparing_remaining_secs: 0,
        }
    }
}

/// Immutable view of the engine handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub timer_state: TimerState,
    pub exercise_state: ExerciseState,
    pub exercise_count: usize,
    pub total_elapsed_secs: u64,
    pub auto_advance: bool,
    pub awaiting_set_continuation: bool,
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            timer_state: TimerState::Idle,
            exercise_state: ExerciseState::default(),
            exercise_count: 0,
            total_elapsed_secs: 0,
            auto_advance: false,
            awaiting_set_continuation: false,
        }
    }
}

/// What a persisted session instance contributes to `TimerEngine::resume`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub exercise_index: usize,
    pub completed_indices: BTreeSet<usize>,
    pub total_elapsed_secs: u64,
    pub auto_advance: bool,
}

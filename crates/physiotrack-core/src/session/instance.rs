use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::exercise::{ExerciseKind, ExercisePlan, ExerciseType, SessionDefinition, SideMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Logged,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Planned => "planned",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Logged => "logged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(SessionStatus::Planned),
            "in_progress" => Some(SessionStatus::InProgress),
            "completed" => Some(SessionStatus::Completed),
            "logged" => Some(SessionStatus::Logged),
            _ => None,
        }
    }
}

/// Per-exercise record of a session instance.
///
/// The target fields snapshot the resolved plan at session start; only the
/// completion fields change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedExercise {
    pub exercise_id: String,
    pub name: String,
    pub exercise_type: ExerciseType,
    #[serde(default)]
    pub target_duration_secs: Option<u32>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub rep_duration_secs: Option<u32>,
    #[serde(default)]
    pub side_mode: SideMode,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub actual_duration_secs: Option<u32>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletedExercise {
    pub fn from_plan(plan: &ExercisePlan) -> Self {
        let (target_duration_secs, reps, sets, rep_duration_secs) = match plan.kind {
            ExerciseKind::Duration { target_secs } => (Some(target_secs), None, None, None),
            ExerciseKind::Reps {
                reps,
                sets,
                rep_duration_secs,
                ..
            } => (None, Some(reps), Some(sets), Some(rep_duration_secs)),
        };
        Self {
            exercise_id: plan.exercise_id.clone(),
            name: plan.name.clone(),
            exercise_type: plan.exercise_type(),
            target_duration_secs,
            reps,
            sets,
            rep_duration_secs,
            side_mode: plan.side_mode(),
            completed: false,
            skipped: false,
            actual_duration_secs: None,
            completed_at: None,
        }
    }

    /// Completed or skipped.
    pub fn is_finished(&self) -> bool {
        self.completed || self.skipped
    }
}

/// One day's attempt at a session definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInstance {
    /// Assigned by the store on insert; empty until then.
    #[serde(default)]
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub session_name: String,
    pub date: NaiveDate,
    pub status: SessionStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Accumulated active seconds, kept so playback can resume across restarts.
    #[serde(default)]
    pub elapsed_secs: u64,
    pub exercises: Vec<CompletedExercise>,
}

impl SessionInstance {
    /// A new in-progress instance with one record per planned exercise, in order.
    pub fn start(definition: &SessionDefinition, plans: &[ExercisePlan], now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            session_id: definition.id.clone(),
            session_name: definition.name.clone(),
            date: now.date_naive(),
            status: SessionStatus::InProgress,
            started_at: Some(now),
            ended_at: None,
            elapsed_secs: 0,
            exercises: plans.iter().map(CompletedExercise::from_plan).collect(),
        }
    }

    /// Index of the first record neither completed nor skipped.
    pub fn resume_index(&self) -> Option<usize> {
        self.exercises.iter().position(|e| !e.is_finished())
    }

    pub fn completed_indices(&self) -> BTreeSet<usize> {
        self.exercises
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_finished())
            .map(|(i, _)| i)
            .collect()
    }

    /// 0.0 .. 100.0 share of finished records.
    pub fn completion_pct(&self) -> f64 {
        if self.exercises.is_empty() {
            return 0.0;
        }
        let finished = self.exercises.iter().filter(|e| e.is_finished()).count();
        finished as f64 / self.exercises.len() as f64 * 100.0
    }

    /// Record the outcome of one exercise. Returns `false` for a bad index.
    pub fn mark_exercise(
        &mut self,
        index: usize,
        skipped: bool,
        actual_duration_secs: u32,
        at: DateTime<Utc>,
    ) -> bool {
        let Some(record) = self.exercises.get_mut(index) else {
            return false;
        };
        record.completed = !skipped;
        record.skipped = skipped;
        record.actual_duration_secs = Some(actual_duration_secs);
        record.completed_at = Some(at);
        true
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, SessionStatus::Completed | SessionStatus::Logged)
    }
}

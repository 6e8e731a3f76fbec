//! Exercise library types and the single default-resolution path.
//!
//! Exercises and session definitions come from the store with most
//! parameters optional. [`resolve`] is the only place those options are
//! filled in, so every consumer (engine, snapshot records, CLI output) sees
//! the same numbers.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::timer::TimerSettings;

pub const DEFAULT_REPS: u32 = 10;
pub const DEFAULT_SETS: u32 = 3;
pub const DEFAULT_DURATION_SECS: u32 = 30;
pub const DEFAULT_PAUSE_BETWEEN_REPS_SECS: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Duration,
    Reps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideMode {
    #[default]
    Bilateral,
    Unilateral,
    Alternating,
}

impl std::str::FromStr for ExerciseType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duration" => Ok(ExerciseType::Duration),
            "reps" => Ok(ExerciseType::Reps),
            other => Err(ValidationError::InvalidValue {
                field: "type".into(),
                message: format!("expected 'duration' or 'reps', got '{other}'"),
            }),
        }
    }
}

impl std::str::FromStr for SideMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bilateral" => Ok(SideMode::Bilateral),
            "unilateral" => Ok(SideMode::Unilateral),
            "alternating" => Ok(SideMode::Alternating),
            other => Err(ValidationError::InvalidValue {
                field: "side_mode".into(),
                message: format!("expected bilateral, unilateral or alternating, got '{other}'"),
            }),
        }
    }
}

/// A library exercise. Owned by the store; read-only to playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
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
    pub pause_between_reps_secs: Option<u32>,
    #[serde(default)]
    pub rest_between_sets_secs: Option<u32>,
    #[serde(default)]
    pub side_mode: SideMode,
}

impl Exercise {
    /// A duration exercise with no optional fields set.
    pub fn duration(id: impl Into<String>, name: impl Into<String>, target_secs: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            exercise_type: ExerciseType::Duration,
            target_duration_secs: Some(target_secs),
            reps: None,
            sets: None,
            rep_duration_secs: None,
            pause_between_reps_secs: None,
            rest_between_sets_secs: None,
            side_mode: SideMode::Bilateral,
        }
    }

    /// A reps exercise with explicit reps, sets and seconds per rep.
    pub fn reps(
        id: impl Into<String>,
        name: impl Into<String>,
        reps: u32,
        sets: u32,
        rep_duration_secs: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            exercise_type: ExerciseType::Reps,
            target_duration_secs: None,
            reps: Some(reps),
            sets: Some(sets),
            rep_duration_secs: Some(rep_duration_secs),
            pause_between_reps_secs: None,
            rest_between_sets_secs: None,
            side_mode: SideMode::Bilateral,
        }
    }

    pub fn with_side_mode(mut self, side_mode: SideMode) -> Self {
        self.side_mode = side_mode;
        self
    }

    pub fn with_rest_between_sets(mut self, secs: u32) -> Self {
        self.rest_between_sets_secs = Some(secs);
        self
    }

    pub fn with_pause_between_reps(mut self, secs: u32) -> Self {
        self.pause_between_reps_secs = Some(secs);
        self
    }

    /// Reject values that cannot describe a playable exercise.
    ///
    /// Absent fields are fine; explicit zeros for counts and durations are not.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Empty("name".into()));
        }
        let positive = [
            ("target_duration_secs", self.target_duration_secs),
            ("reps", self.reps),
            ("sets", self.sets),
            ("rep_duration_secs", self.rep_duration_secs),
        ];
        for (field, value) in positive {
            if value == Some(0) {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: "must be at least 1".into(),
                });
            }
        }
        Ok(())
    }
}

/// Per-session parameter overrides for one entry of a session definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_duration_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep_duration_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_between_reps_secs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_between_sets_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionExercise {
    pub exercise_id: String,
    #[serde(default)]
    pub overrides: ExerciseOverrides,
}

impl SessionExercise {
    pub fn new(exercise_id: impl Into<String>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            overrides: ExerciseOverrides::default(),
        }
    }
}

/// A named, ordered list of exercises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDefinition {
    pub id: String,
    pub name: String,
    pub exercises: Vec<SessionExercise>,
    #[serde(default)]
    pub auto_advance: bool,
}

/// Fully resolved exercise parameters, as the engine consumes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExercisePlan {
    pub exercise_id: String,
    pub name: String,
    pub kind: ExerciseKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExerciseKind {
    Duration {
        target_secs: u32,
    },
    Reps {
        reps: u32,
        sets: u32,
        rep_duration_secs: u32,
        pause_between_reps_secs: u32,
        /// `None` defers to [`TimerSettings::rest_between_sets_secs`].
        rest_between_sets_secs: Option<u32>,
        side_mode: SideMode,
    },
}

impl ExercisePlan {
    pub fn exercise_type(&self) -> ExerciseType {
        match self.kind {
            ExerciseKind::Duration { .. } => ExerciseType::Duration,
            ExerciseKind::Reps { .. } => ExerciseType::Reps,
        }
    }

    pub fn side_mode(&self) -> SideMode {
        match self.kind {
            ExerciseKind::Duration { .. } => SideMode::Bilateral,
            ExerciseKind::Reps { side_mode, .. } => side_mode,
        }
    }
}

/// Resolve an exercise's optional parameters into a plan.
///
/// Order: session override, then the exercise's own value, then the
/// settings default (rep duration only), then the crate constant. Counts and
/// durations are clamped to at least 1; pauses and rests may be 0.
pub fn resolve(
    exercise: &Exercise,
    overrides: &ExerciseOverrides,
    settings: &TimerSettings,
) -> ExercisePlan {
    let kind = match exercise.exercise_type {
        ExerciseType::Duration => ExerciseKind::Duration {
            target_secs: overrides
                .target_duration_secs
                .or(exercise.target_duration_secs)
                .unwrap_or(DEFAULT_DURATION_SECS)
                .max(1),
        },
        ExerciseType::Reps => ExerciseKind::Reps {
            reps: overrides.reps.or(exercise.reps).unwrap_or(DEFAULT_REPS).max(1),
            sets: overrides.sets.or(exercise.sets).unwrap_or(DEFAULT_SETS).max(1),
            rep_duration_secs: overrides
                .rep_duration_secs
                .or(exercise.rep_duration_secs)
                .unwrap_or(settings.default_rep_duration_secs)
                .max(1),
            pause_between_reps_secs: overrides
                .pause_between_reps_secs
                .or(exercise.pause_between_reps_secs)
                .unwrap_or(DEFAULT_PAUSE_BETWEEN_REPS_SECS),
            rest_between_sets_secs: overrides
                .rest_between_sets_secs
                .or(exercise.rest_between_sets_secs),
            side_mode: exercise.side_mode,
        },
    };
    ExercisePlan {
        exercise_id: exercise.id.clone(),
        name: exercise.name.clone(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_beats_exercise_beats_default() {
        let exercise = Exercise::reps("ex", "Squat", 12, 2, 4);
        let overrides = ExerciseOverrides {
            reps: Some(8),
            ..ExerciseOverrides::default()
        };
        let plan = resolve(&exercise, &overrides, &TimerSettings::default());
        match plan.kind {
            ExerciseKind::Reps { reps, sets, rep_duration_secs, .. } => {
                assert_eq!(reps, 8);
                assert_eq!(sets, 2);
                assert_eq!(rep_duration_secs, 4);
            }
            other => panic!("expected reps plan, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_use_settings_then_constants() {
        let mut exercise = Exercise::reps("ex", "Bridge", 1, 1, 1);
        exercise.reps = None;
        exercise.sets = None;
        exercise.rep_duration_secs = None;
        let settings = TimerSettings {
            default_rep_duration_secs: 5,
            ..TimerSettings::default()
        };
        let plan = resolve(&exercise, &ExerciseOverrides::default(), &settings);
        assert_eq!(
            plan.kind,
            ExerciseKind::Reps {
                reps: DEFAULT_REPS,
                sets: DEFAULT_SETS,
                rep_duration_secs: 5,
                pause_between_reps_secs: 0,
                rest_between_sets_secs: None,
                side_mode: SideMode::Bilateral,
            }
        );
    }

    #[test]
    fn zero_counts_are_clamped() {
        let mut exercise = Exercise::duration("ex", "Plank", 0);
        let plan = resolve(&exercise, &ExerciseOverrides::default(), &TimerSettings::default());
        assert_eq!(plan.kind, ExerciseKind::Duration { target_secs: 1 });

        exercise.target_duration_secs = None;
        let plan = resolve(&exercise, &ExerciseOverrides::default(), &TimerSettings::default());
        assert_eq!(plan.kind, ExerciseKind::Duration { target_secs: DEFAULT_DURATION_SECS });
    }

    #[test]
    fn validate_rejects_explicit_zero_and_blank_name() {
        assert!(Exercise::reps("a", "Row", 0, 1, 1).validate().is_err());
        assert!(Exercise::duration("a", "  ", 10).validate().is_err());
        assert!(Exercise::duration("a", "Plank", 10).validate().is_ok());
    }

    #[test]
    fn parse_side_mode_and_type() {
        assert_eq!("alternating".parse::<SideMode>().unwrap(), SideMode::Alternating);
        assert_eq!("reps".parse::<ExerciseType>().unwrap(), ExerciseType::Reps);
        assert!("sideways".parse::<SideMode>().is_err());
    }
}

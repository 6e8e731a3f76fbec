use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cue::AudioCue;
use crate::timer::EngineSnapshot;

/// Every engine transition produces events.
/// The coordinator turns them into cues and store writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Emitted once at the end of every command or tick that changed anything.
    StateChanged { snapshot: EngineSnapshot },
    Cue { cue: AudioCue },
    ExerciseCompleted {
        index: usize,
        exercise_id: String,
        skipped: bool,
        actual_duration_secs: u32,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        total_elapsed_secs: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn cue(&self) -> Option<AudioCue> {
        match self {
            Event::Cue { cue } => Some(*cue),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Option<&EngineSnapshot> {
        match self {
            Event::StateChanged { snapshot } => Some(snapshot),
            _ => None,
        }
    }
}

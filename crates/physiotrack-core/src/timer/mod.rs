mod engine;
mod settings;
mod state;

pub use engine::{TimerEngine, LEAD_IN_CUE_SECS};
pub use settings::TimerSettings;
pub use state::{EngineSnapshot, ExerciseState, ResumeState, Side, SidePhase, TimerState};

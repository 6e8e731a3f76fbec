//! # PhysioTrack Core Library
//!
//! This library provides the core logic for playing back physiotherapy
//! exercise sessions. It follows a CLI-first layout: every operation is
//! available through the standalone `physiotrack` binary, which is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A tick-driven state machine. The caller invokes
//!   `tick()` once per second and gets back the events it produced
//! - **Session Coordinator**: Wires engine events to the cue player and the
//!   store, and publishes a read-only view on a `watch` channel
//! - **Storage**: SQLite exercise library and session history, TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`SessionCoordinator`]: Session lifecycle and write-through persistence
//! - [`Database`]: Exercise library and session history
//! - [`Config`]: Application configuration management
//! - [`CuePlayer`]: Trait for audio/haptic cue output

pub mod cue;
pub mod error;
pub mod events;
pub mod exercise;
pub mod session;
pub mod storage;
pub mod timer;

pub use cue::{AudioCue, CuePlayer, NullCuePlayer};
pub use error::{ConfigError, CoreError, DatabaseError, SessionError, ValidationError};
pub use events::Event;
pub use exercise::{
    Exercise, ExerciseKind, ExerciseOverrides, ExercisePlan, ExerciseType, SessionDefinition,
    SessionExercise, SideMode,
};
pub use session::{
    run_playback, Command, CompletedExercise, SessionCoordinator, SessionInstance, SessionStatus,
    SessionStore, SessionView,
};
pub use storage::{AudioConfig, Config, Database, Stats};
pub use timer::{EngineSnapshot, ExerciseState, Side, TimerEngine, TimerSettings, TimerState};

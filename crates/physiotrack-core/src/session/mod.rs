mod coordinator;
mod driver;
mod instance;
mod store;

pub use coordinator::{SessionCoordinator, SessionView};
pub use driver::{run_playback, Command, TICK};
pub use instance::{CompletedExercise, SessionInstance, SessionStatus};
pub use store::SessionStore;

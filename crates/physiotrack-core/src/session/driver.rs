//! Real-time playback loop.
//!
//! Drives a [`SessionCoordinator`] with a one-second tokio interval and
//! applies UI commands from an mpsc channel in between ticks. Everything
//! runs on the calling task; nothing here is spawned.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use super::{SessionCoordinator, SessionStore};
use crate::cue::CuePlayer;

pub const TICK: Duration = Duration::from_secs(1);

/// User commands accepted by [`run_playback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    /// Play when paused or preparing, pause otherwise.
    TogglePlay,
    Skip,
    GoTo(usize),
    ToggleAutoAdvance,
    Finish,
    Quit,
}

/// Run until the session completes, `Quit` arrives, or the sender is dropped.
///
/// An accepted command restarts the interval so the next tick lands a full
/// second later. Late ticks are delayed rather than bursted; wall-clock drift
/// is not corrected.
pub async fn run_playback<S, P>(
    mut coordinator: SessionCoordinator<S, P>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) -> SessionCoordinator<S, P>
where
    S: SessionStore,
    P: CuePlayer,
{
    let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !coordinator.is_complete() {
        tokio::select! {
            _ = ticker.tick() => {
                coordinator.tick();
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("command channel closed; stopping playback");
                    break;
                };
                if command == Command::Quit {
                    break;
                }
                if apply(&mut coordinator, command) {
                    ticker.reset();
                }
            }
        }
    }
    coordinator
}

fn apply<S: SessionStore, P: CuePlayer>(
    coordinator: &mut SessionCoordinator<S, P>,
    command: Command,
) -> bool {
    debug!(?command, "playback command");
    match command {
        Command::Play => coordinator.play(),
        Command::Pause => coordinator.pause(),
        Command::TogglePlay => coordinator.pause() || coordinator.play(),
        Command::Skip => coordinator.skip(),
        Command::GoTo(index) => coordinator.go_to_exercise(index),
        Command::ToggleAutoAdvance => coordinator.toggle_auto_advance(),
        Command::Finish => coordinator.finish(),
        Command::Quit => false,
    }
}

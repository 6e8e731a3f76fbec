//! Interactive terminal playback.
//!
//! Playback runs on a current-thread tokio runtime. A plain thread reads
//! stdin lines and forwards them as [`Command`]s; the status line is redrawn
//! from the coordinator's view channel.

use std::io::{BufRead, Write};
use std::thread;

use physiotrack_core::cue::{AudioCue, CuePlayer};
use physiotrack_core::exercise::ExerciseKind;
use physiotrack_core::session::{run_playback, Command, SessionCoordinator, SessionStore, SessionView};
use physiotrack_core::storage::{AudioConfig, Config, Database};
use physiotrack_core::timer::{Side, TimerState};
use physiotrack_core::SessionError;
use tokio::sync::{mpsc, watch};

const HELP: &str = "commands: <enter>/p play-pause  s skip  g N go to exercise N  a toggle auto-advance  f finish  q quit";

/// Writes cue labels to stderr, optionally with the terminal bell.
pub struct TerminalCuePlayer {
    audio: AudioConfig,
}

impl TerminalCuePlayer {
    pub fn new(audio: AudioConfig) -> Self {
        Self { audio }
    }

    fn emit(&mut self, cue: AudioCue) {
        if !self.audio.enabled {
            return;
        }
        let bell = if self.audio.bell { "\x07" } else { "" };
        eprint!("{bell}\r\n  >> {}\r\n", cue.label());
    }
}

impl CuePlayer for TerminalCuePlayer {
    fn countdown_tick(&mut self) {
        self.emit(AudioCue::CountdownTick);
    }
    fn duration_start(&mut self) {
        self.emit(AudioCue::DurationStart);
    }
    fn duration_end(&mut self) {
        self.emit(AudioCue::DurationEnd);
    }
    fn rep_start(&mut self) {
        self.emit(AudioCue::RepStart);
    }
    fn rep_end(&mut self) {
        self.emit(AudioCue::RepEnd);
    }
    fn rest_start(&mut self) {
        self.emit(AudioCue::RestStart);
    }
    fn rest_end(&mut self) {
        self.emit(AudioCue::RestEnd);
    }
    fn switch_sides(&mut self) {
        self.emit(AudioCue::SwitchSides);
    }
    fn session_complete(&mut self) {
        self.emit(AudioCue::SessionComplete);
    }
}

pub fn run_new(session_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let definition = db
        .get_session_definition(session_id)?
        .ok_or_else(|| SessionError::DefinitionNotFound(session_id.to_string()))?;

    let mut coordinator = SessionCoordinator::new(&db, TerminalCuePlayer::new(config.audio.clone()));
    let id = coordinator.start_session(&definition, &config.timer)?;
    eprintln!("session started: {id}");
    drive(coordinator)
}

pub fn run_resume(instance_id: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let instance = match instance_id {
        Some(id) => db
            .get_session_instance(id)?
            .ok_or_else(|| format!("session instance not found: {id}"))?,
        None => db
            .latest_in_progress()?
            .ok_or("no session in progress")?,
    };
    if instance.is_finished() {
        return Err(format!("session {} is already {}", instance.id, instance.status.as_str()).into());
    }

    let mut coordinator = SessionCoordinator::new(&db, TerminalCuePlayer::new(config.audio.clone()));
    coordinator.resume_session(instance, &config.timer)?;
    let id = coordinator.instance().map_or("", |i| i.id.as_str());
    eprintln!("session resumed: {id}");
    drive(coordinator)
}

fn drive<S: SessionStore>(
    coordinator: SessionCoordinator<S, TerminalCuePlayer>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let (tx, rx) = mpsc::unbounded_channel();
    spawn_input(tx);
    eprintln!("{HELP}");

    let view = coordinator.subscribe();
    let finished = runtime.block_on(async {
        tokio::select! {
            coordinator = run_playback(coordinator, rx) => Some(coordinator),
            () = render(view) => None,
        }
    });
    let coordinator = finished.ok_or("view channel closed unexpectedly")?;

    println!();
    if let Some(instance) = coordinator.instance() {
        println!("{}", serde_json::to_string_pretty(instance)?);
    }
    if !coordinator.is_complete() {
        eprintln!("progress saved; continue with `physiotrack resume`");
    }
    Ok(())
}

/// Read stdin on a plain thread. Dropping the sender at EOF stops playback.
fn spawn_input(tx: mpsc::UnboundedSender<Command>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if matches!(line.trim(), "h" | "?") {
                eprintln!("{HELP}");
                continue;
            }
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => eprintln!("unknown command '{}' (h for help)", line.trim()),
            }
        }
    });
}

async fn render(mut view: watch::Receiver<SessionView>) {
    loop {
        let line = format_view(&view.borrow_and_update());
        let mut out = std::io::stdout();
        let _ = write!(out, "\r\x1b[2K{line}");
        let _ = out.flush();
        if view.changed().await.is_err() {
            return;
        }
    }
}

/// Map one input line to a command. `g N` is 1-based.
fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match words.next() {
        None | Some("p") => Command::TogglePlay,
        Some("s") => Command::Skip,
        Some("a") => Command::ToggleAutoAdvance,
        Some("f") => Command::Finish,
        Some("q") => Command::Quit,
        Some("g") => {
            let n: usize = words.next()?.parse().ok()?;
            Command::GoTo(n.checked_sub(1)?)
        }
        Some(_) => return None,
    };
    if words.next().is_some() {
        return None;
    }
    Some(command)
}

fn state_label(state: TimerState) -> &'static str {
    match state {
        TimerState::Idle => "idle",
        TimerState::Paused => "paused",
        TimerState::Countdown => "get ready",
        TimerState::Active => "active",
        TimerState::Resting => "rest",
        TimerState::Preparing => "next up",
        TimerState::Completed => "done",
    }
}

fn clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn format_view(view: &SessionView) -> String {
    let snap = &view.snapshot;
    let ex = &snap.exercise_state;
    let name = view.current_exercise.as_ref().map_or("-", |p| p.name.as_str());
    let mut line = format!(
        "[{}] {}/{} {}",
        state_label(snap.timer_state),
        ex.exercise_index + 1,
        snap.exercise_count,
        name
    );

    match view.current_exercise.as_ref().map(|p| p.kind) {
        Some(ExerciseKind::Duration { target_secs }) => {
            line += &format!(" | {}s/{}s", ex.elapsed_secs, target_secs);
        }
        Some(ExerciseKind::Reps { reps, sets, .. }) => {
            line += &format!(" | set {}/{} rep {}/{}", ex.set, sets, ex.rep, reps);
            match ex.side {
                Side::Left => line += " left",
                Side::Right => line += " right",
                Side::None => {}
            }
        }
        None => {}
    }

    match snap.timer_state {
        TimerState::Countdown => line += &format!(" | starting in {}", ex.countdown_secs),
        TimerState::Resting => {
            let left = ex.rest_duration_secs.saturating_sub(ex.rest_elapsed_secs);
            line += &format!(" | rest {left}s");
        }
        TimerState::Preparing => {
            line += &format!(" | next in {}s", ex.preparing_remaining_secs);
        }
        _ => {}
    }
    if snap.awaiting_set_continuation {
        line += " | enter to continue";
    }

    line += &format!(" | total {}", clock(snap.total_elapsed_secs));
    if snap.auto_advance {
        line += " | auto";
    }
    if let Some(notice) = &view.notice {
        line += &format!(" | ! {notice}");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use physiotrack_core::exercise::{ExercisePlan, SideMode};

    #[test]
    fn parse_command_keys() {
        assert_eq!(parse_command(""), Some(Command::TogglePlay));
        assert_eq!(parse_command(" p "), Some(Command::TogglePlay));
        assert_eq!(parse_command("s"), Some(Command::Skip));
        assert_eq!(parse_command("g 3"), Some(Command::GoTo(2)));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("g 0"), None);
        assert_eq!(parse_command("g"), None);
        assert_eq!(parse_command("s now"), None);
        assert_eq!(parse_command("jump"), None);
    }

    #[test]
    fn format_view_shows_reps_progress_and_side() {
        let mut view = SessionView::default();
        view.current_exercise = Some(ExercisePlan {
            exercise_id: "lunge".into(),
            name: "Lunge".into(),
            kind: ExerciseKind::Reps {
                reps: 5,
                sets: 2,
                rep_duration_secs: 2,
                pause_between_reps_secs: 0,
                rest_between_sets_secs: None,
                side_mode: SideMode::Unilateral,
            },
        });
        view.snapshot.timer_state = TimerState::Resting;
        view.snapshot.exercise_count = 3;
        view.snapshot.total_elapsed_secs = 75;
        view.snapshot.exercise_state.side = Side::Right;
        view.snapshot.exercise_state.rest_duration_secs = 10;
        view.snapshot.exercise_state.rest_elapsed_secs = 4;
        view.notice = Some("disk full".into());

        assert_eq!(
            format_view(&view),
            "[rest] 1/3 Lunge | set 1/2 rep 1/5 right | rest 6s | total 01:15 | ! disk full"
        );
    }

    #[test]
    fn format_view_without_exercise() {
        assert_eq!(format_view(&SessionView::default()), "[idle] 1/0 - | total 00:00");
    }
}

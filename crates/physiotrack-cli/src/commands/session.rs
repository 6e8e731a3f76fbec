use clap::Subcommand;
use physiotrack_core::exercise::{ExerciseOverrides, SessionDefinition, SessionExercise};
use physiotrack_core::session::SessionStore;
use physiotrack_core::storage::Database;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Create a session definition
    Create {
        /// Session name
        name: String,
        /// Exercise entry, in order: `ID` or `ID:key=value,...`
        /// (keys: duration, reps, sets, rep_duration, pause, rest)
        #[arg(long = "exercise", short = 'e', required = true, value_parser = parse_entry)]
        exercises: Vec<SessionExercise>,
        /// Start the next set or exercise without waiting for play
        #[arg(long)]
        auto_advance: bool,
    },
    /// List session definitions as JSON
    List,
    /// Show one session definition as JSON
    Show {
        /// Session ID
        id: String,
    },
    /// Delete a session definition
    Delete {
        /// Session ID
        id: String,
    },
}

/// Parse `ID` or `ID:key=value,key=value` into a session entry.
fn parse_entry(raw: &str) -> Result<SessionExercise, String> {
    let (id, spec) = match raw.split_once(':') {
        Some((id, spec)) => (id, Some(spec)),
        None => (raw, None),
    };
    if id.is_empty() {
        return Err("exercise ID is empty".into());
    }

    let mut overrides = ExerciseOverrides::default();
    for pair in spec.into_iter().flat_map(|s| s.split(',')).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
        let value: u32 = value
            .parse()
            .map_err(|_| format!("'{value}' is not a whole number of seconds or count"))?;
        let slot = match key {
            "duration" => &mut overrides.target_duration_secs,
            "reps" => &mut overrides.reps,
            "sets" => &mut overrides.sets,
            "rep_duration" => &mut overrides.rep_duration_secs,
            "pause" => &mut overrides.pause_between_reps_secs,
            "rest" => &mut overrides.rest_between_sets_secs,
            other => return Err(format!("unknown override '{other}'")),
        };
        *slot = Some(value);
    }

    Ok(SessionExercise {
        exercise_id: id.to_string(),
        overrides,
    })
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        SessionAction::Create {
            name,
            exercises,
            auto_advance,
        } => {
            let definition = SessionDefinition {
                id: String::new(),
                name,
                exercises,
                auto_advance,
            };
            let id = db.add_session_definition(&definition)?;
            println!("session created: {id}");
        }
        SessionAction::List => {
            let sessions = db.list_session_definitions()?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        SessionAction::Show { id } => {
            let definition = db
                .get_session_definition(&id)?
                .ok_or_else(|| format!("session not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&definition)?);
        }
        SessionAction::Delete { id } => {
            if !db.delete_session_definition(&id)? {
                return Err(format!("session not found: {id}").into());
            }
            println!("session deleted: {id}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_entry_plain_id() {
        let entry = parse_entry("plank").unwrap();
        assert_eq!(entry.exercise_id, "plank");
        assert_eq!(entry.overrides, ExerciseOverrides::default());
    }

    #[test]
    fn parse_entry_with_overrides() {
        let entry = parse_entry("squat:reps=8,rest=0,rep_duration=4").unwrap();
        assert_eq!(entry.exercise_id, "squat");
        assert_eq!(entry.overrides.reps, Some(8));
        assert_eq!(entry.overrides.rest_between_sets_secs, Some(0));
        assert_eq!(entry.overrides.rep_duration_secs, Some(4));
        assert_eq!(entry.overrides.sets, None);
    }

    #[test]
    fn parse_entry_rejects_bad_input() {
        assert!(parse_entry("").is_err());
        assert!(parse_entry(":reps=2").is_err());
        assert!(parse_entry("squat:reps").is_err());
        assert!(parse_entry("squat:speed=2").is_err());
        assert!(parse_entry("squat:reps=-1").is_err());
    }
}

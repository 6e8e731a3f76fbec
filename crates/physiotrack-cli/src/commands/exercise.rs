use clap::Subcommand;
use physiotrack_core::exercise::{Exercise, ExerciseType, SideMode};
use physiotrack_core::storage::Database;

#[derive(Subcommand)]
pub enum ExerciseAction {
    /// Add an exercise to the library
    Add {
        /// Exercise name
        name: String,
        /// "duration" or "reps"
        #[arg(long = "type", default_value = "reps")]
        exercise_type: ExerciseType,
        #[arg(long, default_value = "")]
        description: String,
        /// Target hold in seconds (duration exercises)
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long)]
        reps: Option<u32>,
        #[arg(long)]
        sets: Option<u32>,
        /// Seconds per rep
        #[arg(long)]
        rep_duration: Option<u32>,
        /// Pause between reps in seconds
        #[arg(long)]
        pause: Option<u32>,
        /// Rest between sets in seconds (defaults to the configured value)
        #[arg(long)]
        rest: Option<u32>,
        /// "bilateral", "unilateral" or "alternating"
        #[arg(long, default_value = "bilateral")]
        side_mode: SideMode,
    },
    /// List library exercises as JSON
    List,
    /// Show one exercise as JSON
    Show {
        /// Exercise ID
        id: String,
    },
    /// Remove an exercise from the library
    Delete {
        /// Exercise ID
        id: String,
    },
}

pub fn run(action: ExerciseAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        ExerciseAction::Add {
            name,
            exercise_type,
            description,
            duration,
            reps,
            sets,
            rep_duration,
            pause,
            rest,
            side_mode,
        } => {
            let is_duration = exercise_type == ExerciseType::Duration;
            let exercise = Exercise {
                id: String::new(),
                name,
                description,
                exercise_type,
                target_duration_secs: duration,
                reps: reps.filter(|_| !is_duration),
                sets: sets.filter(|_| !is_duration),
                rep_duration_secs: rep_duration.filter(|_| !is_duration),
                pause_between_reps_secs: pause.filter(|_| !is_duration),
                rest_between_sets_secs: rest.filter(|_| !is_duration),
                side_mode: if is_duration { SideMode::Bilateral } else { side_mode },
            };
            let id = db.add_exercise(&exercise)?;
            println!("exercise created: {id}");
        }
        ExerciseAction::List => {
            let exercises = db.list_exercises()?;
            println!("{}", serde_json::to_string_pretty(&exercises)?);
        }
        ExerciseAction::Show { id } => {
            let exercise = db
                .get_exercise(&id)?
                .ok_or_else(|| format!("exercise not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&exercise)?);
        }
        ExerciseAction::Delete { id } => {
            if !db.delete_exercise(&id)? {
                return Err(format!("exercise not found: {id}").into());
            }
            println!("exercise deleted: {id}");
        }
    }
    Ok(())
}

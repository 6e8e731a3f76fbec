use clap::Subcommand;
use physiotrack_core::storage::Database;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List past session instances as JSON, newest first
    List {
        /// Maximum number of instances
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Show one session instance as JSON
    Show {
        /// Instance ID
        id: String,
    },
    /// Mark a completed session as logged
    Log {
        /// Instance ID
        id: String,
    },
    /// Aggregate statistics as JSON
    Stats,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        HistoryAction::List { limit } => {
            let instances = db.list_session_instances(limit)?;
            println!("{}", serde_json::to_string_pretty(&instances)?);
        }
        HistoryAction::Show { id } => {
            let instance = db
                .get_session_instance(&id)?
                .ok_or_else(|| format!("session instance not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&instance)?);
        }
        HistoryAction::Log { id } => {
            db.mark_logged(&id)?;
            println!("session logged: {id}");
        }
        HistoryAction::Stats => {
            let stats = db.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

//! SQLite-based exercise library, session definitions and session history.
//!
//! Provides persistent storage for:
//! - The exercise library
//! - Session definitions (ordered exercise lists with overrides)
//! - Session instances (one per attempt, with per-exercise records)
//! - History statistics

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, Result, SessionError, ValidationError};
use crate::exercise::{Exercise, ExerciseType, SessionDefinition, SessionExercise, SideMode};
use crate::session::{CompletedExercise, SessionInstance, SessionStatus, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub in_progress_sessions: u64,
    pub exercises_completed: u64,
    pub exercises_skipped: u64,
    pub total_elapsed_secs: u64,
    pub today_sessions: u64,
}

/// SQLite database backing the exercise library and session history.
pub struct Database {
    conn: Connection,
}

fn corrupt(table: &str, message: impl ToString) -> CoreError {
    DatabaseError::Corrupt {
        table: table.to_string(),
        message: message.to_string(),
    }
    .into()
}

fn parse_time(table: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| corrupt(table, e))
    })
    .transpose()
}

struct ExerciseRow {
    id: String,
    name: String,
    description: String,
    exercise_type: String,
    target_duration_secs: Option<u32>,
    reps: Option<u32>,
    sets: Option<u32>,
    rep_duration_secs: Option<u32>,
    pause_between_reps_secs: Option<u32>,
    rest_between_sets_secs: Option<u32>,
    side_mode: String,
}

impl ExerciseRow {
    const COLUMNS: &'static str = "id, name, description, exercise_type, target_duration_secs, reps, sets,
         rep_duration_secs, pause_between_reps_secs, rest_between_sets_secs, side_mode";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            exercise_type: row.get(3)?,
            target_duration_secs: row.get(4)?,
            reps: row.get(5)?,
            sets: row.get(6)?,
            rep_duration_secs: row.get(7)?,
            pause_between_reps_secs: row.get(8)?,
            rest_between_sets_secs: row.get(9)?,
            side_mode: row.get(10)?,
        })
    }

    fn into_exercise(self) -> Result<Exercise> {
        let exercise_type: ExerciseType = self
            .exercise_type
            .parse()
            .map_err(|e| corrupt("exercises", e))?;
        let side_mode: SideMode = self.side_mode.parse().map_err(|e| corrupt("exercises", e))?;
        Ok(Exercise {
            id: self.id,
            name: self.name,
            description: self.description,
            exercise_type,
            target_duration_secs: self.target_duration_secs,
            reps: self.reps,
            sets: self.sets,
            rep_duration_secs: self.rep_duration_secs,
            pause_between_reps_secs: self.pause_between_reps_secs,
            rest_between_sets_secs: self.rest_between_sets_secs,
            side_mode,
        })
    }
}

struct DefinitionRow {
    id: String,
    name: String,
    exercises: String,
    auto_advance: bool,
}

impl DefinitionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            exercises: row.get(2)?,
            auto_advance: row.get(3)?,
        })
    }

    fn into_definition(self) -> Result<SessionDefinition> {
        let exercises: Vec<SessionExercise> = serde_json::from_str(&self.exercises)
            .map_err(|e| corrupt("session_definitions", e))?;
        Ok(SessionDefinition {
            id: self.id,
            name: self.name,
            exercises,
            auto_advance: self.auto_advance,
        })
    }
}

struct InstanceRow {
    id: String,
    session_id: String,
    session_name: String,
    date: String,
    status: String,
    started_at: Option<String>,
    ended_at: Option<String>,
    elapsed_secs: i64,
    exercises: String,
}

impl InstanceRow {
    const COLUMNS: &'static str =
        "id, session_id, session_name, date, status, started_at, ended_at, elapsed_secs, exercises";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            session_id: row.get(1)?,
            session_name: row.get(2)?,
            date: row.get(3)?,
            status: row.get(4)?,
            started_at: row.get(5)?,
            ended_at: row.get(6)?,
            elapsed_secs: row.get(7)?,
            exercises: row.get(8)?,
        })
    }

    fn into_instance(self) -> Result<SessionInstance> {
        const TABLE: &str = "session_instances";
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|e| corrupt(TABLE, e))?;
        let status = SessionStatus::parse(&self.status)
            .ok_or_else(|| corrupt(TABLE, format!("unknown status '{}'", self.status)))?;
        let exercises: Vec<CompletedExercise> =
            serde_json::from_str(&self.exercises).map_err(|e| corrupt(TABLE, e))?;
        Ok(SessionInstance {
            id: self.id,
            session_id: self.session_id,
            session_name: self.session_name,
            date,
            status,
            started_at: parse_time(TABLE, self.started_at)?,
            ended_at: parse_time(TABLE, self.ended_at)?,
            elapsed_secs: u64::try_from(self.elapsed_secs).unwrap_or(0),
            exercises,
        })
    }
}

impl Database {
    /// Open the database at `~/.config/physiotrack/physiotrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("physiotrack.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        migrations::migrate(&self.conn)
            .map_err(|e| CoreError::from(DatabaseError::MigrationFailed(e.to_string())))
    }

    // ── Exercises ──────────────────────────────────────────────────────

    /// Insert an exercise. An empty id is replaced with a fresh UUID.
    ///
    /// # Errors
    /// Returns an error if the exercise fails validation or the insert fails.
    pub fn add_exercise(&self, exercise: &Exercise) -> Result<String> {
        exercise.validate()?;
        let id = if exercise.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            exercise.id.clone()
        };
        self.conn.execute(
            "INSERT INTO exercises (id, name, description, exercise_type, target_duration_secs,
                 reps, sets, rep_duration_secs, pause_between_reps_secs, rest_between_sets_secs,
                 side_mode, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id,
                exercise.name,
                exercise.description,
                exercise_type_str(exercise.exercise_type),
                exercise.target_duration_secs,
                exercise.reps,
                exercise.sets,
                exercise.rep_duration_secs,
                exercise.pause_between_reps_secs,
                exercise.rest_between_sets_secs,
                side_mode_str(exercise.side_mode),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    pub fn get_exercise(&self, id: &str) -> Result<Option<Exercise>> {
        let sql = format!("SELECT {} FROM exercises WHERE id = ?1", ExerciseRow::COLUMNS);
        self.conn
            .query_row(&sql, [id], ExerciseRow::from_row)
            .optional()?
            .map(ExerciseRow::into_exercise)
            .transpose()
    }

    /// All library exercises, ordered by name.
    pub fn list_exercises(&self) -> Result<Vec<Exercise>> {
        let sql = format!(
            "SELECT {} FROM exercises ORDER BY name COLLATE NOCASE, id",
            ExerciseRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], ExerciseRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ExerciseRow::into_exercise).collect()
    }

    /// Delete an exercise. Returns `false` if it did not exist.
    ///
    /// Session definitions that still reference it fail to start until the
    /// entry is removed.
    pub fn delete_exercise(&self, id: &str) -> Result<bool> {
        let n = self.conn.execute("DELETE FROM exercises WHERE id = ?1", [id])?;
        Ok(n > 0)
    }

    // ── Session definitions ────────────────────────────────────────────

    /// Insert a session definition. An empty id is replaced with a fresh UUID.
    ///
    /// # Errors
    /// Returns an error if the name is blank, an entry references an
    /// exercise that is not in the library, or the insert fails.
    pub fn add_session_definition(&self, definition: &SessionDefinition) -> Result<String> {
        if definition.name.trim().is_empty() {
            return Err(ValidationError::Empty("name".into()).into());
        }
        for entry in &definition.exercises {
            if self.get_exercise(&entry.exercise_id)?.is_none() {
                return Err(SessionError::ExerciseNotFound(entry.exercise_id.clone()).into());
            }
        }
        let id = if definition.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            definition.id.clone()
        };
        self.conn.execute(
            "INSERT INTO session_definitions (id, name, exercises, auto_advance, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                definition.name,
                serde_json::to_string(&definition.exercises)?,
                definition.auto_advance,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    pub fn list_session_definitions(&self) -> Result<Vec<SessionDefinition>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, exercises, auto_advance FROM session_definitions
             ORDER BY name COLLATE NOCASE, id",
        )?;
        let rows = stmt
            .query_map([], DefinitionRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(DefinitionRow::into_definition).collect()
    }

    pub fn delete_session_definition(&self, id: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM session_definitions WHERE id = ?1", [id])?;
        Ok(n > 0)
    }

    // ── Session instances ──────────────────────────────────────────────

    pub fn get_session_instance(&self, id: &str) -> Result<Option<SessionInstance>> {
        let sql = format!(
            "SELECT {} FROM session_instances WHERE id = ?1",
            InstanceRow::COLUMNS
        );
        self.conn
            .query_row(&sql, [id], InstanceRow::from_row)
            .optional()?
            .map(InstanceRow::into_instance)
            .transpose()
    }

    /// Instances, newest first. `limit` of `None` returns all of them.
    pub fn list_session_instances(&self, limit: Option<usize>) -> Result<Vec<SessionInstance>> {
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let sql = format!(
            "SELECT {} FROM session_instances
             ORDER BY date DESC, started_at DESC, id
             LIMIT ?1",
            InstanceRow::COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([limit], InstanceRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(InstanceRow::into_instance).collect()
    }

    /// The newest in-progress instance, if any.
    pub fn latest_in_progress(&self) -> Result<Option<SessionInstance>> {
        let sql = format!(
            "SELECT {} FROM session_instances
             WHERE status = ?1
             ORDER BY date DESC, started_at DESC
             LIMIT 1",
            InstanceRow::COLUMNS
        );
        self.conn
            .query_row(&sql, [SessionStatus::InProgress.as_str()], InstanceRow::from_row)
            .optional()?
            .map(InstanceRow::into_instance)
            .transpose()
    }

    /// Move a completed instance to `logged`.
    ///
    /// Already-logged instances are left as they are.
    ///
    /// # Errors
    /// Returns an error if the instance does not exist or has not completed.
    pub fn mark_logged(&self, id: &str) -> Result<()> {
        let instance = self
            .get_session_instance(id)?
            .ok_or_else(|| DatabaseError::MissingRow {
                table: "session_instances".into(),
                id: id.into(),
            })?;
        match instance.status {
            SessionStatus::Logged => Ok(()),
            SessionStatus::Completed => {
                self.conn.execute(
                    "UPDATE session_instances SET status = ?1 WHERE id = ?2",
                    params![SessionStatus::Logged.as_str(), id],
                )?;
                info!(instance = id, "session marked logged");
                Ok(())
            }
            other => Err(ValidationError::InvalidValue {
                field: "status".into(),
                message: format!("only completed sessions can be logged (is {})", other.as_str()),
            }
            .into()),
        }
    }

    /// Aggregate history statistics.
    pub fn stats(&self) -> Result<Stats> {
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let mut stats = Stats::default();
        for instance in self.list_session_instances(None)? {
            stats.total_sessions += 1;
            match instance.status {
                SessionStatus::Completed | SessionStatus::Logged => stats.completed_sessions += 1,
                SessionStatus::InProgress => stats.in_progress_sessions += 1,
                SessionStatus::Planned => {}
            }
            if instance.date.format("%Y-%m-%d").to_string() == today {
                stats.today_sessions += 1;
            }
            stats.total_elapsed_secs += instance.elapsed_secs;
            for record in &instance.exercises {
                if record.completed {
                    stats.exercises_completed += 1;
                } else if record.skipped {
                    stats.exercises_skipped += 1;
                }
            }
        }
        Ok(stats)
    }

    fn write_instance_params(instance: &SessionInstance) -> Result<(String, String)> {
        Ok((
            instance.date.format("%Y-%m-%d").to_string(),
            serde_json::to_string(&instance.exercises)?,
        ))
    }
}

fn exercise_type_str(t: ExerciseType) -> &'static str {
    match t {
        ExerciseType::Duration => "duration",
        ExerciseType::Reps => "reps",
    }
}

fn side_mode_str(m: SideMode) -> &'static str {
    match m {
        SideMode::Bilateral => "bilateral",
        SideMode::Unilateral => "unilateral",
        SideMode::Alternating => "alternating",
    }
}

impl SessionStore for Database {
    fn get_exercises(&self) -> Result<Vec<Exercise>> {
        self.list_exercises()
    }

    fn get_session_definition(&self, id: &str) -> Result<Option<SessionDefinition>> {
        self.conn
            .query_row(
                "SELECT id, name, exercises, auto_advance FROM session_definitions WHERE id = ?1",
                [id],
                DefinitionRow::from_row,
            )
            .optional()?
            .map(DefinitionRow::into_definition)
            .transpose()
    }

    fn add_session_instance(&self, instance: &SessionInstance) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let (date, exercises) = Self::write_instance_params(instance)?;
        self.conn.execute(
            "INSERT INTO session_instances
                 (id, session_id, session_name, date, status, started_at, ended_at, elapsed_secs, exercises)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                instance.session_id,
                instance.session_name,
                date,
                instance.status.as_str(),
                instance.started_at.map(|t| t.to_rfc3339()),
                instance.ended_at.map(|t| t.to_rfc3339()),
                i64::try_from(instance.elapsed_secs).unwrap_or(i64::MAX),
                exercises,
            ],
        )?;
        Ok(id)
    }

    fn update_session_instance(&self, instance: &SessionInstance) -> Result<()> {
        let (date, exercises) = Self::write_instance_params(instance)?;
        let n = self.conn.execute(
            "UPDATE session_instances
             SET session_name = ?2, date = ?3, status = ?4, started_at = ?5, ended_at = ?6,
                 elapsed_secs = ?7, exercises = ?8
             WHERE id = ?1",
            params![
                instance.id,
                instance.session_name,
                date,
                instance.status.as_str(),
                instance.started_at.map(|t| t.to_rfc3339()),
                instance.ended_at.map(|t| t.to_rfc3339()),
                i64::try_from(instance.elapsed_secs).unwrap_or(i64::MAX),
                exercises,
            ],
        )?;
        if n == 0 {
            return Err(DatabaseError::MissingRow {
                table: "session_instances".into(),
                id: instance.id.clone(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::{resolve, ExerciseOverrides};
    use crate::timer::TimerSettings;

    fn seed(db: &Database) -> SessionDefinition {
        db.add_exercise(&Exercise::duration("plank", "Plank", 30)).unwrap();
        db.add_exercise(
            &Exercise::reps("squat", "Squat", 10, 3, 2).with_side_mode(SideMode::Unilateral),
        )
        .unwrap();
        let definition = SessionDefinition {
            id: "knee".into(),
            name: "Knee rehab".into(),
            exercises: vec![SessionExercise::new("plank"), SessionExercise::new("squat")],
            auto_advance: true,
        };
        db.add_session_definition(&definition).unwrap();
        definition
    }

    fn started(db: &Database, definition: &SessionDefinition) -> SessionInstance {
        let settings = TimerSettings::default();
        let plans: Vec<_> = definition
            .exercises
            .iter()
            .map(|entry| {
                let exercise = db.get_exercise(&entry.exercise_id).unwrap().unwrap();
                resolve(&exercise, &ExerciseOverrides::default(), &settings)
            })
            .collect();
        let mut instance = SessionInstance::start(definition, &plans, Utc::now());
        instance.id = db.add_session_instance(&instance).unwrap();
        instance
    }

    #[test]
    fn exercise_crud() {
        let db = Database::open_memory().unwrap();
        let id = db
            .add_exercise(&Exercise::reps("", "Bridge", 12, 2, 3).with_rest_between_sets(15))
            .unwrap();
        assert!(!id.is_empty());

        let loaded = db.get_exercise(&id).unwrap().unwrap();
        assert_eq!(loaded.name, "Bridge");
        assert_eq!(loaded.reps, Some(12));
        assert_eq!(loaded.rest_between_sets_secs, Some(15));
        assert_eq!(loaded.target_duration_secs, None);

        assert_eq!(db.list_exercises().unwrap().len(), 1);
        assert!(db.delete_exercise(&id).unwrap());
        assert!(!db.delete_exercise(&id).unwrap());
        assert!(db.get_exercise(&id).unwrap().is_none());
    }

    #[test]
    fn add_exercise_rejects_invalid() {
        let db = Database::open_memory().unwrap();
        let err = db.add_exercise(&Exercise::duration("x", "", 10)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn definition_roundtrip_and_missing_exercise() {
        let db = Database::open_memory().unwrap();
        let definition = seed(&db);
        let loaded = db.get_session_definition("knee").unwrap().unwrap();
        assert_eq!(loaded, definition);
        assert_eq!(db.list_session_definitions().unwrap().len(), 1);
        assert!(db.get_session_definition("nope").unwrap().is_none());

        let bad = SessionDefinition {
            id: String::new(),
            name: "Broken".into(),
            exercises: vec![SessionExercise::new("ghost")],
            auto_advance: false,
        };
        let err = db.add_session_definition(&bad).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Session(SessionError::ExerciseNotFound(ref id)) if id == "ghost"
        ));
    }

    #[test]
    fn instance_insert_update_and_get() {
        let db = Database::open_memory().unwrap();
        let definition = seed(&db);
        let mut instance = started(&db, &definition);

        let loaded = db.get_session_instance(&instance.id).unwrap().unwrap();
        assert_eq!(loaded, instance);

        instance.mark_exercise(0, false, 31, Utc::now());
        instance.elapsed_secs = 34;
        db.update_session_instance(&instance).unwrap();

        let loaded = db.get_session_instance(&instance.id).unwrap().unwrap();
        assert!(loaded.exercises[0].completed);
        assert_eq!(loaded.exercises[0].actual_duration_secs, Some(31));
        assert_eq!(loaded.elapsed_secs, 34);
        assert_eq!(loaded.resume_index(), Some(1));
        assert_eq!(
            db.latest_in_progress().unwrap().map(|i| i.id),
            Some(instance.id.clone())
        );
    }

    #[test]
    fn update_of_unknown_instance_fails() {
        let db = Database::open_memory().unwrap();
        let definition = seed(&db);
        let mut instance = started(&db, &definition);
        instance.id = "missing".into();
        let err = db.update_session_instance(&instance).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Database(DatabaseError::MissingRow { .. })
        ));
    }

    #[test]
    fn mark_logged_requires_completion() {
        let db = Database::open_memory().unwrap();
        let definition = seed(&db);
        let mut instance = started(&db, &definition);

        assert!(db.mark_logged(&instance.id).is_err());

        instance.status = SessionStatus::Completed;
        instance.ended_at = Some(Utc::now());
        db.update_session_instance(&instance).unwrap();
        db.mark_logged(&instance.id).unwrap();
        db.mark_logged(&instance.id).unwrap();

        let loaded = db.get_session_instance(&instance.id).unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Logged);
        assert!(db.mark_logged("nope").is_err());
    }

    #[test]
    fn stats_count_sessions_and_records() {
        let db = Database::open_memory().unwrap();
        let definition = seed(&db);

        let mut done = started(&db, &definition);
        done.mark_exercise(0, false, 30, Utc::now());
        done.mark_exercise(1, true, 3, Utc::now());
        done.status = SessionStatus::Completed;
        done.elapsed_secs = 40;
        db.update_session_instance(&done).unwrap();

        let mut open = started(&db, &definition);
        open.elapsed_secs = 5;
        db.update_session_instance(&open).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.in_progress_sessions, 1);
        assert_eq!(stats.exercises_completed, 1);
        assert_eq!(stats.exercises_skipped, 1);
        assert_eq!(stats.total_elapsed_secs, 45);
        assert_eq!(stats.today_sessions, 2);
        assert_eq!(db.list_session_instances(Some(1)).unwrap().len(), 1);
    }
}

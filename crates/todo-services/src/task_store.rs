//! SQLite-based task storage implementation.
//!
//! This module provides `SqliteTaskStore`, a local SQLite implementation of
//! the `TaskBackend` trait. Locations and weather readings are flattened into
//! columns; timestamps are stored as RFC 3339 text with microsecond precision.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use todo_core::{DatabaseError, RusqliteErrorExt};
use todo_weather::{Location, Weather};
use uuid::Uuid;

use crate::task::{Task, TaskStatus};
use crate::task_backend::{
    validate_content, validate_location, TaskBackend, TaskBackendError, TaskBackendResult,
};

const TASK_COLUMNS: &str = "id, content, location_lat, location_lon, location_label, \
     weather_main, weather_temperature, created_at, marked_as_done_at";

/// SQLite-based task storage.
pub struct SqliteTaskStore {
    conn: Connection,
}

impl SqliteTaskStore {
    /// Open (or create) a task store at the given path.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_database_error)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory task store.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_database_error)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY NOT NULL,
                    content TEXT NOT NULL,
                    location_lat REAL NOT NULL,
                    location_lon REAL NOT NULL,
                    location_label TEXT NOT NULL,
                    weather_main TEXT NULL,
                    weather_temperature REAL NULL,
                    created_at TEXT NOT NULL,
                    marked_as_done_at TEXT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_done_at ON tasks(marked_as_done_at);
                "#,
            )
            .map_err(RusqliteErrorExt::into_database_error)
    }

    /// Convert a database row to a Task.
    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let weather_main: Option<String> = row.get(5)?;
        let weather_temperature: Option<f64> = row.get(6)?;
        let created_at: String = row.get(7)?;
        let marked_as_done_at: Option<String> = row.get(8)?;

        let weather = match (weather_main, weather_temperature) {
            (Some(main), Some(temperature)) => Some(Weather::new(main, temperature)),
            _ => None,
        };

        Ok(Task {
            id: row.get(0)?,
            content: row.get(1)?,
            location: Location::new(row.get(2)?, row.get(3)?, row.get::<_, String>(4)?),
            weather,
            created_at: parse_timestamp(7, &created_at)?,
            marked_as_done_at: marked_as_done_at
                .map(|s| parse_timestamp(8, &s))
                .transpose()?,
        })
    }

    fn query_tasks(&self, sql: &str) -> TaskBackendResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(sql).map_err(storage)?;
        let rows = stmt.query_map([], Self::row_to_task).map_err(storage)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(storage)
    }

    /// Get the task count.
    pub fn count(&self) -> TaskBackendResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .map_err(storage)?;
        Ok(count as usize)
    }
}

fn storage(e: rusqlite::Error) -> TaskBackendError {
    TaskBackendError::Storage(e.into_database_error())
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

impl TaskBackend for SqliteTaskStore {
    fn all(&self) -> TaskBackendResult<Vec<Task>> {
        self.query_tasks(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY rowid ASC"
        ))
    }

    fn filter(&self, status: TaskStatus) -> TaskBackendResult<Vec<Task>> {
        let sql = match status {
            TaskStatus::Active => format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE marked_as_done_at IS NULL
                 ORDER BY created_at DESC, rowid DESC"
            ),
            TaskStatus::Finished => format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE marked_as_done_at IS NOT NULL
                 ORDER BY marked_as_done_at DESC, rowid DESC"
            ),
        };
        self.query_tasks(&sql)
    }

    fn get(&self, id: &str) -> TaskBackendResult<Option<Task>> {
        self.conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                Self::row_to_task,
            )
            .optional()
            .map_err(storage)
    }

    fn create(
        &self,
        content: &str,
        location: &Location,
        weather: Option<&Weather>,
    ) -> TaskBackendResult<Task> {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            location: location.clone(),
            weather: weather.cloned(),
            created_at: Utc::now().trunc_subsecs(6),
            marked_as_done_at: None,
        };

        self.save(&task)?;
        tracing::debug!(task_id = %task.id, "Created task");
        Ok(task)
    }

    fn save(&self, task: &Task) -> TaskBackendResult<()> {
        validate_content(&task.content)?;
        validate_location(&task.location)?;

        self.conn
            .execute(
                "INSERT INTO tasks (id, content, location_lat, location_lon, location_label,
                                    weather_main, weather_temperature, created_at, marked_as_done_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    content = excluded.content,
                    location_lat = excluded.location_lat,
                    location_lon = excluded.location_lon,
                    location_label = excluded.location_label,
                    weather_main = excluded.weather_main,
                    weather_temperature = excluded.weather_temperature,
                    marked_as_done_at = excluded.marked_as_done_at",
                params![
                    task.id,
                    task.content,
                    task.location.lat,
                    task.location.lon,
                    task.location.label,
                    task.weather.as_ref().map(|w| w.main.as_str()),
                    task.weather.as_ref().map(|w| w.temperature),
                    format_timestamp(&task.created_at),
                    task.marked_as_done_at.as_ref().map(format_timestamp),
                ],
            )
            .map_err(storage)?;

        Ok(())
    }

    fn update_weather(&self, id: &str, weather: &Weather) -> TaskBackendResult<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE tasks SET weather_main = ?1, weather_temperature = ?2 WHERE id = ?3",
                params![weather.main, weather.temperature, id],
            )
            .map_err(storage)?;

        if rows == 0 {
            return Err(TaskBackendError::not_found(id));
        }
        Ok(())
    }
}

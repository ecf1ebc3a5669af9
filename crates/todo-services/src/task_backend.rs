//! Task storage backend trait and error types.
//!
//! `TaskBackend` is the document-store interface the rest of the crate is
//! written against. `SqliteTaskStore` is the production implementation;
//! `TaskClient` wraps any backend for async, thread-safe access.

use chrono::{DateTime, Utc};
use thiserror::Error;
use todo_core::{AppError, DatabaseError};
use todo_weather::{Location, Weather};

use crate::task::{Task, TaskStatus};

/// Errors that can occur during task backend operations.
#[derive(Debug, Error)]
pub enum TaskBackendError {
    /// Task was not found.
    #[error("Task not found: {0}")]
    NotFound(String),

    /// A submitted field was rejected.
    #[error("Validation error on {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskBackendError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<TaskBackendError> for AppError {
    fn from(err: TaskBackendError) -> Self {
        match err {
            TaskBackendError::Storage(e) => AppError::Database(e),
            TaskBackendError::Other(e) => AppError::Other(e),
            other => AppError::Other(anyhow::anyhow!(other)),
        }
    }
}

/// Result type for task backend operations.
pub type TaskBackendResult<T> = Result<T, TaskBackendError>;

/// Trait for task storage backends.
///
/// Implementations don't need to be Sync; `TaskClient` serializes access.
pub trait TaskBackend: Send {
    /// All tasks, in insertion order.
    fn all(&self) -> TaskBackendResult<Vec<Task>>;

    /// Tasks with the given status.
    ///
    /// Active tasks are ordered newest first, finished tasks by most recent
    /// `marked_as_done_at` first.
    fn filter(&self, status: TaskStatus) -> TaskBackendResult<Vec<Task>>;

    /// Get a task by ID. Returns `None` for unknown or malformed IDs.
    fn get(&self, id: &str) -> TaskBackendResult<Option<Task>>;

    /// Create a task. The backend assigns the ID and `created_at`.
    ///
    /// # Errors
    /// Returns `TaskBackendError::Validation` if content is empty or too long.
    fn create(
        &self,
        content: &str,
        location: &Location,
        weather: Option<&Weather>,
    ) -> TaskBackendResult<Task>;

    /// Upsert a task by ID. A stored `created_at` is never overwritten.
    ///
    /// # Errors
    /// Returns `TaskBackendError::Validation` if content or the location label is invalid.
    fn save(&self, task: &Task) -> TaskBackendResult<()>;

    /// Replace the weather of a task, leaving every other field as stored.
    ///
    /// # Errors
    /// Returns `TaskBackendError::NotFound` if the task doesn't exist.
    fn update_weather(&self, id: &str, weather: &Weather) -> TaskBackendResult<()> {
        let mut task = self.get(id)?.ok_or_else(|| TaskBackendError::not_found(id))?;
        task.weather = Some(weather.clone());
        self.save(&task)
    }

    /// Mark a task as finished at `at`.
    ///
    /// # Errors
    /// Returns `TaskBackendError::NotFound` if the task doesn't exist.
    fn mark_finished(&self, id: &str, at: DateTime<Utc>) -> TaskBackendResult<Task> {
        let mut task = self.get(id)?.ok_or_else(|| TaskBackendError::not_found(id))?;
        task.marked_as_done_at = Some(at);
        self.save(&task)?;
        Ok(task)
    }

    /// Mark a task as active again.
    ///
    /// # Errors
    /// Returns `TaskBackendError::NotFound` if the task doesn't exist.
    fn mark_active(&self, id: &str) -> TaskBackendResult<Task> {
        let mut task = self.get(id)?.ok_or_else(|| TaskBackendError::not_found(id))?;
        task.marked_as_done_at = None;
        self.save(&task)?;
        Ok(task)
    }
}

/// Maximum content length for tasks (matches the form field).
pub const MAX_CONTENT_LENGTH: usize = 200;

/// Validate task content.
///
/// # Errors
/// Returns `TaskBackendError::Validation` if:
/// - Content is empty or whitespace-only.
/// - Content exceeds `MAX_CONTENT_LENGTH` characters.
pub fn validate_content(content: &str) -> TaskBackendResult<()> {
    if content.trim().is_empty() {
        return Err(TaskBackendError::validation(
            "content",
            "This field is required.",
        ));
    }

    let length = content.chars().count();
    if length > MAX_CONTENT_LENGTH {
        return Err(TaskBackendError::validation(
            "content",
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                MAX_CONTENT_LENGTH, length
            ),
        ));
    }

    Ok(())
}

/// Validate a location before it is stored.
///
/// # Errors
/// Returns `TaskBackendError::Validation` if the label is empty or a
/// coordinate is not finite.
pub fn validate_location(location: &Location) -> TaskBackendResult<()> {
    if location.label.is_empty() {
        return Err(TaskBackendError::validation(
            "location",
            "Location label cannot be empty",
        ));
    }

    if !location.lat.is_finite() || !location.lon.is_finite() {
        return Err(TaskBackendError::validation(
            "location",
            "Coordinates must be finite numbers",
        ));
    }

    Ok(())
}

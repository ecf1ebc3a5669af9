//! Async task client over any `TaskBackend`.
//!
//! Backends are synchronous; `TaskClient` serializes access behind a mutex
//! and runs every call on the blocking pool so callers never stall the
//! runtime. It also carries the page-level flows (list, create, edit and
//! status changes) on top of the repository operations.

use std::fmt;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use parking_lot::Mutex;
use todo_weather::{Location, Weather};

use crate::task::{Task, TaskForm, TaskLists, TaskStatus};
use crate::task_backend::{TaskBackend, TaskBackendError, TaskBackendResult};
use crate::task_store::SqliteTaskStore;

#[derive(Clone)]
pub struct TaskClient {
    backend: Arc<Mutex<dyn TaskBackend>>,
}

impl TaskClient {
    pub fn new<B: TaskBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
        }
    }

    /// Create a client over a SQLite store.
    pub fn sqlite(store: SqliteTaskStore) -> Self {
        Self::new(store)
    }

    async fn with_backend<T, F>(&self, op: F) -> TaskBackendResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TaskBackend) -> TaskBackendResult<T> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || {
            let guard = backend.lock();
            op(&*guard)
        })
        .await
        .map_err(|e| TaskBackendError::Other(anyhow::anyhow!("Task backend call panicked: {}", e)))?
    }

    // Repository operations

    pub async fn all(&self) -> TaskBackendResult<Vec<Task>> {
        self.with_backend(|b| b.all()).await
    }

    pub async fn filter(&self, status: TaskStatus) -> TaskBackendResult<Vec<Task>> {
        self.with_backend(move |b| b.filter(status)).await
    }

    pub async fn get(&self, id: &str) -> TaskBackendResult<Option<Task>> {
        let id = id.to_string();
        self.with_backend(move |b| b.get(&id)).await
    }

    pub async fn create(
        &self,
        content: &str,
        location: &Location,
        weather: Option<&Weather>,
    ) -> TaskBackendResult<Task> {
        let content = content.to_string();
        let location = location.clone();
        let weather = weather.cloned();
        self.with_backend(move |b| b.create(&content, &location, weather.as_ref()))
            .await
    }

    pub async fn save(&self, task: Task) -> TaskBackendResult<()> {
        self.with_backend(move |b| b.save(&task)).await
    }

    /// Persist a new weather reading without touching the rest of the task.
    pub async fn update_weather(&self, id: &str, weather: Weather) -> TaskBackendResult<()> {
        let id = id.to_string();
        self.with_backend(move |b| b.update_weather(&id, &weather)).await
    }

    // Page flows

    /// Active and finished tasks, each in display order.
    pub async fn list_tasks(&self) -> TaskBackendResult<TaskLists> {
        self.with_backend(|b| {
            Ok(TaskLists {
                active: b.filter(TaskStatus::Active)?,
                finished: b.filter(TaskStatus::Finished)?,
            })
        })
        .await
    }

    /// Validate a submitted form and create a task without weather.
    ///
    /// # Errors
    /// Returns `TaskBackendError::Validation` and stores nothing when the form is invalid.
    pub async fn create_task(&self, form: TaskForm) -> TaskBackendResult<Task> {
        let (content, location) = form.validate()?;
        let task = self.create(&content, &location, None).await?;
        tracing::info!(task_id = %task.id, "Task created");
        Ok(task)
    }

    /// Validate a submitted form and apply it to an existing task.
    ///
    /// Only content and location change; the weather reading is kept until
    /// the next refresh.
    ///
    /// # Errors
    /// Returns `TaskBackendError::NotFound` for unknown IDs and
    /// `TaskBackendError::Validation` when the form is invalid.
    pub async fn edit_task(&self, id: &str, form: TaskForm) -> TaskBackendResult<Task> {
        let (content, location) = form.validate()?;
        let id = id.to_string();
        self.with_backend(move |b| {
            let mut task = b.get(&id)?.ok_or_else(|| TaskBackendError::not_found(&id))?;
            task.content = content;
            task.location = location;
            b.save(&task)?;
            Ok(task)
        })
        .await
    }

    /// Mark a task as finished now.
    pub async fn mark_as_finished(&self, id: &str) -> TaskBackendResult<Task> {
        let id = id.to_string();
        let at = Utc::now().trunc_subsecs(6);
        self.with_backend(move |b| b.mark_finished(&id, at)).await
    }

    /// Move a finished task back to the active list.
    pub async fn mark_as_active(&self, id: &str) -> TaskBackendResult<Task> {
        let id = id.to_string();
        self.with_backend(move |b| b.mark_active(&id)).await
    }
}

impl fmt::Debug for TaskClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskClient").finish_non_exhaustive()
    }
}

pub mod refresh;
pub mod scheduler;
pub mod task;
pub mod task_backend;
pub mod task_client;
pub mod task_store;

pub use refresh::{RefreshReport, WeatherRefreshJob};
pub use scheduler::{ScheduleEntry, ScheduledJob, Scheduler, SchedulerHandle};
pub use task::{Task, TaskForm, TaskLists, TaskStatus};
pub use task_backend::{TaskBackend, TaskBackendError, TaskBackendResult};
pub use task_client::TaskClient;
pub use task_store::SqliteTaskStore;

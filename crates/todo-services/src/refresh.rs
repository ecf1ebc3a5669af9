//! Weather refresh for active tasks.
//!
//! One run queries every active task, fetches the current weather for its
//! location and stores the reading. Each task is handled on its own: a
//! failed fetch or save is logged and leaves that task untouched, and the
//! rest of the batch carries on.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use todo_weather::WeatherFetcher;
use tracing::instrument;

use crate::scheduler::ScheduledJob;
use crate::task::{Task, TaskStatus};
use crate::task_backend::TaskBackendResult;
use crate::task_client::TaskClient;

/// Outcome counts of one refresh run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub total: usize,
    pub updated: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct WeatherRefreshJob {
    tasks: TaskClient,
    fetcher: Arc<dyn WeatherFetcher>,
    max_concurrent: usize,
}

impl WeatherRefreshJob {
    pub const NAME: &'static str = "update_weather_for_active_tasks";

    /// Create a job that refreshes tasks one at a time.
    pub fn new(tasks: TaskClient, fetcher: Arc<dyn WeatherFetcher>) -> Self {
        Self {
            tasks,
            fetcher,
            max_concurrent: 1,
        }
    }

    /// Allow up to `max_concurrent` tasks in flight at once (at least one).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Refresh every active task.
    ///
    /// # Errors
    /// Only when the active tasks cannot be listed. Per-task failures are
    /// logged and counted in the report.
    #[instrument(skip(self), fields(max_concurrent = self.max_concurrent))]
    pub async fn run(&self) -> TaskBackendResult<RefreshReport> {
        let active = self.tasks.filter(TaskStatus::Active).await?;
        let total = active.len();

        let tasks = self.tasks.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let outcomes: Vec<bool> = stream::iter(active)
            .map(move |task| refresh_task(tasks.clone(), Arc::clone(&fetcher), task))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let updated = outcomes.iter().filter(|ok| **ok).count();
        let report = RefreshReport {
            total,
            updated,
            failed: total - updated,
        };

        if report.failed > 0 {
            tracing::warn!(
                total = report.total,
                updated = report.updated,
                failed = report.failed,
                "Weather refresh finished with failures"
            );
        } else {
            tracing::info!(total = report.total, "Weather refresh finished");
        }

        Ok(report)
    }
}

/// Fetch and store the weather for one task. Returns whether it was updated.
async fn refresh_task(tasks: TaskClient, fetcher: Arc<dyn WeatherFetcher>, task: Task) -> bool {
    let weather = match fetcher.fetch(&task.location).await {
        Ok(weather) => weather,
        Err(e) => {
            tracing::error!(
                task_id = %task.id,
                status = ?e.status(),
                error = %e,
                "Weather for task has not been updated"
            );
            return false;
        }
    };

    match tasks.update_weather(&task.id, weather).await {
        Ok(()) => {
            tracing::debug!(task_id = %task.id, "Weather for task updated");
            true
        }
        Err(e) => {
            tracing::error!(
                task_id = %task.id,
                error = %e,
                "Weather for task has not been saved"
            );
            false
        }
    }
}

#[async_trait]
impl ScheduledJob for WeatherRefreshJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn execute(&self) -> anyhow::Result<()> {
        self.run().await?;
        Ok(())
    }
}

impl std::fmt::Debug for WeatherRefreshJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherRefreshJob")
            .field("tasks", &self.tasks)
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::task_store::SqliteTaskStore;
    use todo_core::NetworkError;
    use todo_weather::{Location, Weather, WeatherError};

    struct FixedFetcher(Weather);

    #[async_trait]
    impl WeatherFetcher for FixedFetcher {
        async fn fetch(&self, _location: &Location) -> Result<Weather, WeatherError> {
            Ok(self.0.clone())
        }
    }

    /// Fails for locations whose label starts with "bad".
    struct PickyFetcher;

    #[async_trait]
    impl WeatherFetcher for PickyFetcher {
        async fn fetch(&self, location: &Location) -> Result<Weather, WeatherError> {
            if location.label.starts_with("bad") {
                Err(WeatherError::Network(NetworkError::Rejected {
                    status: 400,
                    body: String::new(),
                }))
            } else {
                Ok(Weather::new("Clear", 18.0))
            }
        }
    }

    fn client() -> TaskClient {
        TaskClient::sqlite(SqliteTaskStore::in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_updates_active_tasks_only() {
        let tasks = client();
        let active = tasks
            .create("active", &Location::new(1.0, 1.0, "a"), None)
            .await
            .unwrap();
        let done = tasks
            .create("done", &Location::new(2.0, 2.0, "b"), None)
            .await
            .unwrap();
        tasks.mark_as_finished(&done.id).await.unwrap();

        let job = WeatherRefreshJob::new(
            tasks.clone(),
            Arc::new(FixedFetcher(Weather::new("Snow", -2.0))),
        );
        let report = job.run().await.unwrap();

        assert_eq!(report, RefreshReport { total: 1, updated: 1, failed: 0 });
        let active = tasks.get(&active.id).await.unwrap().unwrap();
        assert_eq!(active.weather, Some(Weather::new("Snow", -2.0)));
        let done = tasks.get(&done.id).await.unwrap().unwrap();
        assert!(done.weather.is_none());
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let tasks = client();
        let bad = tasks
            .create("bad", &Location::new(1.0, 1.0, "bad place"), None)
            .await
            .unwrap();
        let good = tasks
            .create("good", &Location::new(2.0, 2.0, "good place"), None)
            .await
            .unwrap();

        let job = WeatherRefreshJob::new(tasks.clone(), Arc::new(PickyFetcher))
            .with_max_concurrent(4);
        let report = job.run().await.unwrap();

        assert_eq!(report, RefreshReport { total: 2, updated: 1, failed: 1 });
        assert!(tasks.get(&bad.id).await.unwrap().unwrap().weather.is_none());
        assert_eq!(
            tasks.get(&good.id).await.unwrap().unwrap().weather,
            Some(Weather::new("Clear", 18.0))
        );
    }

    #[tokio::test]
    async fn test_no_active_tasks() {
        let job = WeatherRefreshJob::new(
            client(),
            Arc::new(FixedFetcher(Weather::new("Clear", 20.0))),
        );
        assert_eq!(job.run().await.unwrap(), RefreshReport::default());
    }

    #[test]
    fn test_max_concurrent_clamped() {
        let job = WeatherRefreshJob::new(
            client(),
            Arc::new(FixedFetcher(Weather::new("Clear", 20.0))),
        )
        .with_max_concurrent(0);
        assert_eq!(job.max_concurrent, 1);
        assert_eq!(job.name(), WeatherRefreshJob::NAME);
    }
}

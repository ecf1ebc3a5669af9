//! Fixed-period background job scheduler.
//!
//! Each registered entry gets its own ticker loop. Every tick spawns a fresh
//! run of the job, so a slow run may overlap the next one. Failed runs are
//! logged and the schedule carries on. All loops stop on a cancellation token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// A zero-argument, re-entrant background job.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    /// A failed run is logged by the scheduler; it does not stop the schedule.
    async fn execute(&self) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct ScheduleEntry {
    pub name: String,
    pub interval: Duration,
    pub job: Arc<dyn ScheduledJob>,
}

impl std::fmt::Debug for ScheduleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleEntry")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<ScheduleEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` to run every `interval`. The first run happens one
    /// interval after `start`.
    ///
    /// A zero interval is ignored with a warning.
    pub fn register(&mut self, interval: Duration, job: Arc<dyn ScheduledJob>) -> &mut Self {
        let name = job.name().to_string();
        if interval.is_zero() {
            warn!(job = %name, "Ignoring job registered with a zero interval");
            return self;
        }

        info!(job = %name, interval_seconds = interval.as_secs_f64(), "Registered scheduled job");
        self.entries.push(ScheduleEntry {
            name,
            interval,
            job,
        });
        self
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Start one ticker loop per entry.
    pub fn start(self, shutdown: CancellationToken) -> SchedulerHandle {
        let tracker = TaskTracker::new();
        let handles = self
            .entries
            .into_iter()
            .map(|entry| tokio::spawn(run_entry(entry, shutdown.clone(), tracker.clone())))
            .collect();

        SchedulerHandle {
            shutdown,
            tracker,
            handles,
        }
    }
}

async fn run_entry(entry: ScheduleEntry, shutdown: CancellationToken, tracker: TaskTracker) {
    let mut ticker = interval_at(Instant::now() + entry.interval, entry.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut run_id: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(job = %entry.name, "Scheduler loop stopping");
                break;
            }
            _ = ticker.tick() => {
                run_id += 1;
                let job = Arc::clone(&entry.job);
                let name = entry.name.clone();
                tracker.spawn(async move {
                    debug!(job = %name, run_id, "Running scheduled job");
                    if let Err(e) = job.execute().await {
                        error!(job = %name, run_id, error = %e, "Scheduled job failed");
                    }
                });
            }
        }
    }
}

/// Handle to a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: CancellationToken,
    tracker: TaskTracker,
    handles: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop triggering new runs and wait for in-flight runs to finish.
    pub async fn stop(self) {
        self.shutdown.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Scheduler loop ended abnormally");
            }
        }
        self.tracker.close();
        self.tracker.wait().await;
        info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        runs: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingJob {
        fn new(delay: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay,
                fail,
            })
        }
    }

    #[async_trait]
    impl ScheduledJob for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }

        async fn execute(&self) -> anyhow::Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.runs.fetch_add(1, Ordering::SeqCst);

            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    #[test]
    fn test_zero_interval_is_ignored() {
        let mut scheduler = Scheduler::new();
        scheduler.register(Duration::ZERO, CountingJob::new(Duration::ZERO, false));
        assert!(scheduler.entries().is_empty());
    }

    #[test]
    fn test_register_uses_job_name() {
        let mut scheduler = Scheduler::new();
        scheduler.register(
            Duration::from_secs(60),
            CountingJob::new(Duration::ZERO, false),
        );
        assert_eq!(scheduler.entries().len(), 1);
        assert_eq!(scheduler.entries()[0].name, "counting");
    }

    // Tests run on a paused clock: sleeps advance virtual time once every
    // task is idle, so tick counts are exact.

    #[tokio::test(start_paused = true)]
    async fn test_runs_once_per_interval() {
        let job = CountingJob::new(Duration::ZERO, false);
        let mut scheduler = Scheduler::new();
        scheduler.register(Duration::from_secs(10), job.clone());

        let handle = scheduler.start(CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.stop().await;

        assert_eq!(job.runs.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_job_keeps_schedule() {
        let job = CountingJob::new(Duration::ZERO, true);
        let mut scheduler = Scheduler::new();
        scheduler.register(Duration::from_secs(10), job.clone());

        let handle = scheduler.start(CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.stop().await;

        assert_eq!(job.runs.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_runs_overlap() {
        let job = CountingJob::new(Duration::from_secs(25), false);
        let mut scheduler = Scheduler::new();
        scheduler.register(Duration::from_secs(10), job.clone());

        let handle = scheduler.start(CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(95)).await;
        handle.stop().await;

        assert_eq!(job.max_in_flight.load(Ordering::SeqCst), 3);
        assert_eq!(job.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(job.runs.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_runs_after_stop() {
        let job = CountingJob::new(Duration::ZERO, false);
        let mut scheduler = Scheduler::new();
        scheduler.register(Duration::from_secs(10), job.clone());

        let token = CancellationToken::new();
        let handle = scheduler.start(token.clone());
        tokio::time::sleep(Duration::from_secs(35)).await;
        handle.stop().await;
        assert!(token.is_cancelled());
        assert_eq!(job.runs.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_run_waits_one_interval() {
        let job = CountingJob::new(Duration::ZERO, false);
        let mut scheduler = Scheduler::new();
        scheduler.register(Duration::from_secs(60), job.clone());

        let handle = scheduler.start(CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.stop().await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }
}

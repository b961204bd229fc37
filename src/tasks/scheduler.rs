use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::metrics::SchedulerMetrics;

use super::TaskError;

/// A unit of periodic work.
#[async_trait]
pub trait ScheduledTask: Send + Sync + 'static {
    /// Name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Perform one run. Errors are reported by the scheduler.
    async fn run_once(&self) -> Result<(), TaskError>;
}

struct Registration {
    task: Arc<dyn ScheduledTask>,
    every: Duration,
}

/// Drives registered tasks on independent fixed intervals.
///
/// Each tick spawns its run, so a slow run never delays the next tick and
/// runs of the same task may overlap.
pub struct Scheduler {
    registrations: Vec<Registration>,
    shutdown: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(shutdown: broadcast::Sender<()>) -> Self {
        Self {
            registrations: Vec::new(),
            shutdown,
        }
    }

    /// Register a task to run every `every`, first run one interval after start.
    pub fn register(mut self, task: Arc<dyn ScheduledTask>, every: Duration) -> Self {
        self.registrations.push(Registration { task, every });
        self
    }

    pub fn task_count(&self) -> usize {
        self.registrations.len()
    }

    /// Spawn one timer loop per registered task.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        self.registrations
            .into_iter()
            .map(|registration| {
                let shutdown = self.shutdown.subscribe();
                tokio::spawn(run_loop(registration, shutdown))
            })
            .collect()
    }
}

async fn run_loop(registration: Registration, mut shutdown: broadcast::Receiver<()>) {
    let Registration { task, every } = registration;
    let mut timer = tokio::time::interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Skip immediate first tick
    timer.tick().await;

    tracing::info!(
        task = task.name(),
        interval_secs = every.as_secs(),
        "Scheduled task started"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!(task = task.name(), "Scheduled task received shutdown signal");
                break;
            }
            _ = timer.tick() => {
                tokio::spawn(run_tick(task.clone()));
            }
        }
    }

    tracing::info!(task = task.name(), "Scheduled task stopped");
}

async fn run_tick(task: Arc<dyn ScheduledTask>) {
    let start = Instant::now();
    match task.run_once().await {
        Ok(()) => {
            SchedulerMetrics::record_success(task.name(), start.elapsed());
            tracing::debug!(
                task = task.name(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Scheduled run completed"
            );
        }
        Err(e) => {
            SchedulerMetrics::record_failure(task.name(), start.elapsed());
            tracing::error!(task = task.name(), error = %e, "Scheduled run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingTask {
        runs: AtomicUsize,
        fail: bool,
    }

    impl CountingTask {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                fail,
            })
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScheduledTask for CountingTask {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_once(&self) -> Result<(), TaskError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TaskError::Probe("store unavailable".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_run_before_first_interval() {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let task = CountingTask::new(false);
        let _handles = Scheduler::new(shutdown_tx.clone())
            .register(task.clone(), Duration::from_secs(10))
            .start();

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(task.runs(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(task.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_task_keeps_ticking() {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let task = CountingTask::new(true);
        let _handles = Scheduler::new(shutdown_tx.clone())
            .register(task.clone(), Duration::from_secs(10))
            .start();

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(task.runs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_run_on_independent_intervals() {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let fast = CountingTask::new(false);
        let slow = CountingTask::new(true);
        let scheduler = Scheduler::new(shutdown_tx.clone())
            .register(fast.clone(), Duration::from_secs(5))
            .register(slow.clone(), Duration::from_secs(20));
        assert_eq!(scheduler.task_count(), 2);
        let _handles = scheduler.start();

        tokio::time::sleep(Duration::from_secs(41)).await;
        assert_eq!(fast.runs(), 8);
        assert_eq!(slow.runs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loops() {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let task = CountingTask::new(false);
        let handles = Scheduler::new(shutdown_tx.clone())
            .register(task.clone(), Duration::from_secs(10))
            .start();

        tokio::time::sleep(Duration::from_secs(15)).await;
        shutdown_tx.send(()).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(task.runs(), 1);
    }
}

//! Fan-out scheduler with a launch throttle
//!
//! This module handles:
//! - Launching one task per work URL from a single launcher loop
//! - Enforcing a minimum spacing between successive task launches
//! - Joining every launched task before the batch returns
//! - Capturing per-task failures (errors and panics) without aborting siblings
//! - Stopping further launches once a fatal error has been observed
//!
//! The spacing limits the launch rate, not the number of tasks in flight: a
//! slow server simply accumulates more concurrent requests.

use crate::HarvestError;
use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Result of one task of a batch
#[derive(Debug)]
pub struct TaskOutcome<T> {
    /// The work URL the task was launched for
    pub url: String,

    /// The task's value, or the failure that cost this URL its results
    pub result: Result<T, HarvestError>,
}

/// Everything a batch produced, in completion order
#[derive(Debug)]
pub struct BatchReport<T> {
    /// One outcome per launched task
    pub outcomes: Vec<TaskOutcome<T>>,

    /// URLs never launched because a fatal error stopped the batch
    pub skipped: usize,
}

impl<T> BatchReport<T> {
    /// Number of tasks that completed successfully
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of tasks that failed
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Removes and returns the first fatal error, if any task hit one
    pub fn take_fatal(&mut self) -> Option<HarvestError> {
        let idx = self
            .outcomes
            .iter()
            .position(|o| matches!(&o.result, Err(e) if e.is_fatal()))?;
        self.outcomes.swap_remove(idx).result.err()
    }

    /// Consumes the report, keeping only successful values
    pub fn into_successes(self) -> Vec<T> {
        self.outcomes
            .into_iter()
            .filter_map(|o| o.result.ok())
            .collect()
    }
}

/// Runs homogeneous batches of URL tasks
#[derive(Debug, Clone)]
pub struct Scheduler {
    /// Minimum time between two successive launches
    spacing: Duration,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `spacing` - Minimum delay between task launches; zero disables throttling
    pub fn new(spacing: Duration) -> Self {
        Self { spacing }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Runs one task per URL and waits for all of them
    ///
    /// `worker` is called from the launcher loop to build each task's future,
    /// which is then spawned onto the runtime. Failed tasks are logged with
    /// their URL and reported in the returned `BatchReport`; they never
    /// cancel sibling tasks. Once any task reports a fatal error, no further
    /// tasks are launched, but tasks already in flight are still joined.
    ///
    /// # Arguments
    ///
    /// * `stage` - Label used in log output
    /// * `urls` - The URLs to visit, launched in iteration order
    /// * `worker` - Builds the task for one URL
    pub async fn run_batch<T, F, Fut>(
        &self,
        stage: &'static str,
        urls: impl IntoIterator<Item = String>,
        worker: F,
    ) -> BatchReport<T>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, HarvestError>> + Send + 'static,
    {
        let mut queue: VecDeque<String> = urls.into_iter().collect();
        let total = queue.len();
        let fatal_seen = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();
        let mut last_launch: Option<Instant> = None;

        tracing::debug!(stage, total, spacing = ?self.spacing, "launching batch");

        while let Some(url) = queue.pop_front() {
            if let Some(previous) = last_launch {
                if !self.spacing.is_zero() {
                    tokio::time::sleep_until(previous + self.spacing).await;
                }
            }

            if fatal_seen.load(Ordering::SeqCst) {
                queue.push_front(url);
                break;
            }

            let task = worker(url.clone());
            let fatal_flag = Arc::clone(&fatal_seen);
            tasks.spawn(async move {
                let result = match AssertUnwindSafe(task).catch_unwind().await {
                    Ok(result) => result,
                    Err(_) => Err(HarvestError::TaskPanicked { url: url.clone() }),
                };
                if matches!(&result, Err(e) if e.is_fatal()) {
                    fatal_flag.store(true, Ordering::SeqCst);
                }
                TaskOutcome { url, result }
            });
            last_launch = Some(Instant::now());
        }

        let skipped = queue.len();
        if skipped > 0 {
            tracing::error!(
                stage,
                skipped,
                "fatal error during batch, remaining tasks not launched"
            );
        }

        let mut outcomes = Vec::with_capacity(total - skipped);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    if let Err(e) = &outcome.result {
                        tracing::warn!(stage, url = %outcome.url, error = %e, "task failed");
                    }
                    outcomes.push(outcome);
                }
                // Tasks are never aborted, so this only happens if the runtime shuts down
                Err(e) => tracing::error!(stage, error = %e, "task could not be joined"),
            }
        }

        let report = BatchReport { outcomes, skipped };
        tracing::debug!(
            stage,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch finished"
        );
        report
    }
}

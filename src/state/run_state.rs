use crate::state::Stage;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Progress of a single crawl run
///
/// Threaded through the orchestrator and updated at stage boundaries; the
/// durable stores remain the source of truth for what is done across runs.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Current pipeline stage
    pub stage: Stage,

    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,

    /// Seed categories resolved during SEEDING
    pub seeds: usize,

    /// Listing URLs known after LISTING_DISCOVERY
    pub listings_discovered: usize,

    /// Listing URLs skipped because the ledger already holds them
    pub listings_skipped: usize,

    /// Listing pages visited and recorded in this run
    pub listings_processed: usize,

    /// Listing pages that failed or yielded no items in this run
    pub listings_failed: usize,

    /// Item URLs known from the listing ledger
    pub items_discovered: usize,

    /// Item URLs not yet in the accumulator at ITEM_DISCOVERY
    pub items_pending: usize,

    /// Items extracted and persisted in this run
    pub items_processed: usize,

    /// Items that failed in this run
    pub items_failed: usize,

    /// Rows written by MATERIALIZE
    pub records_materialized: usize,

    clock: Instant,
}

impl RunState {
    /// Creates the state of a run that is about to start at `Seeding`
    pub fn new() -> Self {
        Self {
            stage: Stage::Seeding,
            started_at: Utc::now(),
            seeds: 0,
            listings_discovered: 0,
            listings_skipped: 0,
            listings_processed: 0,
            listings_failed: 0,
            items_discovered: 0,
            items_pending: 0,
            items_processed: 0,
            items_failed: 0,
            records_materialized: 0,
            clock: Instant::now(),
        }
    }

    /// Moves to the next stage
    ///
    /// # Returns
    ///
    /// * `Some(Stage)` - The stage that was entered
    /// * `None` - The run was already `Done`
    pub fn advance(&mut self) -> Option<Stage> {
        let next = self.stage.next()?;
        debug_assert!(self.stage.can_transition_to(next));
        self.stage = next;
        tracing::info!(stage = %next, "entering stage");
        Some(next)
    }

    /// Time since the run started
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Logs the progress counters at `info`
    pub fn log_progress(&self) {
        tracing::info!(
            stage = %self.stage,
            listings_discovered = self.listings_discovered,
            listings_processed = self.listings_processed,
            listings_failed = self.listings_failed,
            items_pending = self.items_pending,
            items_processed = self.items_processed,
            items_failed = self.items_failed,
            "progress"
        );
    }

    /// Logs the run summary at `info`
    pub fn log_summary(&self) {
        tracing::info!(
            started_at = %self.started_at.to_rfc3339(),
            elapsed_secs = self.elapsed().as_secs_f64(),
            seeds = self.seeds,
            listings_discovered = self.listings_discovered,
            listings_skipped = self.listings_skipped,
            listings_processed = self.listings_processed,
            listings_failed = self.listings_failed,
            items_discovered = self.items_discovered,
            items_processed = self.items_processed,
            items_failed = self.items_failed,
            records_materialized = self.records_materialized,
            "run finished"
        );
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

//! Run statistics
//!
//! Counters are updated concurrently by crawl tasks and snapshotted into a
//! `RunSummary` when the run finishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters for one run
#[derive(Debug, Default)]
pub struct RunStats {
    fetched: AtomicU64,
    fetch_failures: AtomicU64,
    excluded: AtomicU64,
    robots_denied: AtomicU64,
    task_failures: AtomicU64,
    deleted: AtomicU64,
}

impl RunStats {
    pub fn record_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_excluded(&self) {
        self.excluded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_robots_denied(&self) {
        self.robots_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_failure(&self) {
        self.task_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deleted(&self, count: u64) {
        self.deleted.fetch_add(count, Ordering::Relaxed);
    }

    /// Freezes the counters into a summary
    pub fn snapshot(
        &self,
        thread_id: &str,
        seed_url: &str,
        emitted: u64,
        visited: u64,
        elapsed: Duration,
    ) -> RunSummary {
        RunSummary {
            thread_id: thread_id.to_string(),
            seed_url: seed_url.to_string(),
            visited,
            fetched: self.fetched.load(Ordering::Relaxed),
            emitted,
            excluded: self.excluded.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            robots_denied: self.robots_denied.load(Ordering::Relaxed),
            task_failures: self.task_failures.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Outcome of one completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub thread_id: String,
    pub seed_url: String,
    /// URLs inserted into the visited set
    pub visited: u64,
    /// Fetches that returned content
    pub fetched: u64,
    /// Add records handed to the sink
    pub emitted: u64,
    /// Fetched pages withheld by a content-exclusion pattern
    pub excluded: u64,
    pub fetch_failures: u64,
    pub robots_denied: u64,
    /// URLs whose processing failed outside the fetch itself
    pub task_failures: u64,
    /// Delete records handed to the sink
    pub deleted: u64,
    pub elapsed: Duration,
}

/// Prints a run summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Run {} ===", summary.thread_id);
    println!("  Seed: {}", summary.seed_url);
    println!("  URLs visited: {}", summary.visited);
    println!("  Pages fetched: {}", summary.fetched);
    println!("  Records emitted: {}", summary.emitted);
    println!("  Pages excluded: {}", summary.excluded);
    println!("  Fetch failures: {}", summary.fetch_failures);
    println!("  Disallowed by robots.txt: {}", summary.robots_denied);
    if summary.task_failures > 0 {
        println!("  Failed URLs: {}", summary.task_failures);
    }
    println!("  Deletions: {}", summary.deleted);
    println!("  Duration: {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

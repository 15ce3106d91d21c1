//! Visited set, page budget and in-flight task tracking
//!
//! These are the only pieces of run state that crawl tasks mutate
//! concurrently.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct VisitedInner {
    seen: HashSet<String>,
    order: Vec<String>,
}

/// URLs scheduled during the current run, in insertion order
///
/// Once a URL is inserted it is never fetched again in the same run.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<VisitedInner>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `url`, returning false if it was already present
    ///
    /// The check and the insert happen under one lock, so of several tasks
    /// racing on the same URL exactly one gets `true`.
    pub fn insert(&self, url: &str) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.seen.contains(url) {
            return false;
        }
        inner.seen.insert(url.to_string());
        inner.order.push(url.to_string());
        true
    }

    /// Marks `url` as seen without adding it to the saved order, returning
    /// false if it was already seen
    ///
    /// Used for redirect targets: a page reached under another URL must not
    /// be fetched again, but only requested URLs are keyed in run state.
    pub fn mark_seen(&self, url: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .seen
            .insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .seen
            .contains(url)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the visited URLs in the order they were first inserted
    pub fn snapshot(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .order
            .clone()
    }
}

/// Depth and page limits of a run, with the live page counter
///
/// A limit of 0 means unlimited.
#[derive(Debug, Default)]
pub struct Budget {
    max_depth: u32,
    max_pages: u64,
    pages: AtomicU64,
}

impl Budget {
    pub fn new(max_depth: u32, max_pages: u64) -> Self {
        Self {
            max_depth,
            max_pages,
            pages: AtomicU64::new(0),
        }
    }

    /// Returns true once every page slot has been claimed
    pub fn is_exhausted(&self) -> bool {
        self.max_pages != 0 && self.pages.load(Ordering::Acquire) >= self.max_pages
    }

    /// Claims one page slot, returning false if none is left
    ///
    /// The counter never exceeds `max_pages`, no matter how many tasks
    /// claim at once.
    pub fn try_claim_page(&self) -> bool {
        if self.max_pages == 0 {
            self.pages.fetch_add(1, Ordering::AcqRel);
            return true;
        }

        self.pages
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pages| {
                (pages < self.max_pages).then_some(pages + 1)
            })
            .is_ok()
    }

    /// Number of pages claimed so far
    pub fn emitted(&self) -> u64 {
        self.pages.load(Ordering::Acquire)
    }

    /// Returns true if a page at `depth` may schedule its children
    pub fn allows_children(&self, depth: u32) -> bool {
        self.max_depth == 0 || depth.saturating_add(1) <= self.max_depth
    }
}

/// Counts crawl tasks that have been scheduled but not yet finished
///
/// Acts as a wait-group: a parent registers its children before its own
/// guard drops, so the count only reaches zero once the frontier is empty.
#[derive(Debug, Default)]
pub struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task; the task is finished when the guard drops
    pub fn start(self: &Arc<Self>) -> TaskGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        TaskGuard {
            in_flight: Arc::clone(self),
        }
    }

    /// Number of tasks currently registered
    pub fn active(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Waits until no task is registered
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a wakeup between the
            // check and the await is not lost
            notified.as_mut().enable();

            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Marks one registered task as finished when dropped, including on panic
#[derive(Debug)]
pub struct TaskGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.in_flight.finish();
    }
}

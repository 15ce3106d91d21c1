//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one run from its seed URL:
//! - Reading robots.txt for the seed site
//! - Spawning one task per discovered URL, bounded by a worker pool
//! - Waiting until every scheduled task has finished
//! - Reconciling the visited URLs against the previous run

use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::frontier::{Budget, InFlight, VisitedSet};
use crate::crawler::reconciler::Reconciler;
use crate::crawler::RunSettings;
use crate::output::{Record, RecordSink, RunStats, RunSummary};
use crate::robots::{fetch_robots, RobotsPolicy};
use crate::state::RunPhase;
use crate::url::{resolve, PatternSet};
use crate::CrawlerError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// State shared by every task of a run
struct CrawlContext {
    thread_id: String,
    user_agent: String,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn RecordSink>,
    robots: RobotsPolicy,
    extractor: Extractor,
    visited: VisitedSet,
    budget: Arc<Budget>,
    stats: Arc<RunStats>,
    in_flight: Arc<InFlight>,
    permits: Arc<Semaphore>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    settings: RunSettings,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn RecordSink>,
    exclude_data: PatternSet,
    exclude_link: PatternSet,
    budget: Arc<Budget>,
    stats: Arc<RunStats>,
    reconciler: Reconciler,
    phase: RunPhase,
}

impl Coordinator {
    /// Creates a coordinator for one run
    ///
    /// # Arguments
    ///
    /// * `settings` - The run settings
    /// * `fetcher` - Transport shared by every task, closed when the run ends
    /// * `sink` - Receives add and delete records
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlerError)` - An exclusion pattern failed to compile
    pub fn new(
        settings: RunSettings,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<Self, CrawlerError> {
        let exclude_data = PatternSet::new(&settings.exclude_data)?;
        let exclude_link = PatternSet::new(&settings.exclude_link)?;
        let budget = Arc::new(Budget::new(settings.max_depth, settings.max_pages));
        let reconciler =
            Reconciler::for_data_folder(settings.data_folder.as_deref(), &settings.seed_url);

        Ok(Self {
            settings,
            fetcher,
            sink,
            exclude_data,
            exclude_link,
            budget,
            stats: Arc::new(RunStats::default()),
            reconciler,
            phase: RunPhase::SeedingRobots,
        })
    }

    /// Current phase of the run
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn transition(&mut self, to: RunPhase) -> Result<(), CrawlerError> {
        if !self.phase.can_transition_to(to) {
            return Err(CrawlerError::InvalidTransition {
                from: self.phase,
                to,
            });
        }

        tracing::info!(
            thread_id = %self.settings.thread_id,
            from = %self.phase,
            to = %to,
            "Run phase changed"
        );
        self.phase = to;
        Ok(())
    }

    /// Runs the crawl to completion
    ///
    /// Individual URL failures are logged and never end the run early.
    pub async fn run(mut self) -> Result<RunSummary, CrawlerError> {
        let start_time = Instant::now();
        tracing::info!(
            thread_id = %self.settings.thread_id,
            url = %self.settings.seed_url,
            "Starting fetch"
        );

        let robots = if self.settings.read_robots {
            fetch_robots(self.fetcher.as_ref(), &self.settings.seed_url).await
        } else {
            RobotsPolicy::default()
        };

        let context = Arc::new(CrawlContext {
            thread_id: self.settings.thread_id.clone(),
            user_agent: self.settings.user_agent.clone(),
            fetcher: Arc::clone(&self.fetcher),
            sink: Arc::clone(&self.sink),
            robots,
            extractor: Extractor::new(
                std::mem::take(&mut self.exclude_data),
                std::mem::take(&mut self.exclude_link),
                self.settings.javascript,
                Arc::clone(&self.budget),
            ),
            visited: VisitedSet::new(),
            budget: Arc::clone(&self.budget),
            stats: Arc::clone(&self.stats),
            in_flight: Arc::new(InFlight::new()),
            permits: Arc::new(Semaphore::new(self.settings.threads.max(1))),
        });

        self.transition(RunPhase::Crawling)?;
        let seed = self.settings.seed_url.clone();
        schedule(&context, seed.clone(), seed, 0);

        self.transition(RunPhase::Draining)?;
        context.in_flight.wait_idle().await;

        self.transition(RunPhase::Reconciling)?;
        let visited = context.visited.snapshot();
        self.reconciler
            .finish_run(&visited, self.sink.as_ref(), &self.stats);

        self.fetcher.close().await;
        self.transition(RunPhase::Done)?;

        let summary = self.stats.snapshot(
            &self.settings.thread_id,
            &self.settings.seed_url,
            self.budget.emitted(),
            visited.len() as u64,
            start_time.elapsed(),
        );

        tracing::info!(
            thread_id = %summary.thread_id,
            emitted = summary.emitted,
            visited = summary.visited,
            deleted = summary.deleted,
            "Finished run in {:?}",
            summary.elapsed
        );

        Ok(summary)
    }
}

/// Spawns a task for `link` without waiting for it
///
/// The task is registered with the wait-group before this returns, so a
/// parent that schedules its children keeps the run alive until they finish.
fn schedule(context: &Arc<CrawlContext>, link: String, root_url: String, depth: u32) {
    let guard = context.in_flight.start();
    let context = Arc::clone(context);

    tokio::spawn(async move {
        let _guard = guard;

        let children = {
            let _permit = match Arc::clone(&context.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            process_url(&context, &link, &root_url, depth).await
        };

        for child in children {
            schedule(&context, child, root_url.clone(), depth + 1);
        }
    });
}

/// Processes a single URL, returning the child links to schedule
///
/// This method:
/// 1. Checks the page budget
/// 2. Resolves the link against the crawl root
/// 3. Marks it visited, skipping URLs already seen this run
/// 4. Checks robots.txt
/// 5. Fetches the page, skipping redirects onto a URL already seen
/// 6. Extracts the page under the URL it was requested as
/// 7. Emits the record if the page is not excluded and a page slot is left
async fn process_url(
    context: &CrawlContext,
    link: &str,
    root_url: &str,
    depth: u32,
) -> Vec<String> {
    if context.budget.is_exhausted() {
        return Vec::new();
    }

    let url = match resolve(link, root_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(
                thread_id = %context.thread_id,
                link = %link,
                error = %e,
                "Failed to resolve URL"
            );
            context.stats.record_task_failure();
            return Vec::new();
        }
    };

    if !context.visited.insert(&url) {
        return Vec::new();
    }

    if context.robots.is_disallowed(&url, &context.user_agent) {
        tracing::info!(thread_id = %context.thread_id, url = %url, "URL disallowed by robots.txt");
        context.stats.record_robots_denied();
        return Vec::new();
    }

    let result = context.fetcher.fetch(&url, root_url).await;

    if !result.has_content() {
        tracing::warn!(
            thread_id = %context.thread_id,
            url = %url,
            status = result.status_code,
            message = %result.message,
            "Failed to fetch URL"
        );
        context.stats.record_fetch_failure();
        return Vec::new();
    }
    context.stats.record_fetched();

    if result.url != url && !context.visited.mark_seen(&result.url) {
        tracing::debug!(
            thread_id = %context.thread_id,
            url = %url,
            target = %result.url,
            "Redirect target already visited"
        );
        return Vec::new();
    }

    let extraction = context
        .extractor
        .extract(&url, &result, context.fetcher.as_ref(), depth)
        .await;

    if extraction.excluded {
        tracing::info!(
            thread_id = %context.thread_id,
            status = result.status_code,
            depth,
            url = %url,
            size = extraction.record.content.len(),
            "Excluded page"
        );
        context.stats.record_excluded();
        return extraction.children;
    }

    if !context.budget.try_claim_page() {
        tracing::debug!(thread_id = %context.thread_id, url = %url, "Page budget exhausted");
        return Vec::new();
    }

    tracing::info!(
        thread_id = %context.thread_id,
        status = result.status_code,
        pages = context.budget.emitted(),
        depth,
        url = %url,
        size = extraction.record.content.len(),
        visited = context.visited.len(),
        "Fetched page"
    );

    context.sink.accept(Record::Add(extraction.record));
    extraction.children
}

/// Runs one crawl from `settings.seed_url` to completion
///
/// # Arguments
///
/// * `settings` - The run settings
/// * `fetcher` - The transport, closed once the run ends
/// * `sink` - Receives every add and delete record
///
/// # Returns
///
/// * `Ok(RunSummary)` - The run reached `Done`
/// * `Err(CrawlerError)` - The settings were invalid
pub async fn run_crawl(
    settings: RunSettings,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn RecordSink>,
) -> Result<RunSummary, CrawlerError> {
    Coordinator::new(settings, fetcher, sink)?.run().await
}

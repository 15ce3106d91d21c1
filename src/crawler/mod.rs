//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The fetch capability and its reqwest implementation
//! - Content extraction and link classification
//! - Visited-set, budget and wait-group bookkeeping
//! - Overall crawl coordination and run reconciliation

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod reconciler;

pub use coordinator::{run_crawl, Coordinator};
pub use extractor::{Extraction, Extractor};
pub use fetcher::{build_http_client, FetchError, FetchResult, Fetcher, HttpFetcher};
pub use frontier::{Budget, InFlight, TaskGuard, VisitedSet};
pub use reconciler::{reconcile, Reconciler};

use crate::config::{Config, SiteEntry};
use std::path::PathBuf;

/// Everything one run needs to know, independent of how it was configured
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// URL the run starts from; also the root links are resolved against
    pub seed_url: String,

    /// Folder holding run state; `None` disables reconciliation
    pub data_folder: Option<PathBuf>,

    /// Whether to read and honor robots.txt
    pub read_robots: bool,

    /// Number of pages fetched and extracted at once
    pub threads: usize,

    /// Maximum depth below the seed (0 = unlimited)
    pub max_depth: u32,

    /// Maximum number of add records (0 = unlimited)
    pub max_pages: u64,

    /// Page URLs matching any of these are not emitted
    pub exclude_data: Vec<String>,

    /// Hrefs matching any of these are not followed
    pub exclude_link: Vec<String>,

    /// Agent name matched against robots.txt groups
    pub user_agent: String,

    /// Whether to take HTML from the transport's renderer
    pub javascript: bool,

    /// Name of the run in logs and summaries
    pub thread_id: String,
}

impl RunSettings {
    /// Settings for crawling `seed_url` with default limits
    pub fn new(seed_url: &str) -> Self {
        Self {
            seed_url: seed_url.to_string(),
            data_folder: None,
            read_robots: true,
            threads: 10,
            max_depth: 0,
            max_pages: 0,
            exclude_data: Vec::new(),
            exclude_link: Vec::new(),
            user_agent: "*".to_string(),
            javascript: false,
            thread_id: "site-0".to_string(),
        }
    }

    /// Settings for the site at `index` of a loaded configuration
    pub fn from_config(config: &Config, site: &SiteEntry, index: usize) -> Self {
        Self {
            seed_url: site.url.clone(),
            data_folder: config.output.data_folder.as_ref().map(PathBuf::from),
            read_robots: config.crawler.read_robots,
            threads: config.crawler.threads as usize,
            max_depth: config.crawler.max_depth,
            max_pages: config.crawler.max_pages,
            exclude_data: config.crawler.exclude_data.clone(),
            exclude_link: config.crawler.exclude_link.clone(),
            user_agent: config.user_agent.crawler_user_agent.clone(),
            javascript: config.crawler.javascript,
            thread_id: site
                .thread_id
                .clone()
                .unwrap_or_else(|| format!("site-{}", index)),
        }
    }
}

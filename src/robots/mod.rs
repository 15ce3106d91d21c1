//! Robots.txt handling module
//!
//! This module provides functionality for fetching and parsing the robots.txt
//! of a crawl's seed site. The policy is read once per run, before traversal
//! starts, and is never refreshed during the run.

mod parser;

pub use parser::{AgentRules, RobotsPolicy, ANY_AGENT};

use crate::crawler::Fetcher;
use crate::UrlError;
use url::Url;

/// Builds the robots.txt URL for the site of a seed URL
///
/// # Arguments
///
/// * `seed_url` - Any URL on the site
///
/// # Returns
///
/// * `Ok(String)` - `scheme://host[:port]/robots.txt`
/// * `Err(UrlError)` - The seed is not a URL with a host
///
/// # Examples
///
/// ```
/// use web_fetcher::robots::robots_url;
///
/// let url = robots_url("https://example.com/docs/index.html").unwrap();
/// assert_eq!(url, "https://example.com/robots.txt");
/// ```
pub fn robots_url(seed_url: &str) -> Result<String, UrlError> {
    let url = Url::parse(seed_url).map_err(|e| UrlError::Parse(format!("{}: {}", seed_url, e)))?;

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(seed_url.to_string()));
    }

    url.join("/robots.txt")
        .map(String::from)
        .map_err(|e| UrlError::Parse(e.to_string()))
}

/// Fetches and parses the robots.txt for a seed URL
///
/// Failure never blocks a crawl: an unparseable seed, a network error or a
/// non-2xx response all yield an empty policy that allows everything.
///
/// # Arguments
///
/// * `fetcher` - The transport used for the crawl
/// * `seed_url` - The seed URL of the run
pub async fn fetch_robots(fetcher: &dyn Fetcher, seed_url: &str) -> RobotsPolicy {
    let robots_url = match robots_url(seed_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(url = %seed_url, error = %e, "Failed to find robots.txt url");
            return RobotsPolicy::default();
        }
    };

    let result = fetcher.fetch(&robots_url, seed_url).await;

    match result.content {
        Some(bytes) => {
            let policy = RobotsPolicy::parse(&String::from_utf8_lossy(&bytes));
            tracing::info!(
                url = %robots_url,
                sitemaps = policy.sitemaps().len(),
                "Loaded robots.txt"
            );
            policy
        }
        None => {
            tracing::warn!(
                url = %robots_url,
                status = result.status_code,
                message = %result.message,
                "Failed to read robots.txt, crawling without restrictions"
            );
            RobotsPolicy::default()
        }
    }
}

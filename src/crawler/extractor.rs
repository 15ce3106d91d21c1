//! Content extraction for fetched pages
//!
//! This module turns a fetch result into:
//! - The add record handed to the sink
//! - The child links to crawl next (same-site hrefs, unresolved)
//! - The external links recorded alongside the page

use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::frontier::Budget;
use crate::output::CrawlRecord;
use crate::url::{has_scheme, reference_for, simplified_host, PatternSet};
use chrono::Utc;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

const HTTP: &str = "http://";
const HTTPS: &str = "https://";

/// Status recorded for every emitted page; a record is only built for a fetch
/// that produced content
const RECORD_STATUS: u16 = 200;

/// Output of extracting one page
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The add record for the page
    pub record: CrawlRecord,

    /// Hrefs to crawl next, empty when the depth limit or an exclusion applies
    pub children: Vec<String>,

    /// True if the page URL matched a content-exclusion pattern
    pub excluded: bool,
}

/// Links found in an HTML document, split by site
#[derive(Debug, Default, PartialEq, Eq)]
struct PageLinks {
    children: Vec<String>,
    external: Vec<String>,
}

/// Builds records and child links from fetch results
#[derive(Debug)]
pub struct Extractor {
    exclude_data: PatternSet,
    exclude_link: PatternSet,
    javascript: bool,
    budget: Arc<Budget>,
}

impl Extractor {
    /// Creates an extractor
    ///
    /// # Arguments
    ///
    /// * `exclude_data` - Pages whose URL matches are not emitted
    /// * `exclude_link` - Hrefs that match are not followed
    /// * `javascript` - Take HTML from the transport's renderer instead of the body
    /// * `budget` - Depth limit applied to child links
    pub fn new(
        exclude_data: PatternSet,
        exclude_link: PatternSet,
        javascript: bool,
        budget: Arc<Budget>,
    ) -> Self {
        Self {
            exclude_data,
            exclude_link,
            javascript,
            budget,
        }
    }

    /// Extracts the record and child links of a fetched page
    ///
    /// `url` is the canonical URL the page was requested under. The record is
    /// keyed on it rather than on the transport's final URL, so add and delete
    /// records of the same page share a reference. `result` must carry
    /// content. A missing body is treated as empty.
    pub async fn extract(
        &self,
        url: &str,
        result: &FetchResult,
        fetcher: &dyn Fetcher,
        depth: u32,
    ) -> Extraction {
        let mut content = result.content.clone().unwrap_or_default();

        let is_html = result
            .header("Content-Type")
            .map(|value| value.contains("html"))
            .unwrap_or(false);

        let links = if is_html {
            let body = if self.javascript {
                match fetcher.rendered_source(&result.url).await {
                    Ok(source) => {
                        content = source.clone().into_bytes();
                        source
                    }
                    Err(e) => {
                        tracing::warn!(url = %result.url, error = %e, "Rendering failed, using raw body");
                        String::from_utf8_lossy(&content).into_owned()
                    }
                }
            } else {
                String::from_utf8_lossy(&content).into_owned()
            };

            Some(self.classify_links(&body, &result.root_url))
        } else {
            None
        };

        let excluded = self.exclude_data.matches_any(url);

        let children = match &links {
            Some(links) if !excluded && self.budget.allows_children(depth) => links.children.clone(),
            _ => Vec::new(),
        };

        let (child_pages, external_pages) = match links {
            Some(links) => (Some(links.children), Some(links.external)),
            None => (None, None),
        };

        let record = CrawlRecord {
            reference: reference_for(url),
            url: url.to_string(),
            root_url: result.root_url.clone(),
            content,
            headers: result.headers.clone(),
            epoch_second: Utc::now().timestamp(),
            uuid: Uuid::new_v4(),
            status: RECORD_STATUS,
            child_pages,
            external_pages,
        };

        Extraction {
            record,
            children,
            excluded,
        }
    }

    /// Splits every href of `html` into same-site children and external links
    fn classify_links(&self, html: &str, root_url: &str) -> PageLinks {
        let site = simplified_host(root_url);
        let same_site = [format!("{}{}", HTTP, site), format!("{}{}", HTTPS, site)];
        let is_same_site = |href: &str| same_site.iter().any(|prefix| href.starts_with(prefix.as_str()));

        let mut children = BTreeSet::new();
        let mut external = BTreeSet::new();

        for href in collect_hrefs(html) {
            let is_web = href.starts_with(HTTP) || href.starts_with(HTTPS);

            if is_web && !is_same_site(&href) {
                external.insert(href);
                continue;
            }

            let relative = !has_scheme(&href)
                && !href.starts_with("mailto")
                && !href.starts_with("javascript")
                && !href.ends_with(".css")
                && !href.ends_with(".js");

            let followable = (relative || is_same_site(&href))
                && href != "/"
                && !href.starts_with("//")
                && !self.exclude_link.matches_any(&href);

            if followable {
                children.insert(href);
            }
        }

        PageLinks {
            children: children.into_iter().collect(),
            external: external.into_iter().collect(),
        }
    }
}

/// Collects the `href` of every element that has one
///
/// Empty and fragment-only hrefs point back at the page itself and are
/// skipped.
fn collect_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let selector = match Selector::parse("[href]") {
        Ok(selector) => selector,
        Err(e) => {
            tracing::error!("Invalid href selector: {:?}", e);
            return Vec::new();
        }
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchError;
    use async_trait::async_trait;

    const ROOT: &str = "https://example.com/";

    /// Transport stub that only knows how to render
    struct RenderingFetcher {
        source: Option<String>,
    }

    #[async_trait]
    impl Fetcher for RenderingFetcher {
        async fn fetch(&self, url: &str, root_url: &str) -> FetchResult {
            FetchResult::failed(url, root_url, 0, "not used")
        }

        async fn rendered_source(&self, url: &str) -> Result<String, FetchError> {
            self.source.clone().ok_or_else(|| FetchError::Render {
                url: url.to_string(),
                message: "browser gone".to_string(),
            })
        }
    }

    fn no_render() -> RenderingFetcher {
        RenderingFetcher { source: None }
    }

    fn extractor(exclude_data: &[&str], exclude_link: &[&str], max_depth: u32) -> Extractor {
        Extractor::new(
            PatternSet::new(exclude_data).unwrap(),
            PatternSet::new(exclude_link).unwrap(),
            false,
            Arc::new(Budget::new(max_depth, 0)),
        )
    }

    fn html_page(url: &str, body: &str) -> FetchResult {
        FetchResult::ok(url, ROOT, 200, body.as_bytes().to_vec())
            .with_header("Content-Type", "text/html; charset=utf-8")
    }

    #[tokio::test]
    async fn test_record_fields() {
        let result = html_page("https://example.com/page", "<html></html>")
            .with_header("X-Served-By", "cache-1");

        let extraction = extractor(&[], &[], 0).extract(&result.url, &result, &no_render(), 0).await;
        let record = extraction.record;

        assert_eq!(record.reference, reference_for("https://example.com/page"));
        assert_eq!(record.url, "https://example.com/page");
        assert_eq!(record.root_url, ROOT);
        assert_eq!(record.status, 200);
        assert_eq!(record.content, b"<html></html>".to_vec());
        assert_eq!(record.headers["X-Served-By"], vec!["cache-1"]);
        assert!(record.epoch_second > 0);
        assert!(!extraction.excluded);
    }

    #[tokio::test]
    async fn test_record_keyed_on_requested_url() {
        // The transport followed a redirect and re-encoded the path
        let result = html_page("https://example.com/new%20page", "<html></html>");

        let extraction = extractor(&[".*/new%20page"], &[], 0)
            .extract("https://example.com/old page", &result, &no_render(), 0)
            .await;

        assert_eq!(extraction.record.url, "https://example.com/old page");
        assert_eq!(
            extraction.record.reference,
            reference_for("https://example.com/old page")
        );
        assert!(!extraction.excluded);
    }

    #[tokio::test]
    async fn test_child_and_external_links() {
        let body = r##"
            <html><body>
                <a href="/about">About</a>
                <a href="docs/intro">Intro</a>
                <a href="https://example.com/contact">Contact</a>
                <a href="https://other.org/">Other</a>
                <a href="http://other.org/x">Other again</a>
                <link rel="stylesheet" href="style.css">
                <a href="app.js">Script</a>
                <a href="mailto:team@example.com">Mail</a>
                <a href="javascript:void(0)">Noop</a>
                <a href="/">Home</a>
                <a href="//cdn.example.com/lib">CDN</a>
                <a href="#top">Top</a>
                <a href="">Empty</a>
                <a href="/about">About again</a>
            </body></html>
        "##;

        let extraction = extractor(&[], &[], 0)
            .extract(ROOT, &html_page(ROOT, body), &no_render(), 0)
            .await;

        assert_eq!(
            extraction.children,
            vec!["/about", "docs/intro", "https://example.com/contact"]
        );
        assert_eq!(
            extraction.record.external_pages,
            Some(vec![
                "http://other.org/x".to_string(),
                "https://other.org/".to_string()
            ])
        );
        assert_eq!(
            extraction.record.child_pages.as_deref(),
            Some(extraction.children.as_slice())
        );
    }

    #[tokio::test]
    async fn test_same_site_uses_simplified_host() {
        let root = "https://example.com/blog/index";
        let body = r#"
            <a href="https://example.com/blog/post-1">Post</a>
            <a href="https://example.com/shop/item">Shop</a>
        "#;
        let result = FetchResult::ok(root, root, 200, body.as_bytes().to_vec())
            .with_header("content-type", "text/html");

        let extraction = extractor(&[], &[], 0).extract(&result.url, &result, &no_render(), 0).await;

        assert_eq!(extraction.children, vec!["https://example.com/blog/post-1"]);
        assert_eq!(
            extraction.record.external_pages,
            Some(vec!["https://example.com/shop/item".to_string()])
        );
    }

    #[tokio::test]
    async fn test_link_exclusion() {
        let body = r#"
            <a href="/admin/users">Admin</a>
            <a href="/files/report.pdf">Report</a>
            <a href="/news">News</a>
        "#;

        let extraction = extractor(&[], &["/admin.*", r".*\.pdf"], 0)
            .extract(ROOT, &html_page(ROOT, body), &no_render(), 0)
            .await;

        assert_eq!(extraction.children, vec!["/news"]);
    }

    #[tokio::test]
    async fn test_excluded_page_returns_no_children() {
        let body = r#"<a href="/next">Next</a>"#;
        let result = html_page("https://example.com/private/page", body);

        let extraction = extractor(&[".*/private/.*"], &[], 0)
            .extract(&result.url, &result, &no_render(), 0)
            .await;

        assert!(extraction.excluded);
        assert!(extraction.children.is_empty());
        // The record still lists the links it found
        assert_eq!(extraction.record.child_pages, Some(vec!["/next".to_string()]));
    }

    #[tokio::test]
    async fn test_depth_gate() {
        let body = r#"<a href="/next">Next</a>"#;
        let extractor = extractor(&[], &[], 1);

        let at_seed = extractor.extract(ROOT, &html_page(ROOT, body), &no_render(), 0).await;
        assert_eq!(at_seed.children, vec!["/next"]);

        let at_limit = extractor.extract(ROOT, &html_page(ROOT, body), &no_render(), 1).await;
        assert!(at_limit.children.is_empty());
        assert_eq!(at_limit.record.child_pages, Some(vec!["/next".to_string()]));
    }

    #[tokio::test]
    async fn test_non_html_has_no_links() {
        let result = FetchResult::ok("https://example.com/data.json", ROOT, 200, br#"{"href": "/x"}"#.to_vec())
            .with_header("Content-Type", "application/json");

        let extraction = extractor(&[], &[], 0).extract(&result.url, &result, &no_render(), 0).await;

        assert!(extraction.children.is_empty());
        assert!(extraction.record.child_pages.is_none());
        assert!(extraction.record.external_pages.is_none());
    }

    #[tokio::test]
    async fn test_missing_content_type_is_not_html() {
        let result = FetchResult::ok(ROOT, ROOT, 200, br#"<a href="/x">x</a>"#.to_vec());
        let extraction = extractor(&[], &[], 0).extract(&result.url, &result, &no_render(), 0).await;
        assert!(extraction.record.child_pages.is_none());
    }

    #[tokio::test]
    async fn test_rendered_source_replaces_content() {
        let fetcher = RenderingFetcher {
            source: Some(r#"<a href="/rendered">Rendered</a>"#.to_string()),
        };
        let extractor = Extractor::new(
            PatternSet::default(),
            PatternSet::default(),
            true,
            Arc::new(Budget::new(0, 0)),
        );

        let result = html_page(ROOT, r#"<a href="/raw">Raw</a>"#);
        let extraction = extractor.extract(ROOT, &result, &fetcher, 0).await;

        assert_eq!(extraction.children, vec!["/rendered"]);
        assert_eq!(
            extraction.record.content,
            br#"<a href="/rendered">Rendered</a>"#.to_vec()
        );
    }

    #[tokio::test]
    async fn test_render_failure_falls_back_to_body() {
        let extractor = Extractor::new(
            PatternSet::default(),
            PatternSet::default(),
            true,
            Arc::new(Budget::new(0, 0)),
        );

        let result = html_page(ROOT, r#"<a href="/raw">Raw</a>"#);
        let extraction = extractor.extract(&result.url, &result, &no_render(), 0).await;

        assert_eq!(extraction.children, vec!["/raw"]);
        assert_eq!(extraction.record.content, br#"<a href="/raw">Raw</a>"#.to_vec());
    }

    #[test]
    fn test_collect_hrefs_skips_empty_and_fragments() {
        let hrefs = collect_hrefs(r##"<a href=" /a ">A</a><a href="#x">X</a><a href="">E</a><area href="/b">"##);
        assert_eq!(hrefs, vec!["/a", "/b"]);
    }
}

//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, including reconciliation across runs.

use std::sync::Arc;
use tempfile::TempDir;
use web_fetcher::config::{TransportConfig, UserAgentConfig};
use web_fetcher::crawler::{run_crawl, HttpFetcher, RunSettings};
use web_fetcher::output::{CollectingSink, RunSummary};
use web_fetcher::storage::{run_id_for, JsonRunStateStore, RunStateStore};
use web_fetcher::url::reference_for;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AGENT: &str = "TestFetcher/1.0";

fn seed(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

fn page_url(server: &MockServer, page: &str) -> String {
    format!("{}{}", server.uri(), page)
}

fn html(body: &str) -> ResponseTemplate {
    // set_body_string would force text/plain over any content-type header
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

fn links(paths: &[&str]) -> String {
    paths
        .iter()
        .map(|p| format!(r#"<a href="{}">{}</a>"#, p, p))
        .collect()
}

/// Mounts an HTML page at `page` linking to `children`
async fn mount_page(server: &MockServer, page: &str, children: &[&str]) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(&links(children)))
        .mount(server)
        .await;
}

/// Mounts a page that must be fetched exactly `times` times
async fn mount_counted_page(server: &MockServer, page: &str, children: &[&str], times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(&links(children)))
        .expect(times)
        .mount(server)
        .await;
}

fn settings(server: &MockServer) -> RunSettings {
    RunSettings {
        read_robots: false,
        threads: 4,
        user_agent: AGENT.to_string(),
        thread_id: "test".to_string(),
        ..RunSettings::new(&seed(server))
    }
}

fn fetcher() -> Arc<HttpFetcher> {
    let user_agent = UserAgentConfig {
        crawler_user_agent: AGENT.to_string(),
        crawler_referer: None,
    };
    let transport = TransportConfig {
        timeout_ms: 5_000,
        ..TransportConfig::default()
    };
    Arc::new(HttpFetcher::new(&user_agent, &transport).expect("Failed to build fetcher"))
}

async fn crawl(settings: RunSettings) -> (RunSummary, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let summary = run_crawl(settings, fetcher(), sink.clone())
        .await
        .expect("Crawl failed");
    (summary, sink)
}

fn sorted(mut urls: Vec<String>) -> Vec<String> {
    urls.sort();
    urls
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let external = "https://elsewhere.example.org/";

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"{}<a href="{}">Elsewhere</a>"#,
            links(&["/page1", "page2"]),
            external
        )))
        .mount(&server)
        .await;
    mount_page(&server, "/page1", &[]).await;
    mount_page(&server, "/page2", &[]).await;

    let (summary, sink) = crawl(settings(&server)).await;

    assert_eq!(
        sorted(sink.added_urls()),
        vec![
            seed(&server),
            page_url(&server, "/page1"),
            page_url(&server, "/page2"),
        ]
    );
    assert_eq!(summary.emitted, 3);
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.deleted, 0);

    let records = sink.records();
    let home = records
        .iter()
        .filter_map(|r| r.as_add())
        .find(|r| r.url == seed(&server))
        .expect("Seed page not emitted");

    assert_eq!(home.reference, reference_for(&seed(&server)));
    assert_eq!(home.root_url, seed(&server));
    assert_eq!(home.status, 200);
    assert_eq!(
        home.child_pages,
        Some(vec!["/page1".to_string(), "page2".to_string()])
    );
    assert_eq!(home.external_pages, Some(vec![external.to_string()]));
    assert!(home
        .headers
        .get("content-type")
        .is_some_and(|v| v[0].contains("text/html")));
}

#[tokio::test]
async fn test_cycle_is_fetched_once() {
    let server = MockServer::start().await;

    mount_counted_page(&server, "/", &["/a"], 1).await;
    mount_counted_page(&server, "/a", &["/b", "/"], 1).await;
    mount_counted_page(&server, "/b", &["/a", "b"], 1).await;

    let (summary, sink) = crawl(settings(&server)).await;

    assert_eq!(summary.emitted, 3);
    assert_eq!(summary.visited, 3);
    assert_eq!(sink.added_urls().len(), 3);
    // Expectations are verified when the server drops
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let server = MockServer::start().await;

    mount_page(&server, "/", &["/level1"]).await;
    mount_page(&server, "/level1", &["/level2"]).await;
    mount_counted_page(&server, "/level2", &[], 0).await;

    let run = RunSettings {
        max_depth: 1,
        ..settings(&server)
    };
    let (_, sink) = crawl(run).await;

    assert_eq!(
        sorted(sink.added_urls()),
        vec![seed(&server), page_url(&server, "/level1")]
    );

    // The page at the depth limit still lists its links
    let records = sink.records();
    let level1 = records
        .iter()
        .filter_map(|r| r.as_add())
        .find(|r| r.url.ends_with("/level1"))
        .expect("Depth-1 page not emitted");
    assert_eq!(level1.child_pages, Some(vec!["/level2".to_string()]));
}

#[tokio::test]
async fn test_page_budget() {
    let server = MockServer::start().await;

    let leaves: Vec<String> = (0..50).map(|i| format!("/leaf-{}", i)).collect();
    let leaf_refs: Vec<&str> = leaves.iter().map(String::as_str).collect();
    mount_page(&server, "/", &leaf_refs).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/leaf-\d+$"))
        .respond_with(html(""))
        .mount(&server)
        .await;

    let run = RunSettings {
        max_pages: 2,
        ..settings(&server)
    };
    let (summary, sink) = crawl(run).await;

    assert_eq!(sink.added_urls().len(), 2);
    assert_eq!(summary.emitted, 2);
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nDisallow: /private\n\nUser-agent: {}\nDisallow: /bots-only\n",
            AGENT
        )))
        .expect(1)
        .mount(&server)
        .await;

    mount_page(&server, "/", &["/public", "/private/page", "/bots-only"]).await;
    mount_page(&server, "/public", &[]).await;
    mount_counted_page(&server, "/private/page", &[], 0).await;
    mount_counted_page(&server, "/bots-only", &[], 0).await;

    let run = RunSettings {
        read_robots: true,
        ..settings(&server)
    };
    let (summary, sink) = crawl(run).await;

    assert_eq!(
        sorted(sink.added_urls()),
        vec![seed(&server), page_url(&server, "/public")]
    );
    assert_eq!(summary.robots_denied, 2);
}

#[tokio::test]
async fn test_missing_robots_txt_allows_everything() {
    let server = MockServer::start().await;

    // No robots.txt mounted: the server answers 404
    mount_page(&server, "/", &["/private"]).await;
    mount_page(&server, "/private", &[]).await;

    let run = RunSettings {
        read_robots: true,
        ..settings(&server)
    };
    let (_, sink) = crawl(run).await;

    assert_eq!(sink.added_urls().len(), 2);
}

#[tokio::test]
async fn test_content_and_link_exclusion() {
    let server = MockServer::start().await;

    mount_page(&server, "/", &["/drafts/one", "/docs", "/admin/panel"]).await;
    mount_page(&server, "/docs", &[]).await;
    // Excluded from output, and its links are not followed
    mount_counted_page(&server, "/drafts/one", &["/drafts-child"], 1).await;
    mount_counted_page(&server, "/drafts-child", &[], 0).await;
    mount_counted_page(&server, "/admin/panel", &[], 0).await;

    let run = RunSettings {
        exclude_data: vec![".*/drafts/.*".to_string()],
        exclude_link: vec!["/admin.*".to_string()],
        ..settings(&server)
    };
    let (summary, sink) = crawl(run).await;

    assert_eq!(
        sorted(sink.added_urls()),
        vec![seed(&server), page_url(&server, "/docs")]
    );
    assert_eq!(summary.excluded, 1);
}

#[tokio::test]
async fn test_failed_pages_are_skipped() {
    let server = MockServer::start().await;

    mount_page(&server, "/", &["/broken", "/missing", "/fine"]).await;
    mount_page(&server, "/fine", &[]).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (summary, sink) = crawl(settings(&server)).await;

    assert_eq!(
        sorted(sink.added_urls()),
        vec![seed(&server), page_url(&server, "/fine")]
    );
    assert_eq!(summary.fetch_failures, 2);
    // Failed URLs still count as visited
    assert_eq!(summary.visited, 4);
}

#[tokio::test]
async fn test_requests_carry_identity_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", AGENT))
        .respond_with(html(&links(&["/next"])))
        .expect(1)
        .mount(&server)
        .await;

    // Referer defaults to the crawl root
    Mock::given(method("GET"))
        .and(path("/next"))
        .and(header("referer", seed(&server).as_str()))
        .respond_with(html(""))
        .expect(1)
        .mount(&server)
        .await;

    let (_, sink) = crawl(settings(&server)).await;
    assert_eq!(sink.added_urls().len(), 2);
}

#[tokio::test]
async fn test_reconciliation_across_runs() {
    let server = MockServer::start().await;
    let data = TempDir::new().unwrap();
    let run = RunSettings {
        data_folder: Some(data.path().to_path_buf()),
        ..settings(&server)
    };

    mount_page(&server, "/", &["/u1", "/u2", "/u3"]).await;
    mount_page(&server, "/u1", &[]).await;
    mount_page(&server, "/u2", &[]).await;
    mount_page(&server, "/u3", &[]).await;

    let (first, first_sink) = crawl(run.clone()).await;
    assert_eq!(first.deleted, 0);
    assert!(first_sink.deleted_references().is_empty());

    // u2 disappears from the site
    server.reset().await;
    mount_page(&server, "/", &["/u1", "/u3"]).await;
    mount_page(&server, "/u1", &[]).await;
    mount_page(&server, "/u3", &[]).await;

    let (second, second_sink) = crawl(run.clone()).await;
    assert_eq!(second.deleted, 1);
    assert_eq!(
        second_sink.deleted_references(),
        vec![reference_for(&page_url(&server, "/u2"))]
    );

    // A superset of the previous run deletes nothing
    server.reset().await;
    mount_page(&server, "/", &["/u1", "/u3", "/u4"]).await;
    mount_page(&server, "/u1", &[]).await;
    mount_page(&server, "/u3", &[]).await;
    mount_page(&server, "/u4", &[]).await;

    let (third, third_sink) = crawl(run).await;
    assert_eq!(third.deleted, 0);
    assert!(third_sink.deleted_references().is_empty());
}

#[tokio::test]
async fn test_deletions_match_added_references() {
    let server = MockServer::start().await;
    let data = TempDir::new().unwrap();
    let run = RunSettings {
        data_folder: Some(data.path().to_path_buf()),
        ..settings(&server)
    };

    mount_page(&server, "/", &["/old", "/a b", "/new"]).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/new", &[]).await;
    mount_page(&server, "/a%20b", &[]).await;

    let (_, first_sink) = crawl(run.clone()).await;

    // The redirect target is emitted once, under whichever URL reached it first
    let added = first_sink.added_urls();
    assert_eq!(added.len(), 3);
    assert!(added.contains(&page_url(&server, "/a b")));
    let added_references: Vec<String> = first_sink
        .records()
        .iter()
        .filter_map(|r| r.as_add())
        .filter(|r| r.url != seed(&server))
        .map(|r| r.reference.clone())
        .collect();

    // Every page but the seed disappears
    server.reset().await;
    mount_page(&server, "/", &[]).await;

    let (second, second_sink) = crawl(run).await;

    let deleted = second_sink.deleted_references();
    for reference in &added_references {
        assert!(
            deleted.contains(reference),
            "No delete record for added reference {}",
            reference
        );
    }
    assert_eq!(second.deleted, deleted.len() as u64);
}

#[tokio::test]
async fn test_unsaved_run_causes_no_spurious_deletions() {
    let server = MockServer::start().await;
    let data = TempDir::new().unwrap();
    let persisted = RunSettings {
        data_folder: Some(data.path().to_path_buf()),
        ..settings(&server)
    };

    mount_page(&server, "/", &["/a", "/b"]).await;
    mount_page(&server, "/a", &[]).await;
    mount_page(&server, "/b", &[]).await;

    crawl(persisted.clone()).await;

    // A run that emits records but never saves its state, as if the process
    // stopped before reconciliation
    let unsaved = RunSettings {
        data_folder: None,
        ..persisted.clone()
    };
    let (_, unsaved_sink) = crawl(unsaved).await;
    assert_eq!(unsaved_sink.added_urls().len(), 3);

    // The next complete run diffs against the last saved state
    let (summary, sink) = crawl(persisted).await;
    assert_eq!(summary.deleted, 0);
    assert!(sink.deleted_references().is_empty());
}

#[tokio::test]
async fn test_corrupt_state_skips_deletions() {
    let server = MockServer::start().await;
    let data = TempDir::new().unwrap();
    let run = RunSettings {
        data_folder: Some(data.path().to_path_buf()),
        ..settings(&server)
    };

    let store = JsonRunStateStore::new(data.path());
    let run_id = run_id_for(&seed(&server));
    std::fs::create_dir_all(store.path_for(&run_id).parent().unwrap()).unwrap();
    std::fs::write(store.path_for(&run_id), "[\"http://truncated").unwrap();

    mount_page(&server, "/", &["/a"]).await;
    mount_page(&server, "/a", &[]).await;

    let (summary, sink) = crawl(run).await;
    assert_eq!(summary.deleted, 0);
    assert!(sink.deleted_references().is_empty());
    assert_eq!(sink.added_urls().len(), 2);

    // The corrupt file was replaced by this run's state
    let saved = store.load(&run_id).unwrap().expect("State not saved");
    assert_eq!(
        sorted(saved),
        vec![seed(&server), page_url(&server, "/a")]
    );
}

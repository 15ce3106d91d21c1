//! Page fetching
//!
//! This module defines the fetch capability the crawler consumes, including:
//! - The `Fetcher` trait, so the transport can be swapped or mocked
//! - The `FetchResult` shape every transport returns
//! - `HttpFetcher`, the reqwest-based transport used by the CLI

use crate::config::{TransportConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::{Client, Proxy};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a fetch transport outside of `FetchResult`
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("JavaScript rendering is not supported by this transport ({0})")]
    RenderingUnsupported(String),

    #[error("Failed to render {url}: {message}")]
    Render { url: String, message: String },

    #[error("Invalid proxy {proxy}: {source}")]
    Proxy {
        proxy: String,
        source: reqwest::Error,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result of fetching one URL
///
/// `content` is `None` when the fetch failed, either because of a network
/// error or a non-2xx response. `message` then describes the failure.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// Response body
    pub content: Option<Vec<u8>>,

    /// Response headers, each name mapped to its values in arrival order
    pub headers: BTreeMap<String, Vec<String>>,

    /// HTTP status code, 0 if no response was received
    pub status_code: u16,

    /// URL the content was finally served from
    pub url: String,

    /// Root URL of the crawl this fetch belongs to
    pub root_url: String,

    /// Human-readable status or error description
    pub message: String,
}

impl FetchResult {
    /// A successful fetch carrying `content`
    pub fn ok(url: &str, root_url: &str, status_code: u16, content: Vec<u8>) -> Self {
        Self {
            content: Some(content),
            status_code,
            url: url.to_string(),
            root_url: root_url.to_string(),
            message: "OK".to_string(),
            ..Self::default()
        }
    }

    /// A failed fetch without content
    pub fn failed(url: &str, root_url: &str, status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            url: url.to_string(),
            root_url: root_url.to_string(),
            message: message.to_string(),
            ..Self::default()
        }
    }

    /// Adds a header value, keeping earlier values for the same name
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Returns the first value of a header, matching the name case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Returns true if the fetch produced content
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

/// Capability to fetch pages, implemented by the host environment
///
/// One fetcher is shared read-only by every task of a run and closed once
/// when the run ends.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`; `root_url` is the root of the crawl it belongs to
    async fn fetch(&self, url: &str, root_url: &str) -> FetchResult;

    /// Returns the DOM source of `url` after JavaScript has run
    async fn rendered_source(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::RenderingUnsupported(url.to_string()))
    }

    /// Releases transport resources
    async fn close(&self) {}
}

/// Builds an HTTP client with the crawler's identity and transport settings
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `transport` - Timeout, proxy and TLS settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(FetchError)` - The proxy URL or TLS setup was rejected
///
/// # Example
///
/// ```no_run
/// use web_fetcher::config::{TransportConfig, UserAgentConfig};
/// use web_fetcher::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_user_agent: "web-fetcher/1.0".to_string(),
///     crawler_referer: None,
/// };
///
/// let client = build_http_client(&user_agent, &TransportConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    transport: &TransportConfig,
) -> Result<Client, FetchError> {
    let mut builder = Client::builder()
        .user_agent(user_agent.crawler_user_agent.clone())
        .timeout(Duration::from_millis(transport.timeout_ms))
        .connect_timeout(Duration::from_millis(transport.timeout_ms.min(10_000)))
        .danger_accept_invalid_certs(!transport.ssl_check)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = transport.proxy.as_deref().filter(|p| !p.is_empty()) {
        let proxy_config = Proxy::all(proxy).map_err(|source| FetchError::Proxy {
            proxy: proxy.to_string(),
            source,
        })?;
        builder = builder.proxy(proxy_config);
    }

    Ok(builder.build()?)
}

/// reqwest-backed transport
pub struct HttpFetcher {
    client: Client,
    referer: Option<String>,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration
    pub fn new(
        user_agent: &UserAgentConfig,
        transport: &TransportConfig,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(user_agent, transport)?,
            referer: user_agent
                .crawler_referer
                .clone()
                .filter(|r| !r.is_empty()),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, root_url: &str) -> FetchResult {
        let referer = self.referer.as_deref().unwrap_or(root_url);

        let response = match self.client.get(url).header(REFERER, referer).send().await {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    format!("Connection failed: {}", e)
                } else {
                    e.to_string()
                };
                return FetchResult::failed(url, root_url, 0, &message);
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let message = status
            .canonical_reason()
            .unwrap_or("Unknown status")
            .to_string();

        if !status.is_success() {
            return FetchResult {
                headers,
                ..FetchResult::failed(&final_url, root_url, status.as_u16(), &message)
            };
        }

        match response.bytes().await {
            Ok(body) => FetchResult {
                headers,
                message,
                ..FetchResult::ok(&final_url, root_url, status.as_u16(), body.to_vec())
            },
            Err(e) => FetchResult {
                headers,
                ..FetchResult::failed(&final_url, root_url, status.as_u16(), &e.to_string())
            },
        }
    }

    async fn close(&self) {
        tracing::debug!("Closing HTTP transport");
    }
}

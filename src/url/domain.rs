use url::Url;

/// Reduces a URL to the part used to decide whether a link is "same site"
///
/// The result is the host, plus `:port` when the URL names a port explicitly,
/// plus `/<first segment>` when the path has more than one segment. A crawl
/// rooted at `https://example.com/docs/index.html` therefore treats everything
/// under `example.com/docs` as its own site.
///
/// Malformed input is returned unchanged.
///
/// # Examples
///
/// ```
/// use web_fetcher::url::simplified_host;
///
/// assert_eq!(simplified_host("https://example.com/"), "example.com");
/// assert_eq!(simplified_host("https://example.com/docs/index.html"), "example.com/docs");
/// assert_eq!(simplified_host("http://localhost:8080/"), "localhost:8080");
/// ```
pub fn simplified_host(url_str: &str) -> String {
    let url = match Url::parse(url_str) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(url = %url_str, error = %e, "Cannot simplify malformed URL");
            return url_str.to_string();
        }
    };

    let mut simplified = url.host_str().unwrap_or_default().to_lowercase();

    if let Some(port) = url.port() {
        simplified.push(':');
        simplified.push_str(&port.to_string());
    }

    let segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 {
        simplified.push('/');
        simplified.push_str(segments[0]);
    }

    simplified
}

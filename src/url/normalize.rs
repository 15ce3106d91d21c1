use crate::UrlError;
use url::Url;

/// Returns true if `link` begins with a URL scheme such as `http:` or `mailto:`
///
/// A scheme is an ASCII letter followed by letters, digits, `+`, `-` or `.`,
/// terminated by a colon.
pub fn has_scheme(link: &str) -> bool {
    let Some((scheme, _)) = link.split_once(':') else {
        return false;
    };

    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resolves a possibly-relative link against the root URL of a crawl
///
/// # Resolution Rules
///
/// 1. A link with a scheme is already absolute and is used as-is
/// 2. A root-relative link (`/path`) is appended to the root when the root
///    has no path, otherwise to the root's `scheme://host[:port]`
/// 3. A bare relative link (`path`) is appended to the root with a separating
///    `/` when the root has no path, otherwise it replaces everything after the
///    last `/` of the root
/// 4. Anything still lacking a scheme is concatenated onto the root
/// 5. One trailing `/` is trimmed unless the result is the root itself
///
/// # Arguments
///
/// * `link` - The href or URL to resolve
/// * `root_url` - The root URL of the crawl
///
/// # Returns
///
/// * `Ok(String)` - The absolute, canonical URL
/// * `Err(UrlError)` - The root URL could not be parsed
///
/// # Examples
///
/// ```
/// use web_fetcher::url::resolve;
///
/// let url = resolve("/about/", "https://example.com").unwrap();
/// assert_eq!(url, "https://example.com/about");
///
/// let url = resolve("team", "https://example.com/about/index.html").unwrap();
/// assert_eq!(url, "https://example.com/about/team");
/// ```
pub fn resolve(link: &str, root_url: &str) -> Result<String, UrlError> {
    let link = link.trim();
    let root_url = root_url.trim();

    let mut resolved = if has_scheme(link) {
        link.to_string()
    } else if link.starts_with('/') {
        let root = parse_root(root_url)?;

        if has_root_path(&root) {
            format!("{}{}", root_url.trim_end_matches('/'), link)
        } else {
            format!("{}{}", origin(&root), link)
        }
    } else {
        let root = parse_root(root_url)?;

        if has_root_path(&root) {
            format!("{}/{}", root_url.trim_end_matches('/'), link)
        } else {
            match root_url.rfind('/') {
                Some(index) => format!("{}{}", &root_url[..=index], link),
                None => format!("{}/{}", root_url, link),
            }
        }
    };

    if !has_scheme(&resolved) {
        resolved = format!("{}{}", root_url, link);
    }

    if resolved.ends_with('/') && resolved != root_url {
        resolved.pop();
    }

    Ok(resolved)
}

fn parse_root(root_url: &str) -> Result<Url, UrlError> {
    Url::parse(root_url).map_err(|e| UrlError::Parse(format!("{}: {}", root_url, e)))
}

/// True when the URL path carries no information beyond the root
fn has_root_path(url: &Url) -> bool {
    let path = url.path();
    path.is_empty() || path == "/"
}

/// Renders `scheme://host[:port]` for a URL
fn origin(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

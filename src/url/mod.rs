//! URL handling module
//!
//! This module resolves discovered links against the crawl root, reduces URLs
//! to the "simplified host" used for same-site checks, and matches URLs against
//! user-supplied exclusion patterns.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::simplified_host;
pub use matcher::PatternSet;
pub use normalize::{has_scheme, resolve};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Derives the stable reference for a URL
///
/// The same URL always maps to the same reference, across runs, so a sink can
/// correlate an earlier add record with a later delete record.
///
/// # Examples
///
/// ```
/// use web_fetcher::url::reference_for;
///
/// assert_eq!(reference_for("http://x"), "aHR0cDovL3g=");
/// ```
pub fn reference_for(url: &str) -> String {
    STANDARD.encode(url.as_bytes())
}

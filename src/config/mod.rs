//! Configuration module for web-fetcher
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use web_fetcher::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("fetcher.toml")).unwrap();
//! println!("Worker pool size: {}", config.crawler.threads);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, SiteEntry, TransportConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

use crate::config::types::{Config, CrawlerConfig, SiteEntry, TransportConfig, UserAgentConfig};
use crate::url::PatternSet;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_transport_config(&config.transport)?;
    validate_sites(&config.site)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth and max_pages use 0 for "unlimited", so every value is valid

    if config.threads < 1 || config.threads > 100 {
        return Err(ConfigError::Validation(format!(
            "threads must be between 1 and 100, got {}",
            config.threads
        )));
    }

    validate_patterns("exclude-data", &config.exclude_data)?;
    validate_patterns("exclude-link", &config.exclude_link)?;

    Ok(())
}

/// Validates that every exclusion pattern compiles
fn validate_patterns(name: &str, patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        PatternSet::new(std::slice::from_ref(pattern)).map_err(|e| {
            ConfigError::InvalidPattern(format!("{} pattern '{}': {}", name, pattern, e))
        })?;
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(referer) = config.crawler_referer.as_deref().filter(|r| !r.is_empty()) {
        Url::parse(referer)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid crawler_referer: {}", e)))?;
    }

    Ok(())
}

/// Validates transport configuration
fn validate_transport_config(config: &TransportConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout_ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }

    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    Ok(())
}

/// Validates site entries
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    for site in sites {
        validate_seed_url(&site.url)?;

        if let Some(thread_id) = &site.thread_id {
            if thread_id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "thread-id for '{}' cannot be empty",
                    site.url
                )));
            }
        }
    }

    Ok(())
}

/// Validates a seed URL: must parse, use HTTP(S), and name a host
fn validate_seed_url(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

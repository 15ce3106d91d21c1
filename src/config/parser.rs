use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Parses and validates configuration text
///
/// # Example
///
/// ```
/// use web_fetcher::config::parse_config;
///
/// let config = parse_config(
///     "[crawler]\nthreads = 2\n\n[user-agent]\ncrawler-user-agent = \"Fetcher/1.0\"\n",
/// )
/// .unwrap();
/// assert_eq!(config.crawler.threads, 2);
/// ```
pub fn parse_config(text: &str) -> Result<Config, ConfigError> {
    let config = toml::from_str::<Config>(text)?;
    validate(&config)?;
    Ok(config)
}

/// Reads, parses and validates the configuration file at `path`
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use web_fetcher::config::load_config;
///
/// let config = load_config(Path::new("fetcher.toml")).unwrap();
/// println!("Sites: {}", config.site.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Hex SHA-256 of the configuration file at `path`
///
/// Logged at startup so runs can be matched to the configuration that drove them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(digest(&std::fs::read(path)?))
}

/// Loads the configuration at `path` together with its hash
///
/// The file is read once, so the hash always describes the text that was
/// parsed.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    Ok((config, digest(text.as_bytes())))
}

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

//! Configuration management for sitesearch
//!
//! This module handles loading and validating configuration from a TOML file,
//! environment variables and built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::lemma::Alphabet;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sites the crawler and the search engine are restricted to
    #[serde(default)]
    pub sites: Vec<SiteConfig>,

    /// Crawler configuration
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Morphology dictionary configuration
    #[serde(default)]
    pub morphology: MorphologyConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One configured site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Display name
    pub name: String,

    /// Root URL, the crawl entry point
    pub url: String,
}

impl SiteConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Crawler-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// User agent string
    pub user_agent: String,

    /// Referer header sent with every request
    pub referrer: String,

    /// Fixed pause before each fetch, in milliseconds
    pub request_delay_ms: u64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Global request quota per second, 0 disables the limiter
    pub requests_per_second: u32,

    /// Concurrent page workers, 0 means available hardware parallelism
    pub workers: usize,

    /// How long a stop request waits for running tasks to drain
    pub stop_grace_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("SiteSearchBot/{}", env!("CARGO_PKG_VERSION")),
            referrer: String::from("https://www.google.com"),
            request_delay_ms: 100,
            request_timeout_secs: 30,
            requests_per_second: 0,
            workers: 0,
            stop_grace_secs: 5,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/sitesearch.db"),
        }
    }
}

/// Morphology configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    /// Tab-separated dictionary of word forms
    pub dictionary_path: PathBuf,

    /// Letters words are made of
    pub alphabet: Alphabet,

    /// Treat words missing from the dictionary as their own lemma
    pub keep_unknown_words: bool,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            dictionary_path: PathBuf::from("data/morphology.tsv"),
            alphabet: Alphabet::Cyrillic,
            keep_unknown_words: false,
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Snippet length cap in characters
    pub snippet_max_len: usize,

    /// Page size used when a request passes no limit
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            snippet_max_len: 160,
            default_limit: 20,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub bind_address: SocketAddr,

    /// Enable permissive CORS
    pub enable_cors: bool,

    /// Enable request tracing
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `SITESEARCH_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("SITESEARCH_SQLITE_PATH") {
            self.database.sqlite_path = PathBuf::from(path);
        }

        if let Ok(addr) = std::env::var("SITESEARCH_BIND_ADDRESS") {
            self.server.bind_address = addr
                .parse()
                .with_context(|| format!("Invalid SITESEARCH_BIND_ADDRESS: {addr}"))?;
        }

        if let Ok(path) = std::env::var("SITESEARCH_DICTIONARY") {
            self.morphology.dictionary_path = PathBuf::from(path);
        }

        if let Ok(level) = std::env::var("SITESEARCH_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("SITESEARCH_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            anyhow::bail!("at least one site must be configured");
        }

        let mut seen = std::collections::HashSet::new();
        for site in &self.sites {
            let parsed = Url::parse(&site.url)
                .with_context(|| format!("Invalid site URL: {}", site.url))?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
                anyhow::bail!("site URL must be http(s) with a host: {}", site.url);
            }
            if !seen.insert(site.url.as_str()) {
                anyhow::bail!("duplicate site URL: {}", site.url);
            }
        }

        if self.search.snippet_max_len == 0 {
            anyhow::bail!("snippet_max_len must be greater than 0");
        }

        if self.crawler.stop_grace_secs == 0 {
            anyhow::bail!("stop_grace_secs must be greater than 0");
        }

        Ok(())
    }

    /// Find the configured site with exactly this root URL
    pub fn site_by_url(&self, url: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.url == url)
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.request_timeout_secs)
    }

    /// Get the fixed per-fetch delay as Duration
    #[must_use]
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.crawler.request_delay_ms)
    }

    /// Get the stop grace period as Duration
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.crawler.stop_grace_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            crawler: CrawlerConfig::default(),
            database: DatabaseConfig::default(),
            morphology: MorphologyConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

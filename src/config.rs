//! Layered configuration.
//!
//! Values are resolved from, in increasing priority:
//!
//! 1. built-in defaults (the `Default` impls below)
//! 2. an optional TOML file
//! 3. environment variables prefixed with `TANSAKU_`, using `__` for nesting
//!    (`TANSAKU_SERVER__PORT=9117`, `TANSAKU_DMHY__KEYWORD_TTL_SECS=3600`)
//!
//! Origin base URLs are stored base64-encoded. This only keeps the hostnames
//! out of plain-text config listings and is not a security measure.
//!
//! ```toml
//! [server]
//! port = 9117
//!
//! [fetch]
//! max_entries = 200
//!
//! [dmhy]
//! refresh_weekday = "Mon"
//! keyword_ttl_secs = 604800
//! ```

use ::config::{Environment, File};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{TimeDelta, Weekday};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::{
    error::{Error, Result},
    keyword_cache::{DEFAULT_MAX_KEYWORDS, RefreshPolicy},
    net::{CacheConfig, FEED_USER_AGENT, FetchOptions},
};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub dmhy: SourceConfig,
    pub acgrip: SourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            fetch: FetchConfig::default(),
            dmhy: SourceConfig::dmhy(),
            acgrip: SourceConfig::acgrip(),
        }
    }
}

/// HTTP listener settings for the `tansaku-server` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Channel title of generated Torznab feeds
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9117,
            title: "Tansaku".to_string(),
        }
    }
}

/// Shared fetch cache and request settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_entries: usize,
    pub cleanup_ratio: f64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let cache = CacheConfig::default();
        Self {
            max_entries: cache.max_entries,
            cleanup_ratio: cache.cleanup_ratio,
            user_agent: FEED_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.max_entries,
            cleanup_ratio: self.cleanup_ratio,
        }
    }
}

/// Per-origin settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base64-encoded origin base URL
    pub base_url: String,
    /// Keyword cache TTL in seconds; `0` disables keyword caching
    pub keyword_ttl_secs: u64,
    /// Fetch cache duration for this origin's feed bodies, in seconds
    pub fetch_cache_secs: u64,
    /// Day on which keyword entries from other days are refreshed (`"Mon"`)
    pub refresh_weekday: Option<Weekday>,
    /// Most search terms kept in the keyword cache
    pub max_keywords: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::dmhy()
    }
}

impl SourceConfig {
    /// Seven-day keyword TTL with a Monday refresh; 10 minute fetch cache.
    pub fn dmhy() -> Self {
        Self {
            base_url: "aHR0cHM6Ly9zaGFyZS5kbWh5Lm9yZw==".to_string(),
            keyword_ttl_secs: 7 * 24 * 60 * 60,
            fetch_cache_secs: 600,
            refresh_weekday: Some(Weekday::Mon),
            max_keywords: DEFAULT_MAX_KEYWORDS,
        }
    }

    /// No keyword caching; freshness comes from the 30 minute fetch cache.
    pub fn acgrip() -> Self {
        Self {
            base_url: "aHR0cHM6Ly9hY2cucmlw".to_string(),
            keyword_ttl_secs: 0,
            fetch_cache_secs: 30 * 60,
            refresh_weekday: None,
            max_keywords: DEFAULT_MAX_KEYWORDS,
        }
    }

    /// Decodes and validates the base URL, without trailing slash.
    ///
    /// # Errors
    ///
    /// * [`Error::Config`] - not base64, not UTF-8, or not an absolute http(s) URL
    pub fn decoded_base_url(&self) -> Result<String> {
        let bytes = STANDARD
            .decode(self.base_url.trim())
            .map_err(|e| Error::config(format!("base_url is not base64: {}", e)))?;
        let decoded = String::from_utf8(bytes)
            .map_err(|_| Error::config("base_url does not decode to UTF-8"))?;

        let url = Url::parse(&decoded)
            .map_err(|e| Error::config(format!("invalid base_url {}: {}", decoded, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!("unsupported base_url scheme: {}", url.scheme())));
        }

        Ok(decoded.trim_end_matches('/').to_string())
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            ttl: i64::try_from(self.keyword_ttl_secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX),
            refresh_weekday: self.refresh_weekday,
        }
    }

    pub fn fetch_options(&self, user_agent: &str) -> FetchOptions {
        FetchOptions::feed(user_agent, Duration::from_secs(self.fetch_cache_secs))
    }
}

impl Config {
    /// Built-in defaults: DMHY and ACG.RIP with their own policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the configuration layers.
    ///
    /// # Errors
    ///
    /// * [`Error::Config`] - unreadable file, bad value types, or failed validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Self::new())?;
        let mut builder = ::config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::config(format!("config file not found: {}", path.display())));
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("TANSAKU")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and that both base URLs decode.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_entries == 0 {
            return Err(Error::config("fetch.max_entries must be positive"));
        }
        if !(self.fetch.cleanup_ratio > 0.0 && self.fetch.cleanup_ratio <= 1.0) {
            return Err(Error::config("fetch.cleanup_ratio must be in (0, 1]"));
        }
        for (name, source) in [("dmhy", &self.dmhy), ("acgrip", &self.acgrip)] {
            if source.max_keywords == 0 {
                return Err(Error::config(format!("{}.max_keywords must be positive", name)));
            }
            source.decoded_base_url()?;
        }
        Ok(())
    }
}

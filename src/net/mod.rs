//! Network utilities for origin requests, response caching, and content parsing.
//!
//! This module provides the networking infrastructure for Tansaku:
//!
//! - **Transport**: A trait seam over raw HTTP, with a global pooled reqwest client
//!   behind [`HttpTransport`]
//! - **Cached fetching**: [`CachedFetcher`] deduplicates concurrent identical requests
//!   and keeps successful bodies for a per-request duration
//! - **Content parsing**: RSS/XML item extraction ([`xml`]) and HTML-to-text ([`html`])
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tansaku::net::{CacheConfig, CachedFetcher, FetchOptionsBuilder, HttpTransport};
//!
//! # async fn example() -> tansaku::Result<()> {
//! let fetcher = CachedFetcher::new(Arc::new(HttpTransport::new()), CacheConfig::default());
//! let options = FetchOptionsBuilder::default()
//!     .cache_duration(Duration::from_secs(600))
//!     .build()
//!     .unwrap();
//!
//! let body = fetcher.get("https://example.org/rss.xml", &options).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use derive_builder::Builder;
use once_cell::sync::Lazy;
use reqwest::{
    Client, Method,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub mod cache;
pub mod html;
pub mod xml;

pub use cache::{CacheConfig, CachedFetcher, FetchCacheStats};

/// `Accept` header sent to every origin feed endpoint.
pub const FEED_ACCEPT: &str = "application/rss+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.5";

/// `User-Agent` header sent to every origin feed endpoint.
pub const FEED_USER_AGENT: &str = "Mozilla/5.0 (compatible; Tansaku/0.1; +https://github.com/lumisxh/tansaku)";

/// Global HTTP client instance.
///
/// This client is configured with:
/// - 30-second timeout
/// - Connection pooling (10 idle connections per host)
/// - Compression support (gzip, brotli)
///
/// The client is created lazily on first use and reused across all HTTP operations.
static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Tansaku/0.1.0")
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
        .expect("Failed to build HTTP client")
});

/// Per-request options for [`CachedFetcher::get`] and [`Transport::get`].
///
/// Built with the generated [`FetchOptionsBuilder`]:
///
/// ```rust
/// use std::time::Duration;
/// use tansaku::net::FetchOptionsBuilder;
///
/// let options = FetchOptionsBuilder::default()
///     .headers(vec![("Accept".to_string(), "application/xml".to_string())])
///     .cache_duration(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// assert_eq!(options.method, reqwest::Method::GET);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct FetchOptions {
    /// HTTP method, `GET` unless stated otherwise
    #[builder(default = "Method::GET")]
    pub method: Method,

    /// Request headers as (name, value) pairs
    #[builder(default)]
    pub headers: Vec<(String, String)>,

    /// How long a successful body stays in the fetch cache
    #[builder(default = "Duration::from_secs(600)")]
    pub cache_duration: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            cache_duration: Duration::from_secs(600),
        }
    }
}

impl FetchOptions {
    /// Options carrying the fixed feed `Accept`/`User-Agent` pair.
    pub fn feed(user_agent: &str, cache_duration: Duration) -> Self {
        Self {
            method: Method::GET,
            headers: vec![
                ("Accept".to_string(), FEED_ACCEPT.to_string()),
                ("User-Agent".to_string(), user_agent.to_string()),
            ],
            cache_duration,
        }
    }

    fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                name.parse::<HeaderName>(),
                value.parse::<HeaderValue>(),
            ) {
                map.insert(name, value);
            }
        }
        map
    }
}

/// Raw byte transport to an origin.
///
/// Implementations must map a non-2xx answer to [`Error::HttpStatus`] and
/// transport failures to [`Error::Network`]. No retries happen at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request and returns the response body.
    async fn get(&self, url: &str, options: &FetchOptions) -> Result<Bytes>;
}

/// Production transport backed by the global reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport;

impl HttpTransport {
    /// Creates a transport using the shared connection pool.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, options: &FetchOptions) -> Result<Bytes> {
        info!(url, method = %options.method, "fetching from origin");

        let response = CLIENT
            .request(options.method.clone(), url)
            .headers(options.header_map())
            .send()
            .await
            .map_err(|e| Error::network(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url, status = status.as_u16(), "origin returned non-success status");
            return Err(Error::http_status(url, status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::network(url, format!("failed to read body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_options_builder_defaults() {
        let options = FetchOptionsBuilder::default().build().unwrap();
        assert_eq!(options.method, Method::GET);
        assert!(options.headers.is_empty());
        assert_eq!(options.cache_duration, Duration::from_secs(600));
    }

    #[test]
    fn test_feed_options_carry_fixed_headers() {
        let options = FetchOptions::feed(FEED_USER_AGENT, Duration::from_secs(60));
        let map = options.header_map();

        assert_eq!(map.get("accept").unwrap(), FEED_ACCEPT);
        assert_eq!(map.get("user-agent").unwrap(), FEED_USER_AGENT);
        assert_eq!(options.cache_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let options = FetchOptionsBuilder::default()
            .headers(vec![("bad header".to_string(), "x".to_string())])
            .build()
            .unwrap();
        assert!(options.header_map().is_empty());
    }
}

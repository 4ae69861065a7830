//! Cached, deduplicated byte fetching.
//!
//! [`CachedFetcher`] sits between the feed parsers and a [`Transport`]. It owns two
//! keyed stores behind one lock:
//!
//! - **completed**: successful bodies with the time they were stored and their TTL
//! - **pending**: shared futures for requests currently in flight
//!
//! A lookup consults and, on a miss, populates both stores inside a single critical
//! section, so concurrent callers for the same key attach to one pending fetch and
//! the origin sees exactly one request.

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::{FetchOptions, Transport};
use crate::error::Result;

/// Headers that change what an origin returns. Everything else is ignored for keying.
const KEYED_HEADERS: [&str; 3] = ["accept", "authorization", "user-agent"];

/// Size limits for the fetch cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Hard maximum number of cached bodies
    pub max_entries: usize,
    /// Fraction of `max_entries` above which expired entries are purged
    pub cleanup_ratio: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            cleanup_ratio: 0.8,
        }
    }
}

impl CacheConfig {
    /// Store size at which opportunistic cleanup starts.
    pub fn cleanup_threshold(&self) -> usize {
        (self.max_entries as f64 * self.cleanup_ratio).floor() as usize
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchCacheStats {
    pub entries: usize,
    pub pending: usize,
    pub max_entries: usize,
}

#[derive(Clone, Debug)]
struct CachedResponse {
    body: Bytes,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedResponse {
    fn is_valid(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

type PendingFetch = Shared<BoxFuture<'static, Result<Bytes>>>;

#[derive(Default)]
struct Stores {
    completed: HashMap<String, CachedResponse>,
    pending: HashMap<String, PendingFetch>,
}

impl Stores {
    /// Purges expired entries past the cleanup threshold, then evicts the oldest
    /// entries until the store is back at the hard maximum.
    fn govern(&mut self, config: &CacheConfig, now: Instant) {
        if self.completed.len() <= config.cleanup_threshold() {
            return;
        }

        let before = self.completed.len();
        self.completed.retain(|_, cached| cached.is_valid(now));
        let expired = before - self.completed.len();

        let mut evicted = 0;
        if self.completed.len() > config.max_entries {
            let mut by_age: Vec<(String, Instant)> = self
                .completed
                .iter()
                .map(|(key, cached)| (key.clone(), cached.stored_at))
                .collect();
            by_age.sort_by_key(|(_, stored_at)| *stored_at);

            let excess = self.completed.len() - config.max_entries;
            for (key, _) in by_age.into_iter().take(excess) {
                self.completed.remove(&key);
                evicted += 1;
            }
        }

        debug!(expired, evicted, remaining = self.completed.len(), "fetch cache cleanup");
    }
}

/// Generates the cache key for a request.
///
/// The key is a SHA-256 digest over the URL, the method and the lowercased,
/// sorted subset of headers listed in [`KEYED_HEADERS`].
pub fn cache_key(url: &str, options: &FetchOptions) -> String {
    let mut keyed: Vec<(String, &str)> = options
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
        .filter(|(name, _)| KEYED_HEADERS.contains(&name.as_str()))
        .collect();
    keyed.sort();

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(options.method.as_str().as_bytes());
    for (name, value) in keyed {
        hasher.update(b"\n");
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Coalescing, size-bounded cache in front of a [`Transport`].
///
/// Only 2xx bodies are stored; errors are handed to every waiting caller and then
/// forgotten.
pub struct CachedFetcher {
    transport: Arc<dyn Transport>,
    stores: Arc<Mutex<Stores>>,
    config: CacheConfig,
}

impl CachedFetcher {
    /// Creates a fetcher over `transport` with the given size limits.
    pub fn new(transport: Arc<dyn Transport>, config: CacheConfig) -> Self {
        Self {
            transport,
            stores: Arc::new(Mutex::new(Stores::default())),
            config,
        }
    }

    /// Returns the body for `url`, from cache, from an in-flight identical request,
    /// or from the origin.
    ///
    /// # Errors
    ///
    /// * [`Error::HttpStatus`](crate::Error::HttpStatus) - origin answered non-2xx
    /// * [`Error::Network`](crate::Error::Network) - transport failure
    pub async fn get(&self, url: &str, options: &FetchOptions) -> Result<Bytes> {
        let key = cache_key(url, options);

        let pending = {
            let mut stores = self.stores.lock();
            let now = Instant::now();
            stores.govern(&self.config, now);

            match stores.completed.get(&key) {
                Some(cached) if cached.is_valid(now) => {
                    debug!(url, "fetch cache hit");
                    return Ok(cached.body.clone());
                }
                Some(_) => {
                    stores.completed.remove(&key);
                }
                None => {}
            }

            if let Some(in_flight) = stores.pending.get(&key) {
                debug!(url, "joining in-flight request");
                in_flight.clone()
            } else {
                debug!(url, "fetch cache miss");
                let fetch = Self::origin_fetch(
                    Arc::clone(&self.transport),
                    Arc::clone(&self.stores),
                    self.config.clone(),
                    key.clone(),
                    url.to_string(),
                    options.clone(),
                )
                .boxed()
                .shared();
                stores.pending.insert(key, fetch.clone());
                fetch
            }
        };

        pending.await
    }

    /// The shared future body. It records its own outcome, so waiters still get
    /// a stored result when the caller that started it goes away.
    async fn origin_fetch(
        transport: Arc<dyn Transport>,
        stores: Arc<Mutex<Stores>>,
        config: CacheConfig,
        key: String,
        url: String,
        options: FetchOptions,
    ) -> Result<Bytes> {
        let result = transport.get(&url, &options).await;

        let mut stores = stores.lock();
        stores.pending.remove(&key);
        if let Ok(body) = &result {
            let now = Instant::now();
            stores.completed.insert(
                key,
                CachedResponse {
                    body: body.clone(),
                    stored_at: now,
                    ttl: options.cache_duration,
                },
            );
            stores.govern(&config, now);
        }

        result
    }

    /// Current store sizes.
    pub fn stats(&self) -> FetchCacheStats {
        let stores = self.stores.lock();
        FetchCacheStats {
            entries: stores.completed.len(),
            pending: stores.pending.len(),
            max_entries: self.config.max_entries,
        }
    }

    /// Drops every completed entry. In-flight requests are left alone.
    pub fn clear(&self) {
        self.stores.lock().completed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        calls: AtomicUsize,
        delay: Duration,
        fail_with: Option<Error>,
    }

    impl CountingTransport {
        fn ok(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                fail_with: None,
            }
        }

        fn failing(error: Error) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail_with: Some(error),
            }
        }
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn get(&self, url: &str, _options: &FetchOptions) -> Result<Bytes> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(Bytes::from(format!("{}#{}", url, call))),
            }
        }
    }

    fn options(ttl: Duration) -> FetchOptions {
        FetchOptions {
            cache_duration: ttl,
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_key_ignores_irrelevant_headers() {
        let base = FetchOptions {
            headers: vec![("Accept".to_string(), "application/xml".to_string())],
            ..Default::default()
        };
        let with_noise = FetchOptions {
            headers: vec![
                ("X-Request-Id".to_string(), "123".to_string()),
                ("accept".to_string(), "application/xml".to_string()),
            ],
            ..Default::default()
        };
        let different_agent = FetchOptions {
            headers: vec![
                ("Accept".to_string(), "application/xml".to_string()),
                ("User-Agent".to_string(), "other".to_string()),
            ],
            ..Default::default()
        };

        let url = "https://example.org/rss.xml";
        assert_eq!(cache_key(url, &base), cache_key(url, &with_noise));
        assert_ne!(cache_key(url, &base), cache_key(url, &different_agent));
        assert_ne!(cache_key(url, &base), cache_key("https://example.org/other", &base));
    }

    #[tokio::test]
    async fn test_concurrent_requests_hit_origin_once() {
        let transport = Arc::new(CountingTransport::ok(Duration::from_millis(50)));
        let fetcher = CachedFetcher::new(transport.clone(), CacheConfig::default());
        let opts = options(Duration::from_secs(60));

        let results = join_all((0..8).map(|_| fetcher.get("https://example.org/a", &opts))).await;

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        let first = results[0].clone().unwrap();
        for result in results {
            assert_eq!(result.unwrap(), first);
        }
        assert_eq!(fetcher.stats().pending, 0);
        assert_eq!(fetcher.stats().entries, 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let transport = Arc::new(CountingTransport::failing(Error::http_status(
            "https://example.org/a",
            503,
        )));
        let fetcher = CachedFetcher::new(transport.clone(), CacheConfig::default());
        let opts = options(Duration::from_secs(60));

        let first = fetcher.get("https://example.org/a", &opts).await;
        let second = fetcher.get("https://example.org/a", &opts).await;

        assert!(first.unwrap_err().is_http_status());
        assert!(second.is_err());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.stats().entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_their_duration() {
        let transport = Arc::new(CountingTransport::ok(Duration::ZERO));
        let fetcher = CachedFetcher::new(transport.clone(), CacheConfig::default());
        let opts = options(Duration::from_secs(30));

        fetcher.get("https://example.org/a", &opts).await.unwrap();
        tokio::time::advance(Duration::from_secs(29)).await;
        fetcher.get("https://example.org/a", &opts).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        fetcher.get("https://example.org/a", &opts).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_governance_evicts_oldest() {
        let transport = Arc::new(CountingTransport::ok(Duration::ZERO));
        let config = CacheConfig {
            max_entries: 5,
            cleanup_ratio: 0.8,
        };
        let fetcher = CachedFetcher::new(transport.clone(), config);
        let opts = options(Duration::from_secs(3600));

        for i in 0..8 {
            fetcher
                .get(&format!("https://example.org/{}", i), &opts)
                .await
                .unwrap();
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        assert_eq!(fetcher.stats().entries, 5);

        // The most recent entry survived, the first one was evicted.
        fetcher.get("https://example.org/7", &opts).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 8);
        fetcher.get("https://example.org/0", &opts).await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_prefers_expired_entries() {
        let transport = Arc::new(CountingTransport::ok(Duration::ZERO));
        let config = CacheConfig {
            max_entries: 5,
            cleanup_ratio: 0.8,
        };
        let fetcher = CachedFetcher::new(transport.clone(), config);

        for i in 0..4 {
            fetcher
                .get(&format!("https://example.org/short/{}", i), &options(Duration::from_secs(1)))
                .await
                .unwrap();
        }
        tokio::time::advance(Duration::from_secs(5)).await;
        fetcher
            .get("https://example.org/long", &options(Duration::from_secs(3600)))
            .await
            .unwrap();

        assert_eq!(fetcher.stats().entries, 1);
    }
}

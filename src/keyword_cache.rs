//! Per-term result cache with a freshness policy.
//!
//! A [`KeywordCache`] keeps the parsed result list of every search term it has
//! answered. Entries are replaced whole on refresh. Whether an entry may be
//! served is decided by a [`RefreshPolicy`]:
//!
//! - the entry is older than the policy TTL, or
//! - today is the policy's refresh weekday and the entry was not written on
//!   that weekday
//!
//! makes the entry stale. Stale entries are still kept as a fallback for when
//! the refresh fails.
//!
//! Keys come from client queries, so the store is bounded: once it holds more
//! than [`KeywordCache::max_entries`] terms, the least recently written
//! entries are evicted.
//!
//! # Refresh failures
//!
//! | stale entry | error          | outcome                      |
//! |-------------|----------------|------------------------------|
//! | yes         | any            | stale items, warning logged  |
//! | no          | `HttpStatus`   | error returned to the caller |
//! | no          | anything else  | empty list, warning logged   |

use chrono::{DateTime, Datelike, TimeDelta, Utc, Weekday};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{error::Result, source::Source, types::ReleaseItem};

/// Default bound on the number of cached terms per source.
pub const DEFAULT_MAX_KEYWORDS: usize = 500;

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Freshness rules for cached entries.
///
/// ```rust
/// use chrono::{TimeZone, Utc, Weekday};
/// use tansaku::keyword_cache::RefreshPolicy;
///
/// let policy = RefreshPolicy::weekly(Weekday::Mon);
/// let saturday = Utc.with_ymd_and_hms(2025, 10, 4, 12, 0, 0).unwrap();
/// let monday = Utc.with_ymd_and_hms(2025, 10, 6, 9, 0, 0).unwrap();
///
/// assert!(policy.is_fresh(saturday, Weekday::Sat, saturday));
/// assert!(!policy.is_fresh(saturday, Weekday::Sat, monday));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Maximum entry age. Zero means every lookup refreshes.
    pub ttl: TimeDelta,
    /// Day on which entries written on any other day are refreshed.
    pub refresh_weekday: Option<Weekday>,
}

impl RefreshPolicy {
    /// Seven-day TTL plus a forced refresh on `weekday`.
    pub fn weekly(weekday: Weekday) -> Self {
        Self {
            ttl: TimeDelta::days(7),
            refresh_weekday: Some(weekday),
        }
    }

    /// No keyword-level caching; every lookup goes to the source.
    pub fn passthrough() -> Self {
        Self {
            ttl: TimeDelta::zero(),
            refresh_weekday: None,
        }
    }

    /// Returns `true` if an entry written at `timestamp` on `written_on` may be
    /// served at `now`.
    pub fn is_fresh(&self, timestamp: DateTime<Utc>, written_on: Weekday, now: DateTime<Utc>) -> bool {
        if now - timestamp >= self.ttl {
            return false;
        }
        match self.refresh_weekday {
            Some(day) => !(now.weekday() == day && written_on != day),
            None => true,
        }
    }
}

/// One cached result list.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub items: Arc<Vec<ReleaseItem>>,
    pub timestamp: DateTime<Utc>,
    pub last_update_weekday: Weekday,
}

/// Term-keyed cache in front of a [`Source`].
pub struct KeywordCache {
    source: Arc<dyn Source>,
    policy: RefreshPolicy,
    clock: Arc<dyn Clock>,
    max_entries: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

fn evict_oldest(entries: &mut HashMap<String, CacheEntry>, max_entries: usize, keep: &str) -> usize {
    if entries.len() <= max_entries {
        return 0;
    }

    let mut by_age: Vec<(String, DateTime<Utc>)> = entries
        .iter()
        .filter(|(key, _)| key.as_str() != keep)
        .map(|(key, entry)| (key.clone(), entry.timestamp))
        .collect();
    by_age.sort_by_key(|(_, timestamp)| *timestamp);

    let excess = entries.len() - max_entries;
    for (key, _) in by_age.iter().take(excess) {
        entries.remove(key);
    }
    excess.min(by_age.len())
}

impl KeywordCache {
    pub fn new(source: Arc<dyn Source>, policy: RefreshPolicy) -> Self {
        Self::with_clock(source, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn Source>, policy: RefreshPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            policy,
            clock,
            max_entries: DEFAULT_MAX_KEYWORDS,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the bound on cached terms (at least one).
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Returns the items for `key`, refreshing through the source when the
    /// cached entry is missing or stale.
    ///
    /// Keys are used verbatim: `"One Piece"` and `"one piece"` are distinct.
    ///
    /// # Errors
    ///
    /// * [`Error::HttpStatus`](crate::Error::HttpStatus) - the origin refused the
    ///   request and no stale entry exists
    pub async fn get(&self, key: &str) -> Result<Arc<Vec<ReleaseItem>>> {
        let now = self.clock.now();

        let stale = {
            let entries = self.entries.lock();
            match entries.get(key) {
                Some(entry) if self.policy.is_fresh(entry.timestamp, entry.last_update_weekday, now) => {
                    debug!(source = self.source.id(), key, "keyword cache hit");
                    return Ok(Arc::clone(&entry.items));
                }
                Some(entry) => Some(Arc::clone(&entry.items)),
                None => None,
            }
        };

        debug!(source = self.source.id(), key, stale = stale.is_some(), "refreshing keyword");

        match self.source.search(key).await {
            Ok(items) => {
                let items = Arc::new(items);
                let written = self.clock.now();
                let mut entries = self.entries.lock();
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        items: Arc::clone(&items),
                        timestamp: written,
                        last_update_weekday: written.weekday(),
                    },
                );
                let evicted = evict_oldest(&mut entries, self.max_entries, key);
                if evicted > 0 {
                    debug!(source = self.source.id(), evicted, remaining = entries.len(), "keyword cache eviction");
                }
                Ok(items)
            }
            Err(e) => match stale {
                Some(items) => {
                    warn!(source = self.source.id(), key, error = %e, "refresh failed, serving stale entry");
                    Ok(items)
                }
                None if e.is_http_status() => Err(e),
                None => {
                    warn!(source = self.source.id(), key, error = %e, "refresh failed, returning no results");
                    Ok(Arc::new(Vec::new()))
                }
            },
        }
    }

    /// Snapshot of the entry for `key`, fresh or not.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops the entry for `key`.
    pub fn invalidate(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

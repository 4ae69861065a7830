//! Query facade over the keyword caches.
//!
//! An [`Indexer`] pairs one [`Source`] with its [`KeywordCache`] and exposes the
//! search operations callers actually use. [`Indexers`] is the registry of all
//! configured indexers, keyed by source id.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tansaku::prelude::*;
//! use tansaku::net::HttpTransport;
//!
//! # async fn example() -> tansaku::Result<()> {
//! let indexers = Indexers::from_config(&Config::new(), Arc::new(HttpTransport::new()))?;
//!
//! if let Some(dmhy) = indexers.get("dmhy") {
//!     let everything = dmhy.search_by_term("One Piece").await?;
//!     let episode = dmhy.search_by_episode("One Piece", 1151).await?;
//!     println!("{} releases, {} for episode 1151", everything.len(), episode.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{
    config::Config,
    error::{Error, Result},
    keyword_cache::{Clock, KeywordCache, RefreshPolicy, SystemClock},
    net::{CachedFetcher, Transport},
    source::Source,
    types::ReleaseItem,
};

/// Search operations for one origin.
pub struct Indexer {
    source: Arc<dyn Source>,
    cache: KeywordCache,
}

impl Indexer {
    pub fn new(source: Arc<dyn Source>, policy: RefreshPolicy) -> Self {
        Self::with_clock(source, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn Source>, policy: RefreshPolicy, clock: Arc<dyn Clock>) -> Self {
        let cache = KeywordCache::with_clock(Arc::clone(&source), policy, clock);
        Self { source, cache }
    }

    /// Bounds the number of cached search terms.
    pub fn with_max_keywords(mut self, max_keywords: usize) -> Self {
        self.cache = self.cache.with_max_entries(max_keywords);
        self
    }

    pub fn id(&self) -> &'static str {
        self.source.id()
    }

    pub fn name(&self) -> &'static str {
        self.source.name()
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn cache(&self) -> &KeywordCache {
        &self.cache
    }

    /// All releases for `term`, in feed order.
    ///
    /// # Errors
    ///
    /// * [`Error::HttpStatus`] - the origin refused the request and nothing was cached
    pub async fn search_by_term(&self, term: &str) -> Result<Vec<ReleaseItem>> {
        let items = self.cache.get(term).await?;
        Ok(items.as_ref().clone())
    }

    /// Same as [`search_by_term`](Self::search_by_term).
    pub async fn search_by_keyword(&self, term: &str) -> Result<Vec<ReleaseItem>> {
        self.search_by_term(term).await
    }

    /// Same as [`search_by_term`](Self::search_by_term).
    pub async fn search_by_query(&self, term: &str) -> Result<Vec<ReleaseItem>> {
        self.search_by_term(term).await
    }

    /// Releases for `term` whose parsed episode equals `episode`, in feed order.
    ///
    /// Items with an unknown episode never match, and specials never match a
    /// regular episode number.
    pub async fn search_by_episode(&self, term: &str, episode: u32) -> Result<Vec<ReleaseItem>> {
        let items = self.cache.get(term).await?;
        let matching: Vec<ReleaseItem> = items
            .iter()
            .filter(|item| item.matches_episode(episode))
            .cloned()
            .collect();

        debug!(
            source = self.id(),
            term,
            episode,
            total = items.len(),
            matching = matching.len(),
            "episode filter"
        );
        Ok(matching)
    }
}

/// A collection of indexers keyed by source id.
///
/// ```rust
/// use tansaku::prelude::*;
///
/// let indexers = Indexers::new();
/// assert!(indexers.is_empty());
/// assert!(indexers.get("dmhy").is_none());
/// ```
pub struct Indexers {
    indexers: Vec<Indexer>,
    by_id: HashMap<String, usize>,
}

impl Indexers {
    pub fn new() -> Self {
        Self {
            indexers: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Builds every compiled-in origin from `config`, sharing one fetch cache.
    ///
    /// # Errors
    ///
    /// * [`Error::Config`] - a base URL does not decode
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::from_config_with_clock(config, transport, Arc::new(SystemClock))
    }

    /// Like [`from_config`](Self::from_config) with an explicit clock for the keyword caches.
    #[allow(unused_variables, unused_mut)]
    pub fn from_config_with_clock(
        config: &Config,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let fetcher = Arc::new(CachedFetcher::new(transport, config.fetch.cache_config()));
        let user_agent = config.fetch.user_agent.as_str();
        let mut indexers = Self::new();

        #[cfg(feature = "source-dmhy")]
        {
            let source = crate::sources::DmhySource::new(Arc::clone(&fetcher), config.dmhy.decoded_base_url()?)
                .with_options(config.dmhy.fetch_options(user_agent));
            indexers.add(Indexer::with_clock(
                Arc::new(source),
                config.dmhy.refresh_policy(),
                Arc::clone(&clock),
            )
            .with_max_keywords(config.dmhy.max_keywords));
        }

        #[cfg(feature = "source-acgrip")]
        {
            let source = crate::sources::AcgRipSource::new(Arc::clone(&fetcher), config.acgrip.decoded_base_url()?)
                .with_options(config.acgrip.fetch_options(user_agent));
            indexers.add(Indexer::with_clock(
                Arc::new(source),
                config.acgrip.refresh_policy(),
                Arc::clone(&clock),
            )
            .with_max_keywords(config.acgrip.max_keywords));
        }

        Ok(indexers)
    }

    /// Adds an indexer. A later indexer with the same id replaces the earlier one.
    pub fn add(&mut self, indexer: Indexer) {
        let id = indexer.id().to_string();
        match self.by_id.get(&id) {
            Some(&index) => self.indexers[index] = indexer,
            None => {
                self.by_id.insert(id, self.indexers.len());
                self.indexers.push(indexer);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Indexer> {
        self.by_id.get(id).map(|&index| &self.indexers[index])
    }

    /// Like [`get`](Self::get), failing with [`Error::NotFound`] for unknown ids.
    pub fn require(&self, id: &str) -> Result<&Indexer> {
        self.get(id)
            .ok_or_else(|| Error::not_found(format!("Indexer '{}' not found", id)))
    }

    /// Source ids in registration order.
    pub fn list_ids(&self) -> Vec<&str> {
        self.indexers.iter().map(|indexer| indexer.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Indexer> {
        self.indexers.iter()
    }

    pub fn len(&self) -> usize {
        self.indexers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexers.is_empty()
    }
}

impl Default for Indexers {
    fn default() -> Self {
        Self::new()
    }
}

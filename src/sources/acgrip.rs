use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    episode,
    error::Result,
    net::{CachedFetcher, FEED_USER_AGENT, FetchOptions},
    source::{Source, parse_feed},
    types::ReleaseItem,
};

/// ACG.RIP RSS source.
///
/// Freshness for this origin comes from the fetch cache alone, so the default
/// fetch cache duration is longer than DMHY's (30 minutes).
pub struct AcgRipSource {
    base_url: String,
    fetcher: Arc<CachedFetcher>,
    options: FetchOptions,
}

impl AcgRipSource {
    /// Create an ACG.RIP source on `base_url`.
    pub fn new(fetcher: Arc<CachedFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fetcher,
            options: FetchOptions::feed(FEED_USER_AGENT, Duration::from_secs(30 * 60)),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl Source for AcgRipSource {
    fn id(&self) -> &'static str {
        "acgrip"
    }

    fn name(&self) -> &'static str {
        "ACG.RIP"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, term: &str) -> String {
        format!("{}/.xml?term={}", self.base_url, urlencoding::encode(term))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<ReleaseItem>> {
        let body = self.fetcher.get(url, &self.options).await?;
        parse_feed(self.id(), &body, &episode::ACGRIP)
    }
}

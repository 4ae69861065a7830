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

/// DMHY RSS source.
///
/// Titles follow the `[Group][Series][Episode][Resolution]` convention with
/// occasional `第N話` markers, which the [`episode::DMHY`] cascade covers.
pub struct DmhySource {
    base_url: String,
    fetcher: Arc<CachedFetcher>,
    options: FetchOptions,
}

impl DmhySource {
    /// Create a DMHY source on `base_url`, usually
    /// [`SourceConfig::decoded_base_url`](crate::config::SourceConfig::decoded_base_url).
    pub fn new(fetcher: Arc<CachedFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fetcher,
            options: FetchOptions::feed(FEED_USER_AGENT, Duration::from_secs(600)),
        }
    }

    /// Replaces the request options used for every feed fetch.
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl Source for DmhySource {
    fn id(&self) -> &'static str {
        "dmhy"
    }

    fn name(&self) -> &'static str {
        "DMHY"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, term: &str) -> String {
        format!(
            "{}/topics/rss/rss.xml?keyword={}",
            self.base_url,
            urlencoding::encode(term)
        )
    }

    async fn fetch(&self, url: &str) -> Result<Vec<ReleaseItem>> {
        let body = self.fetcher.get(url, &self.options).await?;
        parse_feed(self.id(), &body, &episode::DMHY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{CacheConfig, HttpTransport};

    fn source(base_url: &str) -> DmhySource {
        let fetcher = Arc::new(CachedFetcher::new(
            Arc::new(HttpTransport::new()),
            CacheConfig::default(),
        ));
        DmhySource::new(fetcher, base_url)
    }

    #[test]
    fn test_search_url_encodes_term() {
        let source = source("http://localhost:8080");
        assert_eq!(
            source.search_url("One Piece"),
            "http://localhost:8080/topics/rss/rss.xml?keyword=One%20Piece"
        );
        assert_eq!(
            source.search_url("海贼王"),
            "http://localhost:8080/topics/rss/rss.xml?keyword=%E6%B5%B7%E8%B4%BC%E7%8E%8B"
        );
    }

    #[test]
    fn test_base_url_trims_slash() {
        let source = source("http://localhost:8080/");
        assert_eq!(source.base_url(), "http://localhost:8080");
        assert_eq!(source.search_url("x"), "http://localhost:8080/topics/rss/rss.xml?keyword=x");
    }
}

//! Source trait and the shared RSS parsing pipeline.
//!
//! Every origin implements [`Source`]: it knows how to build a search URL for a
//! term and how to turn the feed behind that URL into [`ReleaseItem`]s. The
//! parsing steps that do not depend on the origin live in [`parse_feed`]:
//!
//! 1. decode the body as UTF-8
//! 2. extract every `<item>` (see [`net::xml`](crate::net::xml))
//! 3. convert items in parallel, keeping feed order, dropping (and logging) any
//!    item that fails to convert
//!
//! The only error [`Source::fetch`] may return for a readable origin response is
//! a whole-feed [`Error::Parse`]; per-item failures never escape.

use async_trait::async_trait;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    episode::{EpisodeExtractor, Track},
    error::{Error, Result},
    net::{html, xml::RawItem},
    types::ReleaseItem,
};

/// Trait that all origin feeds implement.
///
/// # Examples
///
/// ```rust
/// use tansaku::prelude::*;
/// use tansaku::error::Result;
/// use async_trait::async_trait;
///
/// struct StaticSource;
///
/// #[async_trait]
/// impl Source for StaticSource {
///     fn id(&self) -> &'static str { "static" }
///     fn name(&self) -> &'static str { "Static" }
///     fn base_url(&self) -> &str { "https://example.org" }
///     fn search_url(&self, term: &str) -> String {
///         format!("{}/rss?q={}", self.base_url(), term)
///     }
///
///     async fn fetch(&self, _url: &str) -> Result<Vec<ReleaseItem>> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait Source: Send + Sync {
    /// Short lowercase identifier, used in routes and logs.
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Origin base URL without trailing slash.
    fn base_url(&self) -> &str;

    /// Feed URL for a search term.
    fn search_url(&self, term: &str) -> String;

    /// Fetches and parses the feed at `url`.
    ///
    /// # Errors
    ///
    /// * [`Error::HttpStatus`] - origin answered non-2xx
    /// * [`Error::Network`] - transport failure
    /// * [`Error::Parse`] - the body is not UTF-8 or not well-formed XML
    async fn fetch(&self, url: &str) -> Result<Vec<ReleaseItem>>;

    /// Fetches the feed for a search term.
    async fn search(&self, term: &str) -> Result<Vec<ReleaseItem>> {
        let url = self.search_url(term);
        self.fetch(&url).await
    }
}

/// Parses a raw feed body into release items.
///
/// # Errors
///
/// * [`Error::Parse`] - invalid UTF-8 or malformed XML
pub fn parse_feed(source_id: &str, body: &[u8], episodes: &EpisodeExtractor) -> Result<Vec<ReleaseItem>> {
    let text = String::from_utf8(body.to_vec())?;
    let raw_items = crate::net::xml::parse_items(&text)?;
    let total = raw_items.len();

    let items: Vec<ReleaseItem> = raw_items
        .par_iter()
        .filter_map(|raw| match parse_item(raw, episodes) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(source = source_id, error = %e, "dropping feed item");
                None
            }
        })
        .collect();

    debug!(source = source_id, total, kept = items.len(), "parsed feed");
    Ok(items)
}

/// Converts one `<item>` into a [`ReleaseItem`].
///
/// # Errors
///
/// * [`Error::Parse`] - the item has no title
/// * [`Error::MissingResource`] - no enclosure URL, enclosure text or magnet link
pub fn parse_item(raw: &RawItem, episodes: &EpisodeExtractor) -> Result<ReleaseItem> {
    if let Some(reason) = raw.malformed() {
        return Err(Error::parse(reason.to_string()));
    }

    let title = raw
        .text("title")
        .ok_or_else(|| Error::parse("item without title"))?
        .to_string();

    let description_html = raw.text("description");
    let resource_url = raw
        .attr("enclosure", "url")
        .or_else(|| raw.text("enclosure"))
        .map(String::from)
        .or_else(|| {
            description_html.and_then(|html| {
                html::select_all_attr(html, "a[href^='magnet:']", "href")
                    .into_iter()
                    .next()
            })
        })
        .ok_or_else(|| Error::MissingResource(title.clone()))?;

    let size = raw
        .attr("enclosure", "length")
        .and_then(|length| length.parse::<u64>().ok())
        .filter(|&length| length > 0);

    let link = raw.text("link").unwrap_or_default().to_string();
    let guid = raw
        .text("guid")
        .map(String::from)
        .unwrap_or_else(|| if link.is_empty() { resource_url.clone() } else { link.clone() });

    let (episode, special) = match episodes.extract(&title) {
        Some(found) if found.track == Track::Special => (None, Some(found.number)),
        Some(found) => (Some(found.number), None),
        None => (None, None),
    };

    let description = description_html
        .map(html::to_plain_text)
        .filter(|text| !text.is_empty());

    Ok(ReleaseItem {
        title,
        link,
        resource_url,
        pub_date: raw.text("pubDate").unwrap_or_default().to_string(),
        guid,
        episode,
        special,
        size,
        author: raw.text("author").map(String::from),
        category: raw.text("category").map(String::from),
        description,
    })
}

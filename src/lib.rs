//! # Tansaku - Anime release indexer bridge
//!
//! Tansaku scrapes the RSS feeds of anime bittorrent indexes (DMHY and ACG.RIP),
//! extracts structured release metadata from free-text titles, caches the
//! results with a per-origin freshness policy and re-serializes everything as
//! Torznab XML for PVR tools such as Sonarr and Prowlarr.
//!
//! ## Features
//!
//! - **Request coalescing**: concurrent identical origin requests share one fetch
//! - **Size-bounded fetch cache**: expired entries purged first, then the oldest
//! - **Episode heuristics**: ordered regex cascades with reusable validators
//! - **Keyword cache**: TTL plus weekday-rollover refresh, stale fallback on errors
//! - **Torznab output**: search feeds, capabilities and error documents
//! - **Parallel parsing**: feed items are converted with rayon, order preserved
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tansaku::prelude::*;
//! use tansaku::net::HttpTransport;
//!
//! #[tokio::main]
//! async fn main() -> tansaku::Result<()> {
//!     let indexers = Indexers::from_config(&Config::new(), Arc::new(HttpTransport::new()))?;
//!     let dmhy = indexers.require("dmhy")?;
//!
//!     for release in dmhy.search_by_episode("One Piece", 1151).await? {
//!         println!("{} -> {}", release.title, release.resource_url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Torznab Output
//!
//! ```rust
//! use tansaku::torznab::{self, ChannelMetadata, TorznabItem};
//! use tansaku::types::ReleaseItem;
//!
//! let release = ReleaseItem {
//!     title: "[Group][One Piece][1151][1080p]".to_string(),
//!     resource_url: "magnet:?xt=urn:btih:abc".to_string(),
//!     episode: Some(1151),
//!     ..Default::default()
//! };
//! let item = TorznabItem::from_release(&release, None);
//! assert_eq!(item.attribute("series"), Some("One Piece"));
//!
//! let metadata = ChannelMetadata::new("Tansaku", "https://indexer.local/dmhy/api");
//! let xml = torznab::render_feed(&metadata, &[item], 0, 1).unwrap();
//! assert!(xml.contains("torznab:attr"));
//! ```
//!
//! ## Architecture
//!
//! - [`net`]: transport seam, coalescing fetch cache, XML and HTML helpers
//! - [`episode`]: episode-number cascades for both origins
//! - [`source`]: origin trait and the shared feed parsing pipeline
//! - [`sources`]: DMHY and ACG.RIP, each behind a feature flag
//! - [`keyword_cache`]: per-term result cache with refresh policies
//! - [`search`]: query facade ([`Indexer`]) and registry ([`Indexers`])
//! - [`classify`]: resolution categories and series names
//! - [`torznab`]: Torznab document encoding
//! - [`config`]: layered configuration
//! - [`error`]: error type and result alias
//! - `server` (feature `server`): axum routes for the Torznab API

pub mod classify;
pub mod config;
pub mod episode;
pub mod error;
pub mod keyword_cache;
pub mod net;
pub mod search;
pub mod source;
pub mod sources;
pub mod torznab;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

/// Prelude module for convenient imports.
///
/// ```rust
/// use tansaku::prelude::*;
///
/// // Now you have access to:
/// // - Indexer, Indexers, Source
/// // - Config, RefreshPolicy
/// // - ReleaseItem, Category
/// ```
pub mod prelude {
    pub use crate::{
        config::Config,
        keyword_cache::RefreshPolicy,
        search::{Indexer, Indexers},
        source::Source,
        types::{Category, ReleaseItem},
    };
}

// Re-export main types at crate root for direct access
pub use crate::config::Config;
pub use error::{Error, Result};
pub use search::{Indexer, Indexers};
pub use source::Source;
pub use types::{Category, ReleaseItem};

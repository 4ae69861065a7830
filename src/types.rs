//! Core data types for releases and categories.
//!
//! - [`ReleaseItem`] - A single normalized release parsed from an origin feed
//! - [`Category`] - The Newznab/Torznab category taxonomy used by this bridge
//!
//! # Examples
//!
//! ```rust
//! use tansaku::types::ReleaseItem;
//!
//! let item = ReleaseItem {
//!     title: "[Group][One Piece][1151][1080p]".to_string(),
//!     link: "https://example.org/view/1".to_string(),
//!     resource_url: "magnet:?xt=urn:btih:abc".to_string(),
//!     pub_date: "Sun, 19 Oct 2025 10:00:00 +0800".to_string(),
//!     guid: "https://example.org/view/1".to_string(),
//!     episode: Some(1151),
//!     ..Default::default()
//! };
//! assert!(item.matches_episode(1151));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A release extracted from an origin RSS feed.
///
/// An item is only ever constructed with a non-empty `resource_url`; feed items
/// lacking one are dropped while parsing.
///
/// # Fields
///
/// * `episode` - Regular episode number, `None` when unknown. `Some(0)` is a
///   real episode (OVAs, prologues).
/// * `special` - Special-episode number (`SP2`), tracked apart from `episode`
///   so specials never answer regular episode searches.
/// * `size` - Payload size in bytes, only when the feed announced a positive length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseItem {
    /// Release title as published by the origin
    pub title: String,

    /// Link to the release page
    pub link: String,

    /// Magnet URI or torrent URL
    pub resource_url: String,

    /// Publication date, verbatim from the feed (RFC 2822)
    pub pub_date: String,

    /// Stable identifier from the feed
    pub guid: String,

    /// Parsed episode number
    pub episode: Option<u32>,

    /// Parsed special-episode number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<u32>,

    /// Payload size in bytes
    pub size: Option<u64>,

    /// Uploader or release group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Origin-side category label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Plain-text description with markup stripped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReleaseItem {
    /// Returns `true` if the parsed episode is known and equals `episode`.
    ///
    /// Items with an unknown episode never match.
    pub fn matches_episode(&self, episode: u32) -> bool {
        self.episode == Some(episode)
    }
}

/// Newznab/Torznab categories emitted by this bridge.
///
/// Both origins index anime exclusively, so every release is tagged with
/// [`Category::Tv`], [`Category::Anime`] and exactly one resolution category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// 5000 - TV root
    Tv,
    /// 5030 - TV/SD
    TvSd,
    /// 5040 - TV/HD
    TvHd,
    /// 5060 - TV/UHD
    TvUhd,
    /// 5070 - TV/Anime
    Anime,
}

impl Category {
    /// Every category, in the order advertised by the capabilities document.
    pub const ALL: [Category; 5] = [
        Category::Tv,
        Category::TvSd,
        Category::TvHd,
        Category::TvUhd,
        Category::Anime,
    ];

    /// Numeric Newznab id.
    pub fn id(self) -> u32 {
        match self {
            Category::Tv => 5000,
            Category::TvSd => 5030,
            Category::TvHd => 5040,
            Category::TvUhd => 5060,
            Category::Anime => 5070,
        }
    }

    /// Human-readable name as used in the capabilities document.
    pub fn name(self) -> &'static str {
        match self {
            Category::Tv => "TV",
            Category::TvSd => "TV/SD",
            Category::TvHd => "TV/HD",
            Category::TvUhd => "TV/UHD",
            Category::Anime => "TV/Anime",
        }
    }

    /// Looks up a category by its numeric id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ids() {
        assert_eq!(Category::Tv.id(), 5000);
        assert_eq!(Category::TvSd.id(), 5030);
        assert_eq!(Category::TvHd.id(), 5040);
        assert_eq!(Category::TvUhd.id(), 5060);
        assert_eq!(Category::Anime.id(), 5070);
        assert_eq!(Category::from_id(5070), Some(Category::Anime));
        assert_eq!(Category::from_id(2000), None);
    }

    #[test]
    fn test_episode_zero_is_a_real_episode() {
        let ova = ReleaseItem {
            episode: Some(0),
            ..Default::default()
        };
        let unknown = ReleaseItem::default();

        assert!(ova.matches_episode(0));
        assert!(!unknown.matches_episode(0));
    }
}

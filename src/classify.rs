//! Category and series-name inference from release titles.
//!
//! ```rust
//! use tansaku::classify;
//! use tansaku::types::Category;
//!
//! let title = "[Skymoon-Raws] One Piece [1151][ViuTV][WEB-DL][1080p]";
//! assert_eq!(classify::categories(title), [Category::TvHd, Category::Tv, Category::Anime]);
//! assert_eq!(classify::series_name(title), "One Piece");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Category;

/// Returned by [`series_name`] when no pattern yields a name.
pub const UNKNOWN_SERIES: &str = "Unknown Series";

static UHD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"2160[pi]|\b4k\b|\buhd\b|3840\s*[x×]\s*2160").expect("valid UHD pattern"));

static HD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"1080[pi]|720p|\bfhd\b|\bhd\b|1920\s*[x×]\s*1080|1280\s*[x×]\s*720").expect("valid HD pattern")
});

static SD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"480p|576p|360p|\bsd\b|[68]\d{2}\s*[x×]\s*480").expect("valid SD pattern"));

/// Resolution category of a title: UHD, then HD, then SD, defaulting to HD.
pub fn resolution(title: &str) -> Category {
    let lower = title.to_lowercase();
    if UHD.is_match(&lower) {
        Category::TvUhd
    } else if HD.is_match(&lower) {
        Category::TvHd
    } else if SD.is_match(&lower) {
        Category::TvSd
    } else {
        Category::TvHd
    }
}

/// The three categories of a release: its resolution, then TV, then Anime.
pub fn categories(title: &str) -> [Category; 3] {
    [resolution(title), Category::Tv, Category::Anime]
}

// `[Group] rest` with ASCII or CJK lenticular brackets
static GROUP_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\[【][^\]】]+[\]】]\s*(.+)$").expect("valid group pattern"));

static LEADING_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\[【]([^\]】]+)[\]】]").expect("valid bracket pattern"));

static FIRST_BRACKET_AFTER_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\[【]+[\[【]([^\]】]+)[\]】]").expect("valid fallback pattern"));

static FILE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(?:mkv|mp4|avi|ts)\s*$").expect("valid extension pattern"));

static EPISODE_BRACKET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\[【(（]\s*\d+(?:\.\d)?(?:v\d+)?(?:\s*END)?\s*[\]】)）]").expect("valid episode bracket pattern")
});

static CHINESE_EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第\s*\d+\s*[話话集]").expect("valid chinese marker pattern"));

static RESOLUTION_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d{3,4}[pi]\b|\b(?:4k|uhd|fhd)\b|\b\d{3,4}\s*[x×]\s*\d{3,4}\b").expect("valid resolution pattern")
});

static BRACKET_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[【(（][^\]】)）]*[\]】)）]").expect("valid bracket group pattern"));

static TRAILING_EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+-\s*(?:ep|sp)?\s*\d+(?:v\d+)?\s*$").expect("valid trailing episode pattern"));

/// Best-effort series name.
///
/// Tries `[Group][Name]...` / `[Group] Name ...` first, then the first bracketed
/// token after a plain-text prefix, then gives [`UNKNOWN_SERIES`].
pub fn series_name(title: &str) -> String {
    primary_series_name(title)
        .or_else(|| fallback_series_name(title))
        .unwrap_or_else(|| UNKNOWN_SERIES.to_string())
}

fn primary_series_name(title: &str) -> Option<String> {
    let rest = GROUP_PREFIX.captures(title)?.get(1)?.as_str();
    let candidate = match LEADING_BRACKET.captures(rest) {
        Some(caps) => caps.get(1)?.as_str(),
        None => rest,
    };
    clean_series_name(candidate)
}

fn fallback_series_name(title: &str) -> Option<String> {
    let token = FIRST_BRACKET_AFTER_TEXT.captures(title)?.get(1)?.as_str().trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn clean_series_name(raw: &str) -> Option<String> {
    let name = FILE_EXTENSION.replace(raw, "");
    let name = EPISODE_BRACKET.replace_all(&name, " ");
    let name = CHINESE_EPISODE.replace_all(&name, " ");
    let name = RESOLUTION_FRAGMENT.replace_all(&name, " ");
    let name = BRACKET_GROUP.replace_all(&name, " ");
    let name = TRAILING_EPISODE.replace(&name, "");

    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let name = name.trim_matches(|c: char| c == '-' || c == '_' || c.is_whitespace());

    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(name.to_string())
    }
}

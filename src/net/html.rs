//! HTML helpers for feed item descriptions.
//!
//! Origins embed HTML fragments (images, links, file lists) inside item
//! descriptions. The Torznab output and the JSON search results carry plain
//! text, produced here with the `scraper` crate.
//!
//! # Examples
//!
//! ```rust
//! use tansaku::net::html;
//!
//! let text = html::to_plain_text("<p>Episode <b>12</b></p><p>1080p  HEVC</p>");
//! assert_eq!(text, "Episode 12 1080p HEVC");
//! ```

use scraper::{Html, Selector};

/// Parses an HTML fragment and returns its text with whitespace collapsed.
///
/// Returns an empty string for fragments without text.
pub fn to_plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let words: Vec<&str> = fragment
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect();
    words.join(" ")
}

/// Extracts attribute values from all elements matching a CSS selector.
///
/// Returns an empty vector if nothing matches or the selector is invalid.
///
/// ```rust
/// use tansaku::net::html;
///
/// let links = html::select_all_attr(r#"<a href="magnet:?xt=1">m</a><a href="/x">x</a>"#, "a", "href");
/// assert_eq!(links, vec!["magnet:?xt=1", "/x"]);
/// ```
pub fn select_all_attr(html: &str, selector: &str, attr: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    Selector::parse(selector)
        .ok()
        .map(|sel| {
            fragment
                .select(&sel)
                .filter_map(|el| el.value().attr(attr).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_of_nested_markup() {
        let html = r#"<div><img src="x.jpg"/><p>Line one</p>
            <ul><li>file.mkv</li><li>   file2.mkv </li></ul></div>"#;
        assert_eq!(to_plain_text(html), "Line one file.mkv file2.mkv");
    }

    #[test]
    fn test_plain_text_of_empty_fragment() {
        assert_eq!(to_plain_text("<img src=\"x.jpg\"/>"), "");
    }

    #[test]
    fn test_select_magnet_links() {
        let html = r#"<p><a href="magnet:?xt=urn:btih:abc">magnet</a></p>"#;
        let links = select_all_attr(html, "a[href^='magnet:']", "href");
        assert_eq!(links, vec!["magnet:?xt=urn:btih:abc"]);
    }
}

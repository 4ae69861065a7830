//! Torznab document encoding.
//!
//! Three documents are produced, all with `quick-xml`'s [`Writer`]:
//!
//! - [`render_feed`] - RSS 2.0 search results with `torznab:attr` extensions
//! - [`render_caps`] - the capabilities document PVR tools probe first
//! - [`render_error`] - the `<error code description/>` document
//!
//! Items are converted from [`ReleaseItem`]s by [`TorznabItem::from_release`],
//! which fills the TV attributes a PVR requires even when the origin supplied
//! nothing but a title.
//!
//! ```rust
//! use tansaku::torznab::{self, ChannelMetadata};
//!
//! let metadata = ChannelMetadata::new("Tansaku", "https://indexer.local/dmhy/api");
//! let xml = torznab::render_feed(&metadata, &[torznab::mock_item()], 0, 1).unwrap();
//!
//! assert!(xml.contains(r#"<torznab:response offset="0" total="1"/>"#));
//! assert!(xml.contains(r#"<torznab:attr name="season" value="1"/>"#));
//! ```

use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;
use std::io::Cursor;

use crate::{
    classify,
    error::Result,
    types::{Category, ReleaseItem},
};

pub const TORZNAB_NAMESPACE: &str = "http://torznab.com/schemas/2015/feed";
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Page size advertised in the capabilities document.
pub const DEFAULT_LIMIT: usize = 100;

const TORRENT_MIME: &str = "application/x-bittorrent";
const MAGNET_MIME: &str = "application/x-bittorrent;x-scheme-handler/magnet";

/// Channel-level fields of a generated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelMetadata {
    pub title: String,
    pub description: String,
    pub link: String,
}

impl ChannelMetadata {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            description: format!("{} Torznab feed", title),
            title,
            link: link.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
    pub length: u64,
}

/// One `<item>` of a Torznab feed. Built per response, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TorznabItem {
    pub title: String,
    pub link: String,
    pub guid: String,
    pub pub_date: String,
    pub enclosure: Enclosure,
    pub size: u64,
    pub description: Option<String>,
    /// `torznab:attr` name/value pairs, in output order
    pub attributes: Vec<(String, String)>,
}

impl TorznabItem {
    /// Converts a parsed release into a TV-type Torznab item.
    ///
    /// `season` comes from the request; it is clamped to at least 1 because
    /// consumers reject season 0. An unknown episode is encoded as `0`.
    pub fn from_release(release: &ReleaseItem, season: Option<u32>) -> Self {
        let size = release.size.unwrap_or(0);
        let is_magnet = release.resource_url.starts_with("magnet:");
        let episode = release.episode.unwrap_or(0);
        let season = season.unwrap_or(1).max(1);

        let mut attributes: Vec<(String, String)> = classify::categories(&release.title)
            .iter()
            .map(|category| ("category".to_string(), category.id().to_string()))
            .collect();
        attributes.extend([
            ("series".to_string(), classify::series_name(&release.title)),
            ("season".to_string(), season.to_string()),
            ("episode".to_string(), episode.to_string()),
            ("absolute".to_string(), episode.to_string()),
            ("downloadvolumefactor".to_string(), "0".to_string()),
            ("uploadvolumefactor".to_string(), "1".to_string()),
        ]);
        if is_magnet {
            attributes.push(("magneturl".to_string(), release.resource_url.clone()));
        }

        let link = if release.link.is_empty() {
            release.resource_url.clone()
        } else {
            release.link.clone()
        };
        let guid = if release.guid.is_empty() {
            link.clone()
        } else {
            release.guid.clone()
        };

        Self {
            title: release.title.clone(),
            link,
            guid,
            pub_date: release.pub_date.clone(),
            enclosure: Enclosure {
                url: release.resource_url.clone(),
                mime_type: if is_magnet { MAGNET_MIME } else { TORRENT_MIME }.to_string(),
                length: size,
            },
            size,
            description: release.description.clone(),
            attributes,
        }
    }

    /// First value of the named attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The fixed release used for capability probes. Never fetched from an origin.
pub fn mock_release() -> ReleaseItem {
    ReleaseItem {
        title: "[Tansaku] Capability Probe [01][1080p]".to_string(),
        link: "https://tansaku.invalid/probe".to_string(),
        resource_url: "magnet:?xt=urn:btih:0000000000000000000000000000000000000000&dn=tansaku-probe"
            .to_string(),
        pub_date: "Mon, 01 Jan 2024 00:00:00 +0000".to_string(),
        guid: "tansaku-probe-0001".to_string(),
        episode: Some(1),
        size: Some(1 << 30),
        description: Some("Synthetic release for indexer capability checks".to_string()),
        ..Default::default()
    }
}

/// [`mock_release`] as a Torznab item.
pub fn mock_item() -> TorznabItem {
    TorznabItem::from_release(&mock_release(), None)
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn new_writer() -> Result<XmlWriter> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(writer)
}

fn finish(writer: XmlWriter) -> Result<String> {
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn write_text(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// CDATA cannot contain its own terminator; such payloads are written as escaped text.
fn write_cdata(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    if text.contains("]]>") {
        return write_text(writer, name, text);
    }
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::CData(BytesCData::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_empty(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(name);
    for &attr in attrs {
        element.push_attribute(attr);
    }
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn write_item(writer: &mut XmlWriter, item: &TorznabItem) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;

    write_cdata(writer, "title", &item.title)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "true"));
    writer.write_event(Event::Start(guid))?;
    writer.write_event(Event::Text(BytesText::new(&item.guid)))?;
    writer.write_event(Event::End(BytesEnd::new("guid")))?;

    write_cdata(writer, "link", &item.link)?;
    write_text(writer, "pubDate", &item.pub_date)?;
    if let Some(description) = &item.description {
        write_cdata(writer, "description", description)?;
    }
    write_text(writer, "size", &item.size.to_string())?;

    let length = item.enclosure.length.to_string();
    write_empty(
        writer,
        "enclosure",
        &[
            ("url", item.enclosure.url.as_str()),
            ("type", item.enclosure.mime_type.as_str()),
            ("length", length.as_str()),
        ],
    )?;

    for (name, value) in &item.attributes {
        write_empty(writer, "torznab:attr", &[("name", name.as_str()), ("value", value.as_str())])?;
    }

    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

/// Renders a search-result feed.
///
/// `offset` and `total` describe the page: `items` is the slice starting at
/// `offset` out of `total` matching results.
///
/// # Errors
///
/// * [`Error::Xml`](crate::Error::Xml) - the writer failed
pub fn render_feed(metadata: &ChannelMetadata, items: &[TorznabItem], offset: usize, total: usize) -> Result<String> {
    let mut writer = new_writer()?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", ATOM_NAMESPACE));
    rss.push_attribute(("xmlns:torznab", TORZNAB_NAMESPACE));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text(&mut writer, "title", &metadata.title)?;
    write_text(&mut writer, "description", &metadata.description)?;
    write_text(&mut writer, "link", &metadata.link)?;

    let offset = offset.to_string();
    let total = total.to_string();
    write_empty(
        &mut writer,
        "torznab:response",
        &[("offset", offset.as_str()), ("total", total.as_str())],
    )?;

    for item in items {
        write_item(&mut writer, item)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;
    finish(writer)
}

/// Renders the capabilities document.
pub fn render_caps(metadata: &ChannelMetadata) -> Result<String> {
    let mut writer = new_writer()?;
    writer.write_event(Event::Start(BytesStart::new("caps")))?;

    write_empty(
        &mut writer,
        "server",
        &[("version", env!("CARGO_PKG_VERSION")), ("title", metadata.title.as_str())],
    )?;

    let limit = DEFAULT_LIMIT.to_string();
    write_empty(&mut writer, "limits", &[("max", limit.as_str()), ("default", limit.as_str())])?;

    writer.write_event(Event::Start(BytesStart::new("searching")))?;
    write_empty(&mut writer, "search", &[("available", "yes"), ("supportedParams", "q")])?;
    write_empty(
        &mut writer,
        "tv-search",
        &[("available", "yes"), ("supportedParams", "q,season,ep")],
    )?;
    write_empty(&mut writer, "movie-search", &[("available", "no"), ("supportedParams", "q")])?;
    writer.write_event(Event::End(BytesEnd::new("searching")))?;

    writer.write_event(Event::Start(BytesStart::new("categories")))?;
    let tv_id = Category::Tv.id().to_string();
    let mut tv = BytesStart::new("category");
    tv.push_attribute(("id", tv_id.as_str()));
    tv.push_attribute(("name", Category::Tv.name()));
    writer.write_event(Event::Start(tv))?;
    for sub in Category::ALL.into_iter().filter(|c| *c != Category::Tv) {
        let id = sub.id().to_string();
        write_empty(&mut writer, "subcat", &[("id", id.as_str()), ("name", sub.name())])?;
    }
    writer.write_event(Event::End(BytesEnd::new("category")))?;
    writer.write_event(Event::End(BytesEnd::new("categories")))?;

    writer.write_event(Event::End(BytesEnd::new("caps")))?;
    finish(writer)
}

/// Renders a Torznab error document (`100` bad key, `202` no such function,
/// `900` unknown error, ...).
pub fn render_error(code: u16, description: &str) -> Result<String> {
    let mut writer = new_writer()?;
    let code = code.to_string();
    write_empty(&mut writer, "error", &[("code", code.as_str()), ("description", description)])?;
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ChannelMetadata {
        ChannelMetadata::new("Tansaku", "https://indexer.local/dmhy/api")
    }

    fn release(title: &str, episode: Option<u32>) -> ReleaseItem {
        ReleaseItem {
            title: title.to_string(),
            link: "https://example.org/view/1".to_string(),
            resource_url: "https://example.org/1.torrent".to_string(),
            pub_date: "Mon, 06 Oct 2025 12:00:00 +0800".to_string(),
            guid: "https://example.org/view/1".to_string(),
            episode,
            size: Some(2048),
            ..Default::default()
        }
    }

    #[test]
    fn test_tv_attributes_always_present() {
        let item = TorznabItem::from_release(&release("no metadata here", None), None);
        for name in [
            "series",
            "season",
            "episode",
            "absolute",
            "downloadvolumefactor",
            "uploadvolumefactor",
        ] {
            assert!(item.attribute(name).is_some(), "missing {}", name);
        }
        assert_eq!(item.attribute("episode"), Some("0"));
        assert_eq!(item.attribute("absolute"), Some("0"));
        assert_eq!(item.attribute("series"), Some(classify::UNKNOWN_SERIES));
    }

    #[test]
    fn test_season_clamped_and_absolute_defaults_to_episode() {
        let item = TorznabItem::from_release(&release("[Group][One Piece][1151][1080p]", Some(1151)), Some(0));
        assert_eq!(item.attribute("season"), Some("1"));
        assert_eq!(item.attribute("episode"), Some("1151"));
        assert_eq!(item.attribute("absolute"), Some("1151"));
        assert_eq!(item.attribute("series"), Some("One Piece"));

        let seasonal = TorznabItem::from_release(&release("x", Some(3)), Some(2));
        assert_eq!(seasonal.attribute("season"), Some("2"));
    }

    #[test]
    fn test_attribute_order() {
        let item = TorznabItem::from_release(&release("[Group][Title][01][2160p]", Some(1)), None);
        let names: Vec<&str> = item.attributes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "category",
                "category",
                "category",
                "series",
                "season",
                "episode",
                "absolute",
                "downloadvolumefactor",
                "uploadvolumefactor",
            ]
        );
        assert_eq!(item.attributes[0].1, "5060");
        assert_eq!(item.attributes[1].1, "5000");
        assert_eq!(item.attributes[2].1, "5070");
        assert_eq!(item.enclosure.mime_type, TORRENT_MIME);
    }

    #[test]
    fn test_mock_item_is_deterministic() {
        let item = mock_item();
        assert_eq!(item, mock_item());
        assert_eq!(item.attribute("episode"), Some("1"));
        assert_eq!(item.enclosure.mime_type, MAGNET_MIME);
        assert!(item.attribute("magneturl").is_some());
    }

    #[test]
    fn test_feed_element_order() {
        let item = TorznabItem::from_release(&release("[Group][Title][01][1080p]", Some(1)), None);
        let xml = render_feed(&metadata(), &[item], 0, 1).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(r#"xmlns:torznab="http://torznab.com/schemas/2015/feed""#));
        assert!(xml.contains("<title><![CDATA[[Group][Title][01][1080p]]]></title>"));

        let positions: Vec<usize> = [
            "<title><![CDATA[",
            "<guid isPermaLink=\"true\">",
            "<link><![CDATA[",
            "<pubDate>",
            "<size>2048</size>",
            "<enclosure url=",
            "<torznab:attr name=\"category\"",
        ]
        .iter()
        .map(|needle| xml.find(needle).unwrap_or_else(|| panic!("missing {}", needle)))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", xml);
    }

    #[test]
    fn test_cdata_terminator_falls_back_to_text() {
        let mut item = mock_item();
        item.title = "odd ]]> title".to_string();
        let xml = render_feed(&metadata(), &[item], 0, 1).unwrap();
        assert!(xml.contains("<title>odd ]]&gt; title</title>"));
    }

    #[test]
    fn test_caps_lists_categories() {
        let xml = render_caps(&metadata()).unwrap();
        for id in ["5000", "5030", "5040", "5060", "5070"] {
            assert!(xml.contains(&format!("id=\"{}\"", id)), "missing {}", id);
        }
        assert!(xml.contains(r#"<tv-search available="yes" supportedParams="q,season,ep"/>"#));
    }

    #[test]
    fn test_error_document() {
        let xml = render_error(202, "No such function").unwrap();
        assert!(xml.contains(r#"<error code="202" description="No such function"/>"#));
    }
}

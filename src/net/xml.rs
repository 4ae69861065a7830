//! RSS item extraction.
//!
//! [`parse_items`] walks an RSS document with `quick-xml` and returns every
//! `<item>` as a [`RawItem`]: a map from child element name to its text and
//! attributes. CDATA sections are unwrapped into plain text, and the result is
//! always a list, whether the channel carried zero, one or many items.
//!
//! ```rust
//! use tansaku::net::xml;
//!
//! let feed = r#"<rss><channel><item>
//!     <title><![CDATA[[Group][Title][01]]]></title>
//!     <enclosure url="magnet:?xt=urn:btih:abc" length="42" type="application/x-bittorrent"/>
//! </item></channel></rss>"#;
//!
//! let items = xml::parse_items(feed).unwrap();
//! assert_eq!(items.len(), 1);
//! assert_eq!(items[0].text("title"), Some("[Group][Title][01]"));
//! assert_eq!(items[0].attr("enclosure", "url"), Some("magnet:?xt=urn:btih:abc"));
//! ```

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// A single child element of an `<item>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawElement {
    pub text: String,
    pub attrs: Vec<(String, String)>,
}

/// An `<item>` with its child elements keyed by qualified name.
///
/// When an element name repeats inside one item, the first occurrence wins.
/// Text that could not be unescaped marks the item as malformed instead of
/// failing the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    elements: HashMap<String, RawElement>,
    malformed: Option<String>,
}

impl RawItem {
    /// Trimmed text of a child element, `None` if absent or empty.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.elements
            .get(name)
            .map(|el| el.text.trim())
            .filter(|text| !text.is_empty())
    }

    /// Attribute value of a child element, `None` if absent or empty.
    pub fn attr(&self, name: &str, attr: &str) -> Option<&str> {
        self.elements.get(name).and_then(|el| {
            el.attrs
                .iter()
                .find(|(key, _)| key == attr)
                .map(|(_, value)| value.trim())
                .filter(|value| !value.is_empty())
        })
    }

    /// Why the item cannot be trusted, if anything went wrong while reading it.
    pub fn malformed(&self) -> Option<&str> {
        self.malformed.as_deref()
    }

    fn insert(&mut self, name: String, element: RawElement) {
        self.elements.entry(name).or_insert(element);
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn element_attrs(start: &BytesStart<'_>) -> Vec<(String, String)> {
    start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect()
}

/// Extracts every `<item>` from an RSS document.
///
/// # Errors
///
/// * [`Error::Parse`] - if the document is not well-formed XML
///
/// A bad entity reference inside an item (`&hellip;` and other HTML entities
/// that XML does not define) only marks that item, see [`RawItem::malformed`].
pub fn parse_items(xml: &str) -> Result<Vec<RawItem>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<RawItem> = None;
    // Element of the current item whose text is being collected
    let mut field: Option<(String, RawElement)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = element_name(e);
                if name == "item" {
                    current = Some(RawItem::default());
                    field = None;
                } else if current.is_some() && field.is_none() {
                    field = Some((
                        name,
                        RawElement {
                            text: String::new(),
                            attrs: element_attrs(e),
                        },
                    ));
                }
            }
            Ok(Event::Empty(ref e)) => {
                if let (Some(item), None) = (current.as_mut(), field.as_ref()) {
                    item.insert(
                        element_name(e),
                        RawElement {
                            text: String::new(),
                            attrs: element_attrs(e),
                        },
                    );
                }
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(item), Some((name, element))) = (current.as_mut(), field.as_mut()) {
                    match e.unescape() {
                        Ok(text) => element.text.push_str(&text),
                        Err(err) => {
                            if item.malformed.is_none() {
                                item.malformed = Some(format!("bad text in <{}>: {}", name, err));
                            }
                        }
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some((_, element)) = field.as_mut() {
                    element.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "item" {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                    field = None;
                } else if field.as_ref().is_some_and(|(open, _)| *open == name) {
                    if let (Some(item), Some((open, element))) = (current.as_mut(), field.take()) {
                        item.insert(open, element);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::parse(format!(
                    "Malformed feed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(items)
}

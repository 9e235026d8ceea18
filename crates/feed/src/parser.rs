// ABOUTME: RSS/Atom item extraction built on quick-xml events, tolerant of unescaped HTML inside item fields.
// ABOUTME: Items missing a guid, title or link are dropped; text fields are entity-decoded and tag-stripped.

use std::collections::HashMap;

use newsdesk_scraper::text::{collapse_whitespace, decode_entities, strip_weird_characters};
use once_cell::sync::Lazy;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::error::FeedError;
use crate::models::RssFeedItem;

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

// Only real tag shapes, so a bare `<` or `>` in prose survives.
static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<(?:script|style)\b.*?</(?:script|style)\s*>|</?[A-Za-z][A-Za-z0-9:-]*(?:\s[^<>]*)?/?>").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

impl FeedFormat {
    fn item_tag(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "item",
            FeedFormat::Atom => "entry",
        }
    }
}

/// Sniffs the format from the raw document.
pub fn detect_format(xml: &str) -> Option<FeedFormat> {
    if xml.contains("<rss") {
        Some(FeedFormat::Rss)
    } else if xml.contains("<feed") && xml.contains(ATOM_NAMESPACE) {
        Some(FeedFormat::Atom)
    } else {
        None
    }
}

/// Parses every item of an RSS or Atom document.
pub fn parse_feed_xml(xml: &str) -> Result<Vec<RssFeedItem>, FeedError> {
    let format = detect_format(xml).ok_or(FeedError::UnsupportedFormat)?;
    parse_items(xml, format)
}

/// Raw text collected for one item, keyed by the child element it appeared under.
#[derive(Debug, Default)]
struct ItemFields {
    text: HashMap<String, String>,
    link_href: Option<String>,
}

impl ItemFields {
    fn push(&mut self, key: &str, text: &str) {
        self.text.entry(key.to_string()).or_default().push_str(text);
    }

    fn raw(&self, key: &str) -> Option<String> {
        self.text
            .get(key)
            .map(|v| decode_entities(v.trim()))
            .filter(|v| !v.is_empty())
    }

    fn cleaned(&self, key: &str) -> Option<String> {
        self.text
            .get(key)
            .map(|v| clean_field(v))
            .filter(|v| !v.is_empty())
    }

    fn into_item(self, format: FeedFormat) -> Option<RssFeedItem> {
        let item = match format {
            FeedFormat::Rss => {
                let link = self.raw("link");
                RssFeedItem {
                    guid: self.raw("guid").or_else(|| link.clone())?,
                    title: self.cleaned("title")?,
                    link: link?,
                    description: self.cleaned("description"),
                    pub_date: self.raw("pubdate").or_else(|| self.raw("dc:date")),
                    author: self.raw("author").or_else(|| self.raw("dc:creator")),
                }
            }
            FeedFormat::Atom => RssFeedItem {
                guid: self.raw("id")?,
                title: self.cleaned("title")?,
                link: self.link_href.clone().filter(|l| !l.is_empty())?,
                description: self.cleaned("summary").or_else(|| self.cleaned("content")),
                pub_date: self.raw("published").or_else(|| self.raw("updated")),
                author: self.raw("author/name"),
            },
        };
        Some(item)
    }
}

/// Flattens a text field: markup (including markup that arrived entity-escaped)
/// is removed, then HTML entities are decoded and whitespace collapsed.
fn clean_field(text: &str) -> String {
    let stripped = strip_weird_characters(text);
    let without_tags = MARKUP_TAG.replace_all(&stripped, " ");
    collapse_whitespace(&strip_weird_characters(&decode_entities(&without_tags)))
}

/// Text for an entity reference: character references and the five XML
/// entities resolve here, anything else (`&nbsp;`) is kept for HTML decoding.
fn resolve_reference(e: &BytesRef) -> String {
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        return ch.to_string();
    }
    let name = lossy(e);
    match resolve_predefined_entity(&name) {
        Some(resolved) => resolved.to_string(),
        None => format!("&{};", name),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn qualified_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name.as_bytes())
        .map(|attr| decode_entities(&String::from_utf8_lossy(&attr.value)))
}

fn parse_items(xml: &str, format: FeedFormat) -> Result<Vec<RssFeedItem>, FeedError> {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;

    let item_tag = format.item_tag();
    let mut items = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    // Depth of the open item element, if any.
    let mut item_depth: Option<usize> = None;
    let mut fields = ItemFields::default();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                if items.is_empty() && item_depth.is_none() {
                    return Err(FeedError::parse(err));
                }
                tracing::debug!(error = %err, parsed = items.len(), "stopping at malformed feed markup");
                break;
            }
        };

        match event {
            Event::Start(ref e) => {
                let name = qualified_name(e);
                stack.push(name.clone());
                match item_depth {
                    None if name == item_tag => {
                        item_depth = Some(stack.len());
                        fields = ItemFields::default();
                    }
                    Some(depth) => {
                        if format == FeedFormat::Atom && name == "link" && stack.len() == depth + 1 {
                            record_link(&mut fields, e);
                        }
                        if stack.len() > depth + 1 {
                            // nested markup inside a field
                            if let Some(key) = field_key(&stack, depth) {
                                fields.push(&key, " ");
                            }
                        }
                    }
                    None => {}
                }
            }
            Event::Empty(ref e) => {
                if let Some(depth) = item_depth {
                    if format == FeedFormat::Atom
                        && qualified_name(e) == "link"
                        && stack.len() == depth
                    {
                        record_link(&mut fields, e);
                    }
                }
            }
            Event::Text(ref e) => push_text(&mut fields, &stack, item_depth, &lossy(e)),
            Event::CData(ref e) => push_text(&mut fields, &stack, item_depth, &lossy(e)),
            Event::GeneralRef(ref e) => {
                push_text(&mut fields, &stack, item_depth, &resolve_reference(e))
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
                // Unclosed tags (`<br>`) are dropped when an enclosing element closes.
                let Some(pos) = stack.iter().rposition(|open| *open == name) else {
                    continue;
                };
                if let Some(depth) = item_depth {
                    if pos < depth {
                        if let Some(item) = std::mem::take(&mut fields).into_item(format) {
                            items.push(item);
                        }
                        item_depth = None;
                    }
                }
                stack.truncate(pos);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

/// Key for text at the current position: the item child's name, with
/// `author/<child>` for structured Atom authors.
fn field_key(stack: &[String], item_depth: usize) -> Option<String> {
    let child = stack.get(item_depth)?;
    if child == "author" && stack.len() > item_depth + 1 {
        let leaf = stack.last()?;
        return Some(format!("author/{}", leaf));
    }
    Some(child.clone())
}

fn push_text(fields: &mut ItemFields, stack: &[String], item_depth: Option<usize>, text: &str) {
    let Some(depth) = item_depth else {
        return;
    };
    if let Some(key) = field_key(stack, depth) {
        fields.push(&key, text);
    }
}

fn record_link(fields: &mut ItemFields, e: &BytesStart) {
    if fields.link_href.is_some() {
        return;
    }
    if let Some(href) = attribute(e, "href").filter(|h| !h.trim().is_empty()) {
        fields.link_href = Some(href.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn detects_formats() {
        assert_eq!(detect_format("<rss version=\"2.0\">"), Some(FeedFormat::Rss));
        assert_eq!(
            detect_format(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#),
            Some(FeedFormat::Atom)
        );
        assert_eq!(detect_format("<feed>"), None);
        assert_eq!(detect_format("<html></html>"), None);
    }

    #[test]
    fn rss_guid_falls_back_to_link() {
        let xml = r#"<rss><channel>
            <item><title>Only link</title><link>https://a.test/1</link></item>
            <item><title>No link</title><guid>g-2</guid></item>
        </channel></rss>"#;
        let items = parse_feed_xml(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].guid, "https://a.test/1");
    }

    #[test]
    fn unescaped_html_in_description_is_flattened() {
        let xml = r#"<rss><channel><item>
            <title>Budget &amp; taxes</title>
            <link>https://a.test/b?x=1&amp;y=2</link>
            <description>City <b>approves</b> plan<br> today</description>
        </item></channel></rss>"#;
        let items = parse_feed_xml(xml).unwrap();
        assert_eq!(items[0].title, "Budget & taxes");
        assert_eq!(items[0].link, "https://a.test/b?x=1&y=2");
        assert_eq!(items[0].description.as_deref(), Some("City approves plan today"));
    }

    #[test]
    fn escaped_markup_in_rss_fields_is_flattened() {
        let xml = r#"<rss><channel><item>
            <title>Rates &lt; 5% &gt; forecast</title>
            <link>https://a.test/rates</link>
            <description>&lt;p&gt;Council votes&lt;/p&gt;</description>
        </item><item>
            <title>Parking &amp;amp; transit</title>
            <link>https://a.test/parking</link>
            <description><![CDATA[<p>Fees rise&nbsp;<em>again</em></p>]]></description>
        </item></channel></rss>"#;
        let items = parse_feed_xml(xml).unwrap();
        assert_eq!(items[0].title, "Rates < 5% > forecast");
        assert_eq!(items[0].description.as_deref(), Some("Council votes"));
        assert_eq!(items[1].title, "Parking & transit");
        assert_eq!(items[1].description.as_deref(), Some("Fees rise again"));
    }

    #[test]
    fn escaped_markup_in_atom_summary_and_content_is_flattened() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
        <entry>
            <id>tag:a.test,2024:1</id><title type="html">Zoning &lt;em&gt;update&lt;/em&gt;</title>
            <link href="https://a.test/e1"/>
            <summary type="html">&lt;p&gt;Height limits &amp;amp; setbacks&lt;/p&gt;</summary>
        </entry>
        <entry>
            <id>tag:a.test,2024:2</id><title>Library hours</title>
            <link href="https://a.test/e2"/>
            <content type="html">&lt;b&gt;Open&lt;/b&gt; until 9&#160;pm</content>
        </entry></feed>"#;
        let items = parse_feed_xml(xml).unwrap();
        assert_eq!(items[0].title, "Zoning update");
        assert_eq!(
            items[0].description.as_deref(),
            Some("Height limits & setbacks")
        );
        assert_eq!(items[1].description.as_deref(), Some("Open until 9 pm"));
    }

    #[test]
    fn atom_author_name_only() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <id>tag:a.test,2024:1</id><title>Entry</title>
            <link rel="alternate" href="https://a.test/e1"/>
            <author><name>Sam Lee</name><email>sam@a.test</email></author>
            <updated>2024-01-02T00:00:00Z</updated>
        </entry></feed>"#;
        let items = parse_feed_xml(xml).unwrap();
        assert_eq!(items[0].author.as_deref(), Some("Sam Lee"));
        assert_eq!(items[0].pub_date.as_deref(), Some("2024-01-02T00:00:00Z"));
    }

    #[test]
    fn unsupported_format_errors() {
        assert!(matches!(
            parse_feed_xml("<html><body>nope</body></html>"),
            Err(FeedError::UnsupportedFormat)
        ));
    }
}

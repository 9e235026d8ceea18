// ABOUTME: Metadata field extraction: baseline page metadata and the rule-driven configured fields.
// ABOUTME: Configured fields try meta names, then meta properties, then host regexes; first cleaned match wins.

//! Field extraction.
//!
//! Two passes run over every resolved page:
//! - `extract_base_metadata` reads the title tag, the usual named/property meta
//!   tags, the canonical link, `og:image` entries and the declared language.
//! - `extract_configured_fields` applies the host's `DomainRules`.
//!
//! Meta names and properties are matched case-insensitively. Regexes run
//! against the raw markup and use capture group 1 when present.

use scraper::{Html, Selector};

use once_cell::sync::Lazy;

use crate::extractors::compiled;
use crate::rules::{DomainRules, FieldRules};
use crate::text::{clean_extracted_value, sanitize_summary};
use crate::urls::resolve_url;

/// Upper bound on collected `og:image` URLs.
pub const MAX_IMAGES: usize = 10;

static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static HTML_LANG: Lazy<Selector> = Lazy::new(|| Selector::parse("html[lang]").unwrap());
static LINK_REL: Lazy<Selector> = Lazy::new(|| Selector::parse("link[rel][href]").unwrap());

/// Metadata every HTML page is mined for, independent of host rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub site_name: Option<String>,
    pub publish_date: Option<String>,
    pub language: Option<String>,
    pub canonical_url: Option<String>,
    pub images: Vec<String>,
}

/// Values produced by the host's field rules; empty strings mean "no match".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfiguredFields {
    pub title: String,
    pub summary: String,
    pub author: String,
    pub publication: String,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Content of the first `<meta>` whose `attr` equals `value` (case-insensitive)
/// and whose `content` is non-empty.
pub fn meta_content(doc: &Html, attr: &str, value: &str) -> Option<String> {
    doc.select(&META)
        .filter(|el| {
            el.value()
                .attr(attr)
                .map(|v| v.trim().eq_ignore_ascii_case(value))
                .unwrap_or(false)
        })
        .find_map(|el| el.value().attr("content").and_then(non_empty))
}

fn meta_all(doc: &Html, attr: &str, value: &str) -> Vec<String> {
    doc.select(&META)
        .filter(|el| {
            el.value()
                .attr(attr)
                .map(|v| v.trim().eq_ignore_ascii_case(value))
                .unwrap_or(false)
        })
        .filter_map(|el| el.value().attr("content").and_then(non_empty))
        .collect()
}

/// Extracts baseline metadata; `base_url` resolves a relative canonical link.
pub fn extract_base_metadata(doc: &Html, base_url: &str) -> BaseMetadata {
    let title = doc
        .select(&TITLE)
        .next()
        .and_then(|el| non_empty(&el.text().collect::<String>()));

    let author = meta_content(doc, "name", "author")
        .or_else(|| meta_content(doc, "property", "article:author"));
    let description = meta_content(doc, "name", "description")
        .or_else(|| meta_content(doc, "property", "og:description"));

    let language = doc
        .select(&HTML_LANG)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .and_then(non_empty);

    let canonical_url = doc
        .select(&LINK_REL)
        .find(|el| {
            el.value()
                .attr("rel")
                .map(|rel| rel.trim().eq_ignore_ascii_case("canonical"))
                .unwrap_or(false)
        })
        .and_then(|el| el.value().attr("href"))
        .and_then(non_empty)
        .and_then(|href| resolve_url(base_url, &href));

    let mut images = meta_all(doc, "property", "og:image");
    images.truncate(MAX_IMAGES);

    BaseMetadata {
        title,
        description,
        author,
        site_name: meta_content(doc, "property", "og:site_name"),
        publish_date: meta_content(doc, "property", "article:published_time"),
        language,
        canonical_url,
        images,
    }
}

fn match_meta_by_attr(doc: &Html, attr: &str, values: &[String]) -> Option<String> {
    values.iter().find_map(|value| {
        meta_all(doc, attr, value)
            .into_iter()
            .map(|raw| clean_extracted_value(&raw))
            .find(|cleaned| !cleaned.is_empty())
    })
}

fn match_regexes(raw_html: &str, patterns: &[String]) -> Option<String> {
    for pattern in patterns {
        let Some(re) = compiled::get_or_compile(pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(raw_html) {
            let candidate = caps
                .get(1)
                .filter(|m| !m.as_str().is_empty())
                .or_else(|| caps.get(0))
                .map(|m| m.as_str())
                .unwrap_or("");
            let cleaned = clean_extracted_value(candidate);
            if !cleaned.is_empty() {
                return Some(cleaned);
            }
        }
    }
    None
}

/// Applies one field's rules in order: meta names, meta properties, regexes.
pub fn extract_field(doc: &Html, raw_html: &str, rules: Option<&FieldRules>) -> String {
    let Some(rules) = rules else {
        return String::new();
    };
    match_meta_by_attr(doc, "name", &rules.meta_names)
        .or_else(|| match_meta_by_attr(doc, "property", &rules.meta_properties))
        .or_else(|| match_regexes(raw_html, &rules.regexes))
        .unwrap_or_default()
}

/// Runs every configured field rule against the page.
pub fn extract_configured_fields(
    doc: &Html,
    raw_html: &str,
    rules: &DomainRules,
    summary_max_length: usize,
) -> ConfiguredFields {
    ConfiguredFields {
        title: clean_extracted_value(&extract_field(doc, raw_html, rules.title.as_ref())),
        summary: sanitize_summary(
            &extract_field(doc, raw_html, rules.summary.as_ref()),
            summary_max_length,
        ),
        author: clean_extracted_value(&extract_field(doc, raw_html, rules.author.as_ref())),
        publication: clean_extracted_value(&extract_field(
            doc,
            raw_html,
            rules.publication.as_ref(),
        )),
    }
}

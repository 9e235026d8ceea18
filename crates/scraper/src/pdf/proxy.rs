// ABOUTME: Parser for the readability proxy's plain-text response (Title/URL Source/Author/date headers + markdown body).
// ABOUTME: Derives the document text and a summary from the first sufficiently long paragraph.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::{clean_extracted_value, sanitize_summary};
use crate::urls::hostname;

static TITLE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Title:\s*(.+)$").unwrap());
static SOURCE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^URL Source:\s*(https?://\S+)\s*$").unwrap());
static AUTHOR_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Author:\s*(.+)$").unwrap());
static DATE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:Published Time|Updated Time|Date):\s*(.+)$").unwrap());
static MARKDOWN_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Markdown Content:\s*(.+)").unwrap());
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Paragraphs longer than this are preferred for the summary.
const SUMMARY_PARAGRAPH_MIN: usize = 80;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyDocument {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub text: String,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
    pub author: Option<String>,
}

fn header(re: &Regex, raw: &str) -> Option<String> {
    re.captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a proxy response. Blank input yields `None`.
pub fn parse_proxy_document(raw: &str, summary_max_length: usize) -> Option<ProxyDocument> {
    if raw.trim().is_empty() {
        return None;
    }

    let markdown = MARKDOWN_BODY
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let text = clean_extracted_value(if markdown.is_empty() {
        raw
    } else {
        markdown.as_str()
    });

    let paragraphs: Vec<String> = if markdown.is_empty() {
        text.lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        PARAGRAPH_BREAK
            .split(&markdown)
            .map(clean_extracted_value)
            .filter(|p| !p.is_empty())
            .collect()
    };

    let chosen = paragraphs
        .iter()
        .find(|p| p.chars().count() > SUMMARY_PARAGRAPH_MIN)
        .or_else(|| paragraphs.first())
        .map(String::as_str)
        .unwrap_or("");
    let summary_source = if chosen.is_empty() { text.as_str() } else { chosen };
    let summary = sanitize_summary(summary_source, summary_max_length);

    Some(ProxyDocument {
        title: header(&TITLE_LINE, raw),
        summary: if summary.is_empty() { None } else { Some(summary) },
        text,
        site_name: header(&SOURCE_LINE, raw).and_then(|url| hostname(&url)),
        published_time: header(&DATE_LINE, raw),
        author: header(&AUTHOR_LINE, raw),
    })
}

// ABOUTME: Library-backed PDF text extraction (lopdf) plus document info metadata (title, author, keywords, dates).
// ABOUTME: Info strings are decoded from UTF-16BE when BOM-prefixed, otherwise as PDFDocEncoding/Latin-1.

use lopdf::{Dictionary, Document, Object};

use crate::pdf::date::parse_pdf_date;
use crate::text::{clean_extracted_value, first_non_empty};

/// Document info fields the pipeline uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub publish_date: Option<String>,
}

impl PdfInfo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.keywords.is_none()
            && self.publish_date.is_none()
    }

    /// Keywords split on commas/semicolons, for `metadata.tags`.
    pub fn tags(&self) -> Vec<String> {
        self.keywords
            .as_deref()
            .map(|k| {
                k.split([',', ';'])
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Text plus info from a successful library parse.
#[derive(Debug, Clone, Default)]
pub struct LibraryOutput {
    pub text: String,
    pub info: PdfInfo,
}

/// Decodes a PDF text string.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_string(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(decode_text_string(name)),
        _ => None,
    }
}

/// Reads title, author, keywords and the creation (else modification) date.
pub fn read_info(doc: &Document) -> PdfInfo {
    let Some(dict) = info_dictionary(doc) else {
        return PdfInfo::default();
    };
    let title = info_string(dict, b"Title");
    let author = info_string(dict, b"Author");
    let keywords = info_string(dict, b"Keywords");
    let created = info_string(dict, b"CreationDate").filter(|d| !d.trim().is_empty());
    let modified = info_string(dict, b"ModDate").filter(|d| !d.trim().is_empty());

    PdfInfo {
        title: first_non_empty([title.as_deref()]),
        author: first_non_empty([author.as_deref()]),
        keywords: first_non_empty([keywords.as_deref()]),
        publish_date: created.or(modified).as_deref().and_then(parse_pdf_date),
    }
}

/// Parses `bytes` with lopdf and extracts the text of every page.
///
/// A document that loads but yields no text still returns its info, so the
/// caller can keep the metadata while falling back for text.
pub fn extract(bytes: &[u8]) -> Result<LibraryOutput, anyhow::Error> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| anyhow::anyhow!("PDF library failed to load document: {}", e))?;
    let info = read_info(&doc);

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(LibraryOutput {
            text: String::new(),
            info,
        });
    }

    let raw = doc
        .extract_text(&pages)
        .map_err(|e| anyhow::anyhow!("PDF library failed to extract text: {}", e))?;

    Ok(LibraryOutput {
        text: clean_extracted_value(&raw),
        info,
    })
}

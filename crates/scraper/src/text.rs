// ABOUTME: Text and markup utilities shared by every extractor: entity decoding, tag stripping, sanitizing.
// ABOUTME: Also owns the summary helpers (character cap with ellipsis, word budget, de-gluing normalization).

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Default summary character cap.
pub const MAX_SUMMARY_LENGTH: usize = 400;

/// Hard cap on extracted PDF text.
pub const MAX_PDF_TEXT_LENGTH: usize = 20_000;

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script.*?</script>").unwrap());
static STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style.*?</style>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static LOWER_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());
static LETTER_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z])(\d)").unwrap());
static DIGIT_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)([A-Za-z])").unwrap());
static GLUED_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-z])(Abstract|This|The|These|We|Our|In|For|By|With|However|Despite)").unwrap()
});

/// Named entities understood by the extractors, matched case-insensitively.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("nbsp", " "),
    ("quot", "\""),
    ("apos", "'"),
    ("rsquo", "\u{2019}"),
    ("lsquo", "\u{2018}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("hellip", "\u{2026}"),
];

/// Decodes numeric (`&#38;`, `&#x26;`) and the supported named entities.
///
/// Unknown or malformed references are left untouched. Named entities are
/// resolved after numeric ones, so `&#38;amp;` decodes all the way to `&`.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let numeric = decode_numeric_entities(s);
    decode_named_entities(&numeric)
}

fn decode_numeric_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("&#") {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 2..];
        let (is_hex, digits_start) = match tail.as_bytes().first() {
            Some(b'x') | Some(b'X') => (true, 1),
            _ => (false, 0),
        };
        let digits: &str = {
            let body = &tail[digits_start..];
            let len = body
                .bytes()
                .take_while(|b| {
                    if is_hex {
                        b.is_ascii_hexdigit()
                    } else {
                        b.is_ascii_digit()
                    }
                })
                .count();
            &body[..len]
        };
        let after = &tail[digits_start + digits.len()..];

        let decoded = if !digits.is_empty() && after.starts_with(';') {
            let code = if is_hex {
                u32::from_str_radix(digits, 16).ok()
            } else {
                digits.parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
        } else {
            None
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &after[1..];
            }
            None => {
                out.push_str("&#");
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_named_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    'outer: while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        if let Some(end) = tail.find(';') {
            let name = &tail[..end];
            for (entity, replacement) in NAMED_ENTITIES {
                if name.eq_ignore_ascii_case(entity) {
                    out.push_str(replacement);
                    rest = &tail[end + 1..];
                    continue 'outer;
                }
            }
        }
        out.push('&');
        rest = tail;
    }
    out.push_str(rest);
    out
}

/// Normalizes text to NFKC and removes characters that render as garbage.
///
/// Rust strings cannot carry lone surrogates, so decoders upstream already
/// replace them with U+FFFD, which is mapped to a space here along with C0/C1
/// controls (tab, LF and CR excepted), line/paragraph separators and the
/// private-use area. Zero-width characters and the BOM are dropped.
pub fn strip_weird_characters(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    let mut out = String::with_capacity(s.len());
    for c in s.nfkc() {
        match c {
            '\u{0000}'..='\u{0008}'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{000E}'..='\u{001F}'
            | '\u{007F}'..='\u{009F}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{E000}'..='\u{F8FF}'
            | '\u{FFFD}' => out.push(' '),
            '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Removes script/style blocks and every remaining tag, replacing each with a space.
pub fn strip_tags(s: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(s, " ");
    let without_styles = STYLE_BLOCK.replace_all(&without_scripts, " ");
    ANY_TAG.replace_all(&without_styles, " ").into_owned()
}

/// Collapses every whitespace run into a single space and trims the ends.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Sanitizer applied to every extracted free-text value.
pub fn clean_extracted_value(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let without_tags = strip_tags(&strip_weird_characters(text));
    let without_control = strip_weird_characters(&without_tags);
    let decoded = strip_weird_characters(&decode_entities(&without_control));
    collapse_whitespace(&decoded)
}

/// Cleans a summary and caps it at `max_length` characters.
///
/// Over-long summaries keep `max_length - 1` characters, trimmed, plus `…`.
pub fn sanitize_summary(text: &str, max_length: usize) -> String {
    let cleaned = clean_extracted_value(text);
    if cleaned.chars().count() <= max_length {
        return cleaned;
    }
    let head: String = cleaned.chars().take(max_length.saturating_sub(1)).collect();
    format!("{}\u{2026}", head.trim())
}

/// Word budget for summaries synthesized from body text.
pub fn summary_word_limit(max_length: usize) -> usize {
    let fifth = (max_length as f64 / 5.0).round() as usize;
    fifth.max(60)
}

/// Splits words glued together by layout-less extraction (`fooBar`, `page12`, `endThe`).
pub fn normalize_for_summary(text: &str) -> String {
    let stripped = strip_weird_characters(text);
    let step = LOWER_UPPER.replace_all(&stripped, "$1 $2");
    let step = LETTER_DIGIT.replace_all(&step, "$1 $2");
    let step = DIGIT_LETTER.replace_all(&step, "$1 $2");
    let step: Cow<'_, str> = GLUED_KEYWORD.replace_all(&step, "$1 $2");
    step.into_owned()
}

/// Builds a summary from the first words of `text`.
pub fn create_summary_from_text(text: &str, max_length: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let normalized = normalize_for_summary(text);
    let words: Vec<&str> = normalized
        .split_whitespace()
        .take(summary_word_limit(max_length))
        .collect();
    sanitize_summary(&words.join(" "), max_length)
}

/// Truncates to `max_chars` characters, appending `…` when anything was cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}\u{2026}", head.trim())
}

/// Returns the first candidate that survives `clean_extracted_value`.
pub fn first_non_empty<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(clean_extracted_value)
        .find(|v| !v.is_empty())
}

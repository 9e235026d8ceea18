// ABOUTME: Manual PDF text recovery: walks stream/endstream regions, inflates Flate streams, decodes Tj/TJ operators.
// ABOUTME: Used when the PDF library fails or returns nothing; positive TJ adjustments become word spaces.

use std::io::Read;

use flate2::read::ZlibDecoder;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::text::clean_extracted_value;

static SHOW_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\(([^()\\]*(?:\\.[^()\\]*)*)\)\s*T[Jj]").unwrap());
static SHOW_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]\s*TJ").unwrap());
static ARRAY_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\(([^()\\]*(?:\\.[^()\\]*)*)\)|(-?\d+(?:\.\d+)?)").unwrap()
});
static FILTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"/Filter\s*(\[[^\]]*\]|\S+)").unwrap());
static LINE_TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\x0B\x0C\r]+\n").unwrap());

const STREAM: &[u8] = b"stream";
const ENDSTREAM: &[u8] = b"endstream";

fn find(hay: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= hay.len() {
        return None;
    }
    hay[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn rfind(hay: &[u8], needle: &[u8], before: usize) -> Option<usize> {
    hay[..before.min(hay.len())]
        .windows(needle.len())
        .rposition(|w| w == needle)
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Inflates the stream when its dictionary declares `/FlateDecode`.
///
/// Undecodable data is returned as-is.
fn apply_filters(dict: &str, data: &[u8]) -> Vec<u8> {
    let declares_flate = FILTER
        .find(dict)
        .map(|m| m.as_str().contains("/FlateDecode"))
        .unwrap_or(false);
    if !declares_flate {
        return data.to_vec();
    }
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => out,
        Err(err) => {
            tracing::debug!(error = %err, "flate stream did not inflate");
            data.to_vec()
        }
    }
}

/// Decodes a PDF literal string body (without the surrounding parentheses).
pub fn decode_pdf_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            break;
        };
        match next {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            '(' | ')' | '\\' | '/' => out.push(next),
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if let Some(decoded) = char::from_u32(value) {
                    out.push(decoded);
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

fn decode_stream_text(content: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    for caps in SHOW_TEXT.captures_iter(content) {
        if let Some(inner) = caps.get(1) {
            if !inner.as_str().is_empty() {
                parts.push(decode_pdf_string(inner.as_str()));
            }
        }
    }

    for array in SHOW_ARRAY.find_iter(content) {
        for token in ARRAY_TOKEN.captures_iter(array.as_str()) {
            if let Some(text) = token.get(1) {
                parts.push(decode_pdf_string(text.as_str()));
            } else if let Some(number) = token.get(2) {
                let adjustment: f64 = number.as_str().parse().unwrap_or(0.0);
                if adjustment > 0.0 {
                    parts.push(" ".to_string());
                }
            }
        }
    }

    parts.concat()
}

/// Recovers text from every content stream in a raw PDF.
pub fn extract_text_from_streams(raw: &[u8]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut cursor = 0usize;

    while let Some(stream_idx) = find(raw, STREAM, cursor) {
        let dict_floor = rfind(raw, b"obj", stream_idx).unwrap_or(0).max(cursor);
        let Some(dict_start) = rfind(raw, b"<<", stream_idx).filter(|&i| i >= dict_floor) else {
            cursor = stream_idx + STREAM.len();
            continue;
        };
        let dict = latin1(&raw[dict_start..stream_idx]);

        let mut data_start = stream_idx + STREAM.len();
        if raw.get(data_start..data_start + 2) == Some(&b"\r\n"[..]) {
            data_start += 2;
        } else if raw.get(data_start) == Some(&b'\n') {
            data_start += 1;
        }

        let Some(end_idx) = find(raw, ENDSTREAM, data_start) else {
            break;
        };

        // One EOL marker precedes `endstream`; binary data may itself end in CR/LF.
        let mut data = &raw[data_start..end_idx];
        if let Some(rest) = data.strip_suffix(b"\r\n") {
            data = rest;
        } else if let Some(rest) = data
            .strip_suffix(b"\n")
            .or_else(|| data.strip_suffix(b"\r"))
        {
            data = rest;
        }

        let decoded = apply_filters(&dict, data);
        let stream_text = decode_stream_text(&latin1(&decoded));
        if !stream_text.trim().is_empty() {
            parts.push(stream_text);
        }

        cursor = end_idx + ENDSTREAM.len();
    }

    let joined = parts.join("\n");
    clean_extracted_value(&LINE_TRAILING_SPACE.replace_all(&joined, "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn pdf_with_stream(dict: &str, data: &[u8]) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n4 0 obj\n".to_vec();
        out.extend_from_slice(dict.as_bytes());
        out.extend_from_slice(b"\nstream\n");
        out.extend_from_slice(data);
        out.extend_from_slice(b"\nendstream\nendobj\n%%EOF\n");
        out
    }

    #[test]
    fn decodes_escapes_and_octal() {
        assert_eq!(decode_pdf_string(r"a\(b\)c\\d\/e"), r"a(b)c\d/e");
        assert_eq!(decode_pdf_string(r"\101\102C"), "ABC");
        assert_eq!(decode_pdf_string(r"tab\there"), "tab\there");
        assert_eq!(decode_pdf_string(r"\q"), r"\q");
    }

    #[test]
    fn reads_plain_tj_operators() {
        let content = b"BT /F1 12 Tf (Hello) Tj ( world) Tj ET";
        let pdf = pdf_with_stream("<< /Length 40 >>", content);
        assert_eq!(extract_text_from_streams(&pdf), "Hello world");
    }

    #[test]
    fn tj_arrays_emit_space_on_positive_adjustment() {
        let content = b"BT [(Quar) -20 (terly) 250 (report)] TJ ET";
        let pdf = pdf_with_stream("<< /Length 44 >>", content);
        assert_eq!(extract_text_from_streams(&pdf), "Quarterly report");
    }

    #[test]
    fn inflates_flate_streams() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(b"BT (Compressed text survives) Tj ET")
            .unwrap();
        let compressed = encoder.finish().unwrap();
        let pdf = pdf_with_stream("<< /Length 99 /Filter /FlateDecode >>", &compressed);
        assert_eq!(extract_text_from_streams(&pdf), "Compressed text survives");
    }

    #[test]
    fn bad_flate_data_falls_back_to_raw() {
        let pdf = pdf_with_stream("<< /Filter [/FlateDecode] >>", b"(Not really) Tj");
        assert_eq!(extract_text_from_streams(&pdf), "Not really");
    }

    #[test]
    fn no_streams_yields_empty() {
        assert_eq!(extract_text_from_streams(b"%PDF-1.4 nothing here"), "");
        assert_eq!(extract_text_from_streams(b""), "");
    }
}

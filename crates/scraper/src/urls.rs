// ABOUTME: URL helpers: normalization used as the cache key, scrape type inference, host lookup, relative resolution.
// ABOUTME: Also builds the AMP fallback candidates and the readability proxy URL.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::result::ScrapeType;

static PDF_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf($|[?#])").unwrap());
static BITSTREAM_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/bitstreams/[^/]+/content$").unwrap());
static PDF_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:^|[-_])pdf(?:$|[-_])").unwrap());
static PDF_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)/pdf($|/)").unwrap());

/// Round-trips a URL through the parser. Unparsable input is returned unchanged.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.to_string(),
    }
}

/// Infers the scrape type from URL shape alone.
pub fn detect_type_from_url(url: &str) -> ScrapeType {
    let candidate = url.trim();

    if PDF_EXTENSION.is_match(candidate) {
        return ScrapeType::Pdf;
    }

    if let Ok(parsed) = Url::parse(candidate) {
        let path = parsed.path().to_lowercase();

        if path.contains("/pdf/") || path.ends_with("/pdf") || BITSTREAM_CONTENT.is_match(&path) {
            return ScrapeType::Pdf;
        }

        let last_segment = path.rsplit('/').next().unwrap_or("");
        if !last_segment.contains('.') && PDF_TOKEN.is_match(last_segment) {
            return ScrapeType::Pdf;
        }

        for (_, value) in parsed.query_pairs() {
            let lowered = value.to_lowercase();
            if lowered == "pdf" || lowered.ends_with(".pdf") || lowered.contains("/pdf/") {
                return ScrapeType::Pdf;
            }
        }
    }

    if PDF_SEGMENT.is_match(candidate) {
        return ScrapeType::Pdf;
    }

    ScrapeType::Html
}

/// Hostname of `url`, if it parses and has one.
pub fn hostname(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Resolves `relative` against `base`.
pub fn resolve_url(base: &str, relative: &str) -> Option<String> {
    let joined = match Url::parse(base) {
        Ok(b) => b.join(relative).ok(),
        Err(_) => Url::parse(relative).ok(),
    };
    joined.map(|u| u.to_string())
}

/// Alternate URLs tried, in order, when the original answers with a challenge page.
///
/// `outputType=amp`, then `output=amp`, then an `/amp/` path suffix unless the
/// path already ends in `/amp`. Duplicates are removed; malformed input yields none.
pub fn build_fallback_urls(original: &str) -> Vec<String> {
    let base = match Url::parse(original) {
        Ok(u) => u,
        Err(_) => return Vec::new(),
    };

    let mut candidates = vec![
        with_query_param(&base, "outputType", "amp"),
        with_query_param(&base, "output", "amp"),
    ];

    let path = base.path();
    if !path.ends_with("/amp/") && !path.ends_with("/amp") {
        let mut amp_path = base.clone();
        let trimmed = path.strip_suffix('/').unwrap_or(path);
        amp_path.set_path(&format!("{}/amp/", trimmed));
        candidates.push(amp_path.to_string());
    }

    let mut seen = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !seen.contains(&candidate) {
            seen.push(candidate);
        }
    }
    seen
}

/// Sets `key` to `value`: the first existing pair keeps its position, later
/// duplicates are dropped, and a missing key is appended.
fn with_query_param(base: &Url, key: &str, value: &str) -> String {
    let mut out = base.clone();
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (k, v) in base.query_pairs() {
        if k == key {
            if !replaced {
                pairs.push((k.into_owned(), value.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((k.into_owned(), v.into_owned()));
        }
    }
    if !replaced {
        pairs.push((key.to_string(), value.to_string()));
    }
    out.query_pairs_mut().clear().extend_pairs(&pairs);
    out.to_string()
}

/// Readability proxy URL for `url` under `proxy_base` (e.g. `https://r.jina.ai/`).
///
/// Scheme-less targets are assumed to be https.
pub fn build_proxy_url(proxy_base: &str, url: &str) -> String {
    let target = url.trim();
    let base = if proxy_base.ends_with('/') {
        proxy_base.to_string()
    } else {
        format!("{}/", proxy_base)
    };
    if target.starts_with("http://") || target.starts_with("https://") {
        format!("{}{}", base, target)
    } else {
        format!("{}https://{}", base, target)
    }
}

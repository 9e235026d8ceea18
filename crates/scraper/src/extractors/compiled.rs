// ABOUTME: Process-wide cache of compiled, case-insensitive rule regexes.
// ABOUTME: Invalid patterns are cached as None and logged once, so one bad host rule never breaks extraction.

//! Regex caching for domain field rules.
//!
//! Rule patterns come from data, so compilation can fail at runtime. Each
//! pattern is compiled at most once; failures are remembered as `None`.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static REGEX_CACHE: Lazy<RwLock<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn compile(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(pattern, error = %err, "skipping invalid field rule regex");
            None
        }
    }
}

/// Gets or compiles a rule regex (case-insensitive).
///
/// Returns `None` for patterns that do not compile. Regex clones share their
/// compiled program, so handing out owned values is cheap.
pub fn get_or_compile(pattern: &str) -> Option<Regex> {
    {
        let cache = REGEX_CACHE.read().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(pattern) {
            return cached.clone();
        }
    }

    let mut cache = REGEX_CACHE.write().unwrap_or_else(|e| e.into_inner());
    if let Some(cached) = cache.get(pattern) {
        return cached.clone();
    }
    let compiled = compile(pattern);
    cache.insert(pattern.to_string(), compiled.clone());
    compiled
}

/// Warms the cache, e.g. after loading a rule registry.
pub fn precompile<I, S>(patterns: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cache = REGEX_CACHE.write().unwrap_or_else(|e| e.into_inner());
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !cache.contains_key(pattern) {
            let compiled = compile(pattern);
            cache.insert(pattern.to_string(), compiled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_pattern_is_case_insensitive() {
        let re = get_or_compile("<h1>([^<]+)</h1>").unwrap();
        assert!(re.is_match("<H1>Title</H1>"));
        assert!(get_or_compile("<h1>([^<]+)</h1>").is_some());
    }

    #[test]
    fn invalid_pattern_is_cached_as_none() {
        assert!(get_or_compile("([unclosed").is_none());
        assert!(get_or_compile("([unclosed").is_none());
    }

    #[test]
    fn precompile_warms_cache() {
        precompile(["<p>(.+)</p>", "(bad"]);
        assert!(get_or_compile("<p>(.+)</p>").is_some());
        assert!(get_or_compile("(bad").is_none());
    }
}

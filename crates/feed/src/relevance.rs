// ABOUTME: Keyword relevance scoring of feed items against a free-text criteria string.
// ABOUTME: Score is the percentage of criteria keywords found in title + description; relevant at 70 or more.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{RelevanceResult, RssFeedItem};

pub const RELEVANCE_THRESHOLD: u32 = 70;

static KEYWORD_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+AND\s+|\s+OR\s+|,").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Splits criteria on `AND`/`OR`/commas; a single resulting phrase is split
/// on whitespace instead, ignoring words of two characters or fewer.
pub fn extract_keywords(criteria: &str) -> Vec<String> {
    let keywords: Vec<String> = KEYWORD_SEPARATORS
        .split(criteria)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();

    if keywords.len() == 1 {
        return WHITESPACE
            .split(criteria)
            .map(str::trim)
            .filter(|k| k.chars().count() > 2)
            .map(str::to_string)
            .collect();
    }
    keywords
}

pub fn analyze_relevance(item: &RssFeedItem, criteria: &str) -> RelevanceResult {
    if criteria.trim().is_empty() {
        return RelevanceResult {
            is_relevant: true,
            score: 100,
            reason: "No criteria specified - accepting all".to_string(),
        };
    }

    let keywords = extract_keywords(criteria);
    let haystack = format!(
        "{} {}",
        item.title,
        item.description.as_deref().unwrap_or("")
    )
    .to_lowercase();

    let total = keywords.len();
    let matched = keywords
        .iter()
        .filter(|k| haystack.contains(&k.to_lowercase()))
        .count();
    let score = if total == 0 {
        0
    } else {
        ((matched as f64 / total as f64) * 100.0).round() as u32
    };
    let is_relevant = score >= RELEVANCE_THRESHOLD;

    RelevanceResult {
        is_relevant,
        score,
        reason: if is_relevant {
            format!("Matched {}/{} keywords", matched, total)
        } else {
            format!(
                "Only matched {}/{} keywords (threshold: {})",
                matched, total, RELEVANCE_THRESHOLD
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(title: &str, description: &str) -> RssFeedItem {
        RssFeedItem {
            guid: "g".into(),
            title: title.into(),
            link: "https://a.test/".into(),
            description: Some(description.into()),
            ..Default::default()
        }
    }

    #[test]
    fn blank_criteria_accepts_everything() {
        let r = analyze_relevance(&item("x", ""), "   ");
        assert!(r.is_relevant);
        assert_eq!(r.score, 100);
    }

    #[test]
    fn keyword_split_rules() {
        assert_eq!(
            extract_keywords("housing AND transit OR zoning, parks"),
            vec!["housing", "transit", "zoning", "parks"]
        );
        assert_eq!(
            extract_keywords("local news on housing"),
            vec!["local", "news", "housing"]
        );
    }

    #[test]
    fn all_keywords_match_is_full_score() {
        let r = analyze_relevance(
            &item("Housing vote", "The transit board met"),
            "housing, transit",
        );
        assert_eq!(r.score, 100);
        assert_eq!(r.reason, "Matched 2/2 keywords");
    }

    #[test]
    fn threshold_is_inclusive_at_seventy() {
        // 7 of 10 keywords
        let criteria = "k0,k1,k2,k3,k4,k5,k6,k7,k8,k9";
        let r = analyze_relevance(&item("k0 k1 k2 k3 k4 k5 k6", ""), criteria);
        assert_eq!(r.score, 70);
        assert!(r.is_relevant);

        // 69 of 100 keywords
        let criteria: Vec<String> = (0..100).map(|i| format!("w{:03}", i)).collect();
        let title: Vec<String> = (0..69).map(|i| format!("w{:03}", i)).collect();
        let r = analyze_relevance(&item(&title.join(" "), ""), &criteria.join(","));
        assert_eq!(r.score, 69);
        assert!(!r.is_relevant);
    }

    #[test]
    fn only_short_words_score_zero() {
        let r = analyze_relevance(&item("a b", ""), "a b");
        assert_eq!(r.score, 0);
        assert!(!r.is_relevant);
    }
}

// ABOUTME: Deterministic confidence scoring for HTML and PDF extractions.
// ABOUTME: Each contributing rule appends a named factor; the score is clamped to [0, 1].

use once_cell::sync::Lazy;
use regex::Regex;

static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

pub const FACTOR_LONG_TEXT: &str = "text_length>=800";
pub const FACTOR_SHORT_TEXT: &str = "text_length>=200";
pub const FACTOR_TITLE: &str = "title_present";
pub const FACTOR_DESCRIPTION: &str = "description_present";
pub const FACTOR_CANONICAL: &str = "canonical_present";
pub const FACTOR_LANGUAGE: &str = "language_detected";
pub const FACTOR_PARAGRAPHS: &str = "paragraph_structure";
pub const FACTOR_ASCII: &str = "mostly_readable_ascii";
pub const FACTOR_CHALLENGE: &str = "challenge_page_detected";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Confidence {
    pub score: f64,
    pub factors: Vec<String>,
}

impl Confidence {
    fn add(&mut self, weight: f64, factor: &str) {
        self.score += weight;
        self.factors.push(factor.to_string());
    }

    fn clamped(mut self) -> Self {
        self.score = self.score.clamp(0.0, 1.0);
        self
    }
}

/// Signals the HTML scorer looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSignals<'a> {
    pub text: &'a str,
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub canonical_url: Option<&'a str>,
    pub language: Option<&'a str>,
}

fn present(value: Option<&str>) -> bool {
    value.map(|v| !v.is_empty()).unwrap_or(false)
}

pub fn score_html(signals: &HtmlSignals<'_>) -> Confidence {
    let mut c = Confidence::default();
    let len = signals.text.chars().count();
    if len >= 800 {
        c.add(0.4, FACTOR_LONG_TEXT);
    } else if len >= 200 {
        c.add(0.2, FACTOR_SHORT_TEXT);
    }
    if present(signals.title) {
        c.add(0.2, FACTOR_TITLE);
    }
    if present(signals.description) {
        c.add(0.1, FACTOR_DESCRIPTION);
    }
    if present(signals.canonical_url) {
        c.add(0.1, FACTOR_CANONICAL);
    }
    if present(signals.language) {
        c.add(0.1, FACTOR_LANGUAGE);
    }
    c.clamped()
}

pub fn score_pdf(text: &str) -> Confidence {
    let mut c = Confidence::default();
    let len = text.chars().count();
    if len >= 800 {
        c.add(0.6, FACTOR_LONG_TEXT);
    } else if len >= 200 {
        c.add(0.3, FACTOR_SHORT_TEXT);
    }
    if BLANK_LINE.is_match(text) {
        c.add(0.2, FACTOR_PARAGRAPHS);
    }
    if len > 0 {
        let printable = text.chars().filter(|ch| (' '..='~').contains(ch)).count();
        if printable as f64 / len as f64 > 0.7 {
            c.add(0.2, FACTOR_ASCII);
        }
    }
    c.clamped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn html_full_signal_is_clamped() {
        let text = "x".repeat(900);
        let c = score_html(&HtmlSignals {
            text: &text,
            title: Some("T"),
            description: Some("D"),
            canonical_url: Some("https://a.test/"),
            language: Some("en"),
        });
        assert!((c.score - 0.9).abs() < 1e-9);
        assert_eq!(
            c.factors,
            vec![
                FACTOR_LONG_TEXT,
                FACTOR_TITLE,
                FACTOR_DESCRIPTION,
                FACTOR_CANONICAL,
                FACTOR_LANGUAGE
            ]
        );
    }

    #[test]
    fn html_empty_scores_zero() {
        let c = score_html(&HtmlSignals::default());
        assert_eq!(c.score, 0.0);
        assert!(c.factors.is_empty());
    }

    #[test]
    fn html_empty_strings_do_not_count() {
        let c = score_html(&HtmlSignals {
            text: "",
            title: Some(""),
            ..Default::default()
        });
        assert!(c.factors.is_empty());
    }

    #[test]
    fn pdf_tiers_and_structure() {
        let text = format!("{}\n\n{}", "a".repeat(500), "b".repeat(400));
        let c = score_pdf(&text);
        assert_eq!(c.score, 1.0);
        assert_eq!(c.factors, vec![FACTOR_LONG_TEXT, FACTOR_PARAGRAPHS, FACTOR_ASCII]);

        let mid = score_pdf(&"word ".repeat(50));
        assert_eq!(mid.factors, vec![FACTOR_SHORT_TEXT, FACTOR_ASCII]);
        assert!((mid.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn pdf_non_ascii_and_empty() {
        assert_eq!(score_pdf("").score, 0.0);
        let c = score_pdf(&"\u{00E9}".repeat(300));
        assert_eq!(c.factors, vec![FACTOR_SHORT_TEXT]);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        for text in ["", "short", &"z".repeat(5000), &"\n\n".repeat(600)] {
            let pdf = score_pdf(text);
            assert!((0.0..=1.0).contains(&pdf.score));
            let html = score_html(&HtmlSignals {
                text,
                title: Some("t"),
                description: Some("d"),
                canonical_url: Some("c"),
                language: Some("l"),
            });
            assert!((0.0..=1.0).contains(&html.score));
        }
    }
}

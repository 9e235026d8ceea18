// ABOUTME: Per-hostname field rule table (meta names, meta properties, regexes) merged over a wildcard default.
// ABOUTME: The builtin table and the summary guideline are embedded from data/domain_rules.json.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::extractors::compiled;

/// Embedded JSON holding the builtin rule table and summary guideline.
const BUILTIN_RULES_JSON: &str = include_str!("../data/domain_rules.json");

/// Host key whose rules apply to every host.
pub const WILDCARD_HOST: &str = "*";

/// Ordered lookup strategies for one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRules {
    #[serde(default)]
    pub meta_names: Vec<String>,
    #[serde(default)]
    pub meta_properties: Vec<String>,
    #[serde(default)]
    pub regexes: Vec<String>,
}

impl FieldRules {
    fn merge(base: Option<&FieldRules>, over: Option<&FieldRules>) -> Option<FieldRules> {
        if base.is_none() && over.is_none() {
            return None;
        }
        Some(FieldRules {
            meta_names: union(base.map(|r| &r.meta_names), over.map(|r| &r.meta_names)),
            meta_properties: union(
                base.map(|r| &r.meta_properties),
                over.map(|r| &r.meta_properties),
            ),
            regexes: union(base.map(|r| &r.regexes), over.map(|r| &r.regexes)),
        })
    }

    fn patterns(&self) -> impl Iterator<Item = &str> {
        self.regexes.iter().map(String::as_str)
    }
}

fn union(base: Option<&Vec<String>>, over: Option<&Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in base.into_iter().chain(over).flatten() {
        if !item.is_empty() && !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Rules for the four configurable fields of one host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<FieldRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<FieldRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<FieldRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<FieldRules>,
}

impl DomainRules {
    /// Field-wise deduplicated concatenation, base entries first.
    pub fn merged(base: &DomainRules, over: &DomainRules) -> DomainRules {
        DomainRules {
            title: FieldRules::merge(base.title.as_ref(), over.title.as_ref()),
            summary: FieldRules::merge(base.summary.as_ref(), over.summary.as_ref()),
            author: FieldRules::merge(base.author.as_ref(), over.author.as_ref()),
            publication: FieldRules::merge(base.publication.as_ref(), over.publication.as_ref()),
        }
    }

    fn fields(&self) -> impl Iterator<Item = &FieldRules> {
        [&self.title, &self.summary, &self.author, &self.publication]
            .into_iter()
            .flatten()
    }
}

/// Fixed summarization guideline carried on every successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryGuideline {
    pub prompt: String,
    pub max_length: usize,
}

impl Default for SummaryGuideline {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            max_length: crate::text::MAX_SUMMARY_LENGTH,
        }
    }
}

/// Rule table keyed by exact hostname, plus the summary guideline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleRegistry {
    #[serde(default)]
    pub summary: SummaryGuideline,
    #[serde(default)]
    pub domains: HashMap<String, DomainRules>,
}

impl RuleRegistry {
    /// Parses a registry from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Registers (or replaces) the rules for `host`.
    pub fn insert(&mut self, host: impl Into<String>, rules: DomainRules) {
        self.domains.insert(host.into(), rules);
    }

    /// Effective rules for `host`: the wildcard merged with any exact-host entry.
    pub fn for_host(&self, host: &str) -> DomainRules {
        let empty = DomainRules::default();
        let base = self.domains.get(WILDCARD_HOST).unwrap_or(&empty);
        let over = self.domains.get(host).unwrap_or(&empty);
        DomainRules::merged(base, over)
    }

    /// Compiles every regex in the table up front.
    pub fn precompile(&self) {
        compiled::precompile(
            self.domains
                .values()
                .flat_map(|d| d.fields())
                .flat_map(|f| f.patterns()),
        );
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Loads the builtin rule registry from embedded JSON.
///
/// Falls back to an empty registry (with a warning) if the embedded data does
/// not parse, which only a broken build can cause.
pub fn load_builtin_rules() -> RuleRegistry {
    match RuleRegistry::from_json(BUILTIN_RULES_JSON) {
        Ok(registry) => {
            registry.precompile();
            registry
        }
        Err(err) => {
            tracing::warn!(error = %err, "builtin domain rules failed to parse");
            RuleRegistry::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_registry_loads() {
        let registry = load_builtin_rules();
        assert!(registry.len() >= 2);
        assert_eq!(registry.summary.max_length, 400);
        assert!(registry.summary.prompt.starts_with("Summarize the linked content"));
    }

    #[test]
    fn unknown_host_gets_wildcard() {
        let registry = load_builtin_rules();
        let rules = registry.for_host("unknown.test");
        let title = rules.title.unwrap();
        assert_eq!(title.meta_properties, vec!["og:title", "twitter:title"]);
        assert!(title.meta_names.is_empty());
        assert_eq!(
            rules.publication.unwrap().meta_names,
            vec!["application-name", "publisher"]
        );
    }

    #[test]
    fn host_rules_append_after_wildcard() {
        let registry = load_builtin_rules();
        let rules = registry.for_host("www.sfexaminer.com");
        let author = rules.author.unwrap();
        assert_eq!(author.regexes.len(), 4);
        assert!(author.regexes[2].contains("byline__name"));
        assert_eq!(rules.summary.unwrap().regexes.len(), 2);
    }

    #[test]
    fn merge_dedupes_and_drops_empty() {
        let base = DomainRules {
            title: Some(FieldRules {
                meta_names: vec!["a".into(), "".into()],
                ..Default::default()
            }),
            ..Default::default()
        };
        let over = DomainRules {
            title: Some(FieldRules {
                meta_names: vec!["a".into(), "b".into()],
                ..Default::default()
            }),
            author: Some(FieldRules::default()),
            ..Default::default()
        };
        let merged = DomainRules::merged(&base, &over);
        assert_eq!(merged.title.unwrap().meta_names, vec!["a", "b"]);
        assert_eq!(merged.author, Some(FieldRules::default()));
        assert_eq!(merged.summary, None);
    }

    #[test]
    fn custom_registry_round_trip() {
        let mut registry = RuleRegistry::default();
        registry.insert(
            "news.test",
            DomainRules {
                title: Some(FieldRules {
                    regexes: vec!["(".into()],
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        registry.precompile();
        assert_eq!(registry.for_host("news.test").title.unwrap().regexes, vec!["("]);
    }
}

// ABOUTME: Data models for feed intake: parsed items, the processed-GUID cache, relevance verdicts and pass summaries.
// ABOUTME: JSON shapes use camelCase to match the dedup file and the HTTP responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry of an RSS or Atom feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RssFeedItem {
    pub guid: String,
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Dedup bookkeeping for a single feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFeed {
    pub last_checked: String,
    #[serde(default)]
    pub processed_guids: Vec<String>,
}

/// The dedup file: feed URL to its bookkeeping.
pub type ProcessedFeedCache = BTreeMap<String, ProcessedFeed>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceResult {
    pub is_relevant: bool,
    /// Percentage of criteria keywords found, 0 to 100.
    pub score: u32,
    pub reason: String,
}

/// Outcome of processing one feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedProcessingResult {
    pub feed_url: String,
    pub total_items: usize,
    pub new_items: usize,
    pub relevant_items: usize,
    /// The relevant items, in feed order.
    pub processed_items: Vec<RssFeedItem>,
    pub errors: Vec<String>,
}

impl FeedProcessingResult {
    /// A feed that failed before any item was handled.
    pub fn failed(feed_url: &str, error: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.to_string(),
            errors: vec![error.into()],
            ..Default::default()
        }
    }
}

/// Per-feed line of an ingestion summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSummary {
    pub feed_url: String,
    pub total_items: usize,
    pub new_items: usize,
    pub relevant_items: usize,
    pub errors: Vec<String>,
}

impl From<&FeedProcessingResult> for FeedSummary {
    fn from(r: &FeedProcessingResult) -> Self {
        Self {
            feed_url: r.feed_url.clone(),
            total_items: r.total_items,
            new_items: r.new_items,
            relevant_items: r.relevant_items,
            errors: r.errors.clone(),
        }
    }
}

/// Result of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub success: bool,
    pub message: String,
    pub results: Vec<FeedSummary>,
}

// ABOUTME: Feed processing: fetch and parse one feed, drop seen GUIDs, score relevance and mark new items processed.
// ABOUTME: Every new item is marked, relevant or not, so each GUID reaches extraction at most once.

use std::time::Duration;

use newsdesk_scraper::resource::{fetch, FetchOptions};
use tokio::sync::Mutex;

use crate::dedup::DedupCache;
use crate::error::FeedError;
use crate::models::{FeedProcessingResult, RssFeedItem};
use crate::parser::parse_feed_xml;
use crate::relevance::analyze_relevance;

pub const FEED_USER_AGENT: &str = "Mozilla/5.0 (compatible; RSS-Intake/1.0)";
pub const FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads and parses feeds.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    http: reqwest::Client,
    options: FetchOptions,
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new(false)
    }
}

impl FeedFetcher {
    pub fn new(allow_private_networks: bool) -> Self {
        let http = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to build feed HTTP client; using defaults");
                reqwest::Client::new()
            });
        Self::with_client(http, allow_private_networks)
    }

    pub fn with_client(http: reqwest::Client, allow_private_networks: bool) -> Self {
        let mut options = FetchOptions {
            allow_private_networks,
            timeout: FEED_TIMEOUT,
            ..Default::default()
        };
        options
            .headers
            .insert("user-agent".to_string(), FEED_USER_AGENT.to_string());
        Self { http, options }
    }

    pub async fn fetch_items(&self, feed_url: &str) -> Result<Vec<RssFeedItem>, FeedError> {
        let response = fetch(&self.http, feed_url, &self.options)
            .await
            .map_err(|err| FeedError::fetch(err.message()))?;
        parse_feed_xml(&response.text())
    }
}

/// Fetches `feed_url` and runs it through dedup and relevance.
///
/// The dedup cache is only locked after the download finishes.
pub async fn process_feed(
    fetcher: &FeedFetcher,
    feed_url: &str,
    criteria: &str,
    dedup: &Mutex<DedupCache>,
) -> Result<FeedProcessingResult, FeedError> {
    let all_items = fetcher.fetch_items(feed_url).await?;
    let total_items = all_items.len();
    tracing::info!(feed = feed_url, items = total_items, "parsed feed");

    let mut cache = dedup.lock().await;
    let new_items = cache.filter_new(feed_url, all_items);
    tracing::info!(feed = feed_url, new = new_items.len(), "filtered processed items");

    if new_items.is_empty() {
        return Ok(FeedProcessingResult {
            feed_url: feed_url.to_string(),
            total_items,
            ..Default::default()
        });
    }

    let mut relevant = Vec::new();
    for item in &new_items {
        let verdict = analyze_relevance(item, criteria);
        if verdict.is_relevant {
            tracing::info!(title = %item.title, score = verdict.score, "relevant feed item");
            relevant.push(item.clone());
        } else {
            tracing::debug!(title = %item.title, score = verdict.score, reason = %verdict.reason, "feed item not relevant");
        }
    }

    cache.mark_processed(feed_url, &new_items);
    cache.save_or_warn().await;

    Ok(FeedProcessingResult {
        feed_url: feed_url.to_string(),
        total_items,
        new_items: new_items.len(),
        relevant_items: relevant.len(),
        processed_items: relevant,
        errors: Vec::new(),
    })
}

/// Like [`process_feed`], but a failure becomes a result carrying the error.
pub async fn process_feed_isolated(
    fetcher: &FeedFetcher,
    feed_url: &str,
    criteria: &str,
    dedup: &Mutex<DedupCache>,
) -> FeedProcessingResult {
    match process_feed(fetcher, feed_url, criteria, dedup).await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(feed = feed_url, error = %err, "error processing feed");
            FeedProcessingResult::failed(feed_url, err.to_string())
        }
    }
}

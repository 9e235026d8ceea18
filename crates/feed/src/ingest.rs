// ABOUTME: One ingestion pass: process every configured feed, extract relevant items and forward good results.
// ABOUTME: Extraction and the suggestion board are injected; feeds run with bounded parallelism, items sequentially.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use newsdesk_scraper::{Client, ScrapeRequest, ScrapeResult};
use tokio::sync::{Mutex, RwLock};

use crate::config::IntakeConfigStore;
use crate::dedup::DedupCache;
use crate::models::{CheckSummary, FeedProcessingResult, FeedSummary};
use crate::processor::{process_feed_isolated, FeedFetcher};

/// Source label attached to suggestions created by ingestion.
pub const INTAKE_SOURCE: &str = "rss-intake";

/// Turns an item link into a scrape result.
#[async_trait]
pub trait ItemExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> ScrapeResult;
}

#[async_trait]
impl ItemExtractor for Client {
    async fn extract(&self, url: &str) -> ScrapeResult {
        self.scrape(ScrapeRequest::new(url)).await
    }
}

/// Receives successfully extracted items.
#[async_trait]
pub trait SuggestionSink: Send + Sync {
    async fn suggest(&self, result: ScrapeResult, source: &str);
}

/// Everything a pass needs.
#[derive(Clone)]
pub struct Intake {
    config: Arc<RwLock<IntakeConfigStore>>,
    dedup: Arc<Mutex<DedupCache>>,
    fetcher: FeedFetcher,
    extractor: Arc<dyn ItemExtractor>,
    sink: Arc<dyn SuggestionSink>,
    feed_concurrency: usize,
}

impl Intake {
    pub fn new(
        config: IntakeConfigStore,
        dedup: DedupCache,
        extractor: Arc<dyn ItemExtractor>,
        sink: Arc<dyn SuggestionSink>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            dedup: Arc::new(Mutex::new(dedup)),
            fetcher: FeedFetcher::default(),
            extractor,
            sink,
            feed_concurrency: 1,
        }
    }

    pub fn with_fetcher(mut self, fetcher: FeedFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Feeds processed at once; values below 1 mean 1.
    pub fn with_feed_concurrency(mut self, n: usize) -> Self {
        self.feed_concurrency = n.max(1);
        self
    }

    pub fn config(&self) -> &Arc<RwLock<IntakeConfigStore>> {
        &self.config
    }

    pub fn dedup(&self) -> &Arc<Mutex<DedupCache>> {
        &self.dedup
    }

    /// Re-reads the config file and the dedup cache.
    pub async fn reload(&self) {
        self.config.write().await.reload();
        self.dedup.lock().await.invalidate().await;
    }

    /// Runs one pass over every configured feed.
    pub async fn run_pass(&self) -> CheckSummary {
        let config = self.config.read().await.config().clone();
        tracing::info!(feeds = config.feeds.len(), "starting feed check");

        let feeds: Vec<(String, String)> = config
            .feeds
            .iter()
            .map(|f| (f.rss_feed_url.clone(), config.prompt_for_feed(&f.rss_feed_url)))
            .collect();

        let outcomes: Vec<(FeedProcessingResult, usize)> = stream::iter(feeds)
            .map(|(feed_url, criteria)| async move { self.run_feed(&feed_url, &criteria).await })
            .buffered(self.feed_concurrency)
            .collect()
            .await;

        let relevant: usize = outcomes.iter().map(|(r, _)| r.relevant_items).sum();
        let created: usize = outcomes.iter().map(|(_, c)| *c).sum();
        tracing::info!(relevant, created, "completed feed check");

        CheckSummary {
            success: true,
            message: format!(
                "Processed {} feeds, found {} relevant items, created {} suggestions",
                outcomes.len(),
                relevant,
                created
            ),
            results: outcomes.iter().map(|(r, _)| FeedSummary::from(r)).collect(),
        }
    }

    /// Processes one feed and extracts its relevant items in order.
    async fn run_feed(&self, feed_url: &str, criteria: &str) -> (FeedProcessingResult, usize) {
        let result = process_feed_isolated(&self.fetcher, feed_url, criteria, &self.dedup).await;
        let mut created = 0;
        for item in &result.processed_items {
            let scraped = self.extractor.extract(&item.link).await;
            if scraped.is_ok() {
                self.sink.suggest(scraped, INTAKE_SOURCE).await;
                created += 1;
                tracing::info!(title = %item.title, "created suggestion");
            } else {
                tracing::warn!(
                    link = %item.link,
                    error = ?scraped.error,
                    "scrape failed for feed item"
                );
            }
        }
        (result, created)
    }
}

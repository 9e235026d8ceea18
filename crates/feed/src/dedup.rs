// ABOUTME: Per-feed processed-GUID cache backed by a JSON file, capped at 1000 GUIDs per feed.
// ABOUTME: Explicitly opened, saved and invalidated by its owner; unreadable files start empty.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};

use crate::error::FeedError;
use crate::models::{ProcessedFeed, ProcessedFeedCache, RssFeedItem};

pub const DEFAULT_CACHE_PATH: &str = "data/rss-processed-posts.json";

/// GUIDs remembered per feed; the oldest are evicted first.
pub const MAX_GUIDS_PER_FEED: usize = 1000;

#[derive(Debug, Clone)]
pub struct DedupCache {
    path: PathBuf,
    entries: ProcessedFeedCache,
}

impl DedupCache {
    /// Opens the cache at `path`. A missing or corrupt file yields an empty cache.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = read_entries(&path).await;
        Self { path, entries }
    }

    /// An empty cache that will be written to `path` on save.
    pub fn empty(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            entries: ProcessedFeedCache::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &ProcessedFeedCache {
        &self.entries
    }

    /// Items whose GUID has not been processed for `feed_url`.
    pub fn filter_new(&self, feed_url: &str, items: Vec<RssFeedItem>) -> Vec<RssFeedItem> {
        let Some(feed) = self.entries.get(feed_url) else {
            return items;
        };
        let seen: HashSet<&str> = feed.processed_guids.iter().map(String::as_str).collect();
        items
            .into_iter()
            .filter(|item| !seen.contains(item.guid.as_str()))
            .collect()
    }

    /// Records `items` as processed and stamps the feed's last check.
    pub fn mark_processed(&mut self, feed_url: &str, items: &[RssFeedItem]) {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let feed = self
            .entries
            .entry(feed_url.to_string())
            .or_insert_with(|| ProcessedFeed {
                last_checked: now.clone(),
                processed_guids: Vec::new(),
            });
        feed.processed_guids
            .extend(items.iter().map(|item| item.guid.clone()));
        feed.last_checked = now;

        let len = feed.processed_guids.len();
        if len > MAX_GUIDS_PER_FEED {
            feed.processed_guids.drain(..len - MAX_GUIDS_PER_FEED);
        }
    }

    pub fn last_checked(&self, feed_url: &str) -> Option<&str> {
        self.entries
            .get(feed_url)
            .map(|feed| feed.last_checked.as_str())
    }

    /// Writes the cache as pretty JSON, creating parent directories.
    pub async fn save(&self) -> Result<(), FeedError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| FeedError::config(e.to_string()))?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Saves, logging instead of failing.
    pub async fn save_or_warn(&self) {
        if let Err(err) = self.save().await {
            tracing::warn!(path = %self.path.display(), error = %err, "error saving RSS dedup cache");
        }
    }

    /// Drops the in-memory view and re-reads the file.
    pub async fn invalidate(&mut self) {
        self.entries = read_entries(&self.path).await;
    }
}

async fn read_entries(path: &Path) -> ProcessedFeedCache {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return ProcessedFeedCache::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "error loading RSS dedup cache");
            return ProcessedFeedCache::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        tracing::warn!(path = %path.display(), error = %err, "error loading RSS dedup cache");
        ProcessedFeedCache::new()
    })
}

// ABOUTME: Result persistence contract (ResultStore) with the row/blob records, freshness and inline-vs-storage rules.
// ABOUTME: Providers: DisabledStore (null object), MemoryStore (in-process) and SupabaseStore (PostgREST + Storage).

//! Persistence and cache.
//!
//! One row per normalized URL, plus up to three blobs (`html`, `text`,
//! `meta`) keyed by `(result_id, kind)`. A blob is stored inline unless its
//! payload is longer than the kind's threshold or the caller forces external
//! storage, in which case it is uploaded under `scraper/<id>/...` and only the
//! path is kept.
//!
//! The pipeline receives a provider as `Arc<dyn ResultStore>`; the default is
//! [`DisabledStore`], which never fails and always misses.

mod disabled;
mod memory;
mod supabase;

pub use disabled::DisabledStore;
pub use memory::MemoryStore;
pub use supabase::{SupabaseConfig, SupabaseStore};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ErrorCode, StoreError};
use crate::result::{
    Content, DebugInfo, ErrorInfo, Metadata, ScrapeResult, ScrapeStatus, ScrapeType, StoragePaths,
};

pub const HTML_INLINE_LIMIT: usize = 200_000;
pub const TEXT_INLINE_LIMIT: usize = 1_000_000;
pub const META_INLINE_LIMIT: usize = 1_000_000;

/// The three payload kinds stored next to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobKind {
    Html,
    Text,
    Meta,
}

impl BlobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobKind::Html => "html",
            BlobKind::Text => "text",
            BlobKind::Meta => "meta",
        }
    }

    /// Longest payload (in characters) kept inline.
    pub fn inline_limit(&self) -> usize {
        match self {
            BlobKind::Html => HTML_INLINE_LIMIT,
            BlobKind::Text => TEXT_INLINE_LIMIT,
            BlobKind::Meta => META_INLINE_LIMIT,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            BlobKind::Html => "text/html",
            BlobKind::Text => "text/plain",
            BlobKind::Meta => "application/json",
        }
    }

    /// Object path for this kind under a result id.
    pub fn storage_path(&self, result_id: &str) -> String {
        let file = match self {
            BlobKind::Html => "index.html",
            BlobKind::Text => "content.txt",
            BlobKind::Meta => "meta.json",
        };
        format!("scraper/{}/{}", result_id, file)
    }

    /// Whether `payload` goes to external storage instead of the row.
    pub fn needs_external_storage(&self, payload: &str, force: bool) -> bool {
        force || payload.chars().count() > self.inline_limit()
    }
}

/// Row fields supplied by the caller of `upsert_result`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistMeta {
    pub id: Option<String>,
    pub url: String,
    pub normalized_url: String,
    pub canonical_url: Option<String>,
    pub ts: Option<DateTime<Utc>>,
    pub kind: Option<ScrapeType>,
    pub status: Option<ScrapeStatus>,
    pub confidence: Option<f64>,
    pub title: Option<String>,
    pub language: Option<String>,
    pub site_name: Option<String>,
    pub content_hash: Option<String>,
    pub has_html: Option<bool>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl PersistMeta {
    /// Row fields of a pipeline result. The id is left to the store.
    pub fn from_result(result: &ScrapeResult, has_html: bool) -> Self {
        Self {
            id: None,
            url: result.url.clone(),
            normalized_url: result.normalized_url.clone(),
            canonical_url: result.canonical_url.clone(),
            ts: Some(result.ts),
            kind: Some(result.kind),
            status: Some(result.status),
            confidence: Some(result.confidence),
            title: result.metadata.title.clone(),
            language: result.metadata.language.clone(),
            site_name: result.metadata.site_name.clone(),
            content_hash: None,
            has_html: Some(has_html),
            error_code: result.error.as_ref().map(|e| e.code.clone()),
            error_message: result.error.as_ref().map(|e| e.message.clone()),
        }
    }

    /// Checks `url`, `normalized_url`, `type`, `status` and `confidence`.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("url");
        }
        if self.normalized_url.trim().is_empty() {
            missing.push("normalizedUrl");
        }
        if self.kind.is_none() {
            missing.push("type");
        }
        if self.status.is_none() {
            missing.push("status");
        }
        if self.confidence.is_none() {
            missing.push("confidence");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::MissingFields(missing.join(", ")))
        }
    }

    /// The row as written: validated, hashed and timestamped.
    pub fn to_row(&self, blobs: &PersistBlobs) -> Result<RowRecord, StoreError> {
        self.validate()?;
        let text = blobs.text.as_deref().unwrap_or("");
        let content_hash = self
            .content_hash
            .clone()
            .or_else(|| (!text.is_empty()).then(|| content_hash(text)));
        Ok(RowRecord {
            url: self.url.clone(),
            normalized_url: self.normalized_url.clone(),
            canonical_url: self.canonical_url.clone(),
            ts: self.ts.unwrap_or_else(Utc::now),
            kind: self.kind.unwrap_or(ScrapeType::Html).as_str().to_string(),
            status: self.status.unwrap_or(ScrapeStatus::Ok).as_str().to_string(),
            confidence: self.confidence.unwrap_or(0.0),
            title: self.title.clone(),
            language: self.language.clone(),
            site_name: self.site_name.clone(),
            content_hash,
            has_html: self.has_html.unwrap_or(blobs.html.is_some()),
            error_code: self.error_code.clone(),
            error_message: self.error_message.clone(),
        })
    }
}

/// Payloads stored next to the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistBlobs {
    pub html: Option<String>,
    pub text: Option<String>,
    pub meta: Option<serde_json::Value>,
}

impl PersistBlobs {
    /// Present payloads with their kind; `meta` is serialized to JSON.
    pub fn payloads(&self) -> Vec<(BlobKind, String)> {
        let mut out = Vec::with_capacity(3);
        if let Some(ref html) = self.html {
            out.push((BlobKind::Html, html.clone()));
        }
        if let Some(ref text) = self.text {
            out.push((BlobKind::Text, text.clone()));
        }
        if let Some(ref meta) = self.meta {
            let rendered = match meta {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push((BlobKind::Meta, rendered));
        }
        out
    }
}

/// Per-kind overrides forcing external storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistOptions {
    pub force_html_storage: bool,
    pub force_text_storage: bool,
    pub force_meta_storage: bool,
}

impl PersistOptions {
    pub fn forces(&self, kind: BlobKind) -> bool {
        match kind {
            BlobKind::Html => self.force_html_storage,
            BlobKind::Text => self.force_text_storage,
            BlobKind::Meta => self.force_meta_storage,
        }
    }
}

/// What an upsert reports back: the stored id and any external paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertOutcome {
    pub id: String,
    pub paths: StoragePaths,
}

impl UpsertOutcome {
    pub(crate) fn record_path(&mut self, kind: BlobKind, path: String) {
        match kind {
            BlobKind::Html => self.paths.html_path = Some(path),
            BlobKind::Text => self.paths.text_path = Some(path),
            BlobKind::Meta => self.paths.meta_path = Some(path),
        }
    }
}

/// A row as written to `scrape_results` (column names are the wire names).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub url: String,
    pub normalized_url: String,
    pub canonical_url: Option<String>,
    pub ts: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub confidence: f64,
    pub title: Option<String>,
    pub language: Option<String>,
    pub site_name: Option<String>,
    pub content_hash: Option<String>,
    pub has_html: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// One blob: inline `content` or an external `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBlob {
    pub kind: BlobKind,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A row joined with its blobs, as returned by `find_fresh_by_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: String,
    #[serde(flatten)]
    pub row: RowRecord,
    #[serde(default, rename = "scrape_blobs")]
    pub blobs: Vec<StoredBlob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMeta {
    #[serde(default)]
    metadata: Option<Metadata>,
    #[serde(default)]
    confidence_factors: Option<Vec<String>>,
    #[serde(default)]
    debug: Option<DebugInfo>,
}

impl StoredResult {
    pub fn blob(&self, kind: BlobKind) -> Option<&StoredBlob> {
        self.blobs.iter().find(|b| b.kind == kind)
    }

    /// Rebuilds the pipeline result served on a cache hit.
    ///
    /// Metadata, factors and the original trace come from the `meta` blob;
    /// an unreadable blob leaves them empty.
    pub fn into_scrape_result(self) -> ScrapeResult {
        let meta: StoredMeta = self
            .blob(BlobKind::Meta)
            .and_then(|b| b.content.as_deref())
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        let text = self.blob(BlobKind::Text);
        let html = self.blob(BlobKind::Html);
        let meta_blob = self.blob(BlobKind::Meta);

        let storage = StoragePaths {
            html_path: html.and_then(|b| b.path.clone()),
            text_path: text.and_then(|b| b.path.clone()),
            meta_path: meta_blob.and_then(|b| b.path.clone()),
        };
        let content = Content {
            text: text.and_then(|b| b.content.clone()).unwrap_or_default(),
            html: html.and_then(|b| b.content.clone()).filter(|h| !h.is_empty()),
        };

        let row = &self.row;
        let error = if row.error_code.is_some() || row.error_message.is_some() {
            Some(ErrorInfo {
                code: row
                    .error_code
                    .clone()
                    .unwrap_or_else(|| ErrorCode::DbError.to_string()),
                message: row
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Stored error".to_string()),
            })
        } else {
            None
        };

        ScrapeResult {
            id: self.id.clone(),
            kind: ScrapeType::parse(&row.kind).unwrap_or(ScrapeType::Html),
            url: row.url.clone(),
            normalized_url: row.normalized_url.clone(),
            canonical_url: row.canonical_url.clone(),
            ts: row.ts,
            status: ScrapeStatus::parse(&row.status).unwrap_or(ScrapeStatus::Ok),
            confidence: row.confidence,
            confidence_factors: meta.confidence_factors.unwrap_or_default(),
            content,
            metadata: meta.metadata.unwrap_or_default(),
            storage: if storage.is_empty() {
                None
            } else {
                Some(storage)
            },
            error,
            debug: meta.debug,
        }
    }
}

/// A persistence backend.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Upserts the row keyed by `normalized_url` (last write wins) and its blobs.
    async fn upsert_result(
        &self,
        meta: PersistMeta,
        blobs: PersistBlobs,
        options: PersistOptions,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Newest row for `normalized_url` younger than `ttl_ms`; `ttl_ms <= 0` always misses.
    async fn find_fresh_by_url(
        &self,
        normalized_url: &str,
        ttl_ms: i64,
    ) -> Result<Option<StoredResult>, StoreError>;
}

/// Hex SHA-256 of a text payload.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Oldest timestamp still fresh under `ttl_ms` (exclusive).
pub fn freshness_threshold(now: DateTime<Utc>, ttl_ms: i64) -> DateTime<Utc> {
    now - Duration::milliseconds(ttl_ms)
}

/// Whether a row stamped `ts` is fresh at `now`.
pub fn is_fresh(ts: DateTime<Utc>, now: DateTime<Utc>, ttl_ms: i64) -> bool {
    ttl_ms > 0 && ts > freshness_threshold(now, ttl_ms)
}

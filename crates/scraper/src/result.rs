// ABOUTME: ScrapeResult record produced by every pipeline run, plus its nested metadata/content/debug types.
// ABOUTME: Serialized in camelCase for API consumers; includes the error-result constructor used on every failure path.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorCode, ScrapeError};
use crate::urls::normalize_url;

/// Requested scrape type. `Auto` defers to URL inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    #[default]
    Auto,
    Html,
    Pdf,
    Youtube,
}

/// Type of a produced result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeType {
    #[default]
    Html,
    Pdf,
    /// Reserved; no extractor produces it yet.
    Youtube,
}

impl ScrapeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeType::Html => "html",
            ScrapeType::Pdf => "pdf",
            ScrapeType::Youtube => "youtube",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "html" => Some(ScrapeType::Html),
            "pdf" => Some(ScrapeType::Pdf),
            "youtube" => Some(ScrapeType::Youtube),
            _ => None,
        }
    }
}

/// Outcome discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    #[default]
    Ok,
    Blocked,
    Captcha,
    Error,
}

impl ScrapeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStatus::Ok => "ok",
            ScrapeStatus::Blocked => "blocked",
            ScrapeStatus::Captcha => "captcha",
            ScrapeStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ok" => Some(ScrapeStatus::Ok),
            "blocked" => Some(ScrapeStatus::Blocked),
            "captcha" => Some(ScrapeStatus::Captcha),
            "error" => Some(ScrapeStatus::Error),
            _ => None,
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_browser: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_html: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
}

impl ScrapeOptions {
    /// Per-call timeout: `timeoutMs` when given, else `default`.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_ms.map(Duration::from_millis).unwrap_or(default)
    }

    pub fn is_forced(&self) -> bool {
        self.force.unwrap_or(false)
    }
}

/// Body of a scrape request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default, rename = "type")]
    pub request_type: Option<RequestType>,
    #[serde(default)]
    pub options: ScrapeOptions,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_guideline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Locations of blobs moved to external storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_path: Option<String>,
}

impl StoragePaths {
    pub fn is_empty(&self) -> bool {
        self.html_path.is_none() && self.text_path.is_none() && self.meta_path.is_none()
    }

    /// Overlays `other` on top of `self`; present values in `other` win.
    pub fn merge(&mut self, other: StoragePaths) {
        if other.html_path.is_some() {
            self.html_path = other.html_path;
        }
        if other.text_path.is_some() {
            self.text_path = other.text_path;
        }
        if other.meta_path.is_some() {
            self.meta_path = other.meta_path;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub method: String,
    pub attempts: Vec<TraceEntry>,
    pub tools_used: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// The pipeline's canonical output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ScrapeType,
    pub url: String,
    pub normalized_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    pub ts: DateTime<Utc>,
    pub status: ScrapeStatus,
    pub confidence: f64,
    #[serde(default)]
    pub confidence_factors: Vec<String>,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StoragePaths>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugInfo>,
}

impl ScrapeResult {
    /// A fresh `ok` result with a client-side id and the current timestamp.
    pub fn new(kind: ScrapeType, url: &str, normalized_url: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            url: url.to_string(),
            normalized_url: normalized_url.to_string(),
            canonical_url: None,
            ts: Utc::now(),
            status: ScrapeStatus::Ok,
            confidence: 0.0,
            confidence_factors: Vec::new(),
            content: Content::default(),
            metadata: Metadata::default(),
            storage: None,
            error: None,
            debug: None,
        }
    }

    /// Terminal `error` result with zero confidence and empty content.
    pub fn failure(kind: ScrapeType, url: &str, code: ErrorCode, message: impl Into<String>) -> Self {
        let mut result = Self::new(kind, url, &normalize_url(url));
        result.status = ScrapeStatus::Error;
        result.error = Some(ErrorInfo {
            code: code.to_string(),
            message: message.into(),
        });
        result
    }

    /// Folds a stage error into a terminal result.
    pub fn from_error(kind: ScrapeType, url: &str, err: &ScrapeError) -> Self {
        Self::failure(kind, url, err.code, err.message())
    }

    pub fn is_ok(&self) -> bool {
        self.status == ScrapeStatus::Ok
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().and_then(|e| ErrorCode::parse(&e.code))
    }
}

// ABOUTME: Manual edit payloads: validation, the persistence records they produce and the merged result returned.
// ABOUTME: Requires url (normalized form derived when absent) and content text; a payload id must match the path id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::persistence::{PersistBlobs, PersistMeta, PersistOptions, UpsertOutcome};
use crate::result::{
    Content, DebugInfo, ErrorInfo, Metadata, ScrapeResult, ScrapeStatus, ScrapeType, StoragePaths,
};
use crate::urls::normalize_url;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditContent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

/// A partially filled `ScrapeResult` submitted for re-persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<ScrapeType>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub normalized_url: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub status: Option<ScrapeStatus>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub confidence_factors: Option<Vec<String>>,
    #[serde(default)]
    pub content: Option<EditContent>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub storage: Option<StoragePaths>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
    #[serde(default)]
    pub debug: Option<DebugInfo>,
    /// Keep the submitted HTML inline; defaults to "HTML was submitted".
    #[serde(default)]
    pub include_html: Option<bool>,
}

/// A validated edit, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEdit {
    pub id: String,
    pub url: String,
    pub normalized_url: String,
    pub text: String,
    pub html: Option<String>,
    pub include_html: bool,
    pub ts: DateTime<Utc>,
    pub payload: EditPayload,
}

impl EditPayload {
    /// Validates the payload against the path `id`.
    pub fn prepare(self, id: &str, now: DateTime<Utc>) -> Result<PreparedEdit, EditError> {
        if id.trim().is_empty() {
            return Err(EditError::Invalid("Missing id parameter".to_string()));
        }
        if let Some(ref payload_id) = self.id {
            if !payload_id.is_empty() && payload_id != id {
                return Err(EditError::Invalid("Mismatched id in payload".to_string()));
            }
        }

        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .to_string();
        let normalized_url = self
            .normalized_url
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| if url.is_empty() { String::new() } else { normalize_url(&url) })
            .trim()
            .to_string();
        if url.is_empty() || normalized_url.is_empty() {
            return Err(EditError::Invalid("Missing url or normalizedUrl".to_string()));
        }

        let content = self.content.clone().unwrap_or_default();
        let Some(text) = content.text else {
            return Err(EditError::Invalid("Missing content text".to_string()));
        };
        let html = content.html;
        let include_html = self.include_html.unwrap_or(html.is_some());

        Ok(PreparedEdit {
            id: id.to_string(),
            url,
            normalized_url,
            text,
            html,
            include_html,
            ts: now,
            payload: self,
        })
    }
}

impl PreparedEdit {
    pub fn persist_meta(&self) -> PersistMeta {
        let p = &self.payload;
        let has_html = self.html.is_some()
            || p.storage
                .as_ref()
                .map(|s| s.html_path.is_some())
                .unwrap_or(false);
        PersistMeta {
            id: Some(self.id.clone()),
            url: self.url.clone(),
            normalized_url: self.normalized_url.clone(),
            canonical_url: p.canonical_url.clone(),
            ts: Some(self.ts),
            kind: Some(p.kind.unwrap_or(ScrapeType::Html)),
            status: Some(p.status.unwrap_or(ScrapeStatus::Ok)),
            confidence: Some(p.confidence.unwrap_or(0.0)),
            title: p.metadata.as_ref().and_then(|m| m.title.clone()),
            language: p.metadata.as_ref().and_then(|m| m.language.clone()),
            site_name: p.metadata.as_ref().and_then(|m| m.site_name.clone()),
            content_hash: None,
            has_html: Some(has_html),
            error_code: p.error.as_ref().map(|e| e.code.clone()),
            error_message: p.error.as_ref().map(|e| e.message.clone()),
        }
    }

    pub fn persist_blobs(&self) -> PersistBlobs {
        let p = &self.payload;
        PersistBlobs {
            html: self.html.clone(),
            text: Some(self.text.clone()),
            meta: Some(serde_json::json!({
                "metadata": p.metadata,
                "confidenceFactors": p.confidence_factors,
                "debug": p.debug,
                "storage": p.storage,
                "error": p.error,
            })),
        }
    }

    pub fn persist_options(&self) -> PersistOptions {
        PersistOptions {
            force_html_storage: self.html.is_some() && !self.include_html,
            ..Default::default()
        }
    }

    /// The result returned to the editor after a successful upsert.
    pub fn into_result(self, stored: UpsertOutcome) -> ScrapeResult {
        let p = self.payload;
        let mut storage = p.storage.unwrap_or_default();
        storage.merge(stored.paths);
        let id = if !stored.id.is_empty() {
            stored.id
        } else {
            p.id.filter(|i| !i.is_empty()).unwrap_or(self.id)
        };

        ScrapeResult {
            id,
            kind: p.kind.unwrap_or(ScrapeType::Html),
            url: self.url,
            normalized_url: self.normalized_url,
            canonical_url: p.canonical_url,
            ts: self.ts,
            status: p.status.unwrap_or(ScrapeStatus::Ok),
            confidence: p.confidence.unwrap_or(0.0),
            confidence_factors: p.confidence_factors.unwrap_or_default(),
            content: Content {
                text: self.text,
                html: self.html,
            },
            metadata: p.metadata.unwrap_or_default(),
            storage: if storage.is_empty() { None } else { Some(storage) },
            error: p.error,
            debug: p.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload() -> EditPayload {
        serde_json::from_value(serde_json::json!({
            "url": " https://a.test/story ",
            "content": { "text": "edited body", "html": "<p>edited body</p>" },
            "metadata": { "title": "Edited" },
            "includeHtml": false
        }))
        .unwrap()
    }

    #[test]
    fn derives_normalized_url_and_forces_html_storage() {
        let prepared = payload().prepare("abc", Utc::now()).unwrap();
        assert_eq!(prepared.url, "https://a.test/story");
        assert_eq!(prepared.normalized_url, "https://a.test/story");
        assert!(prepared.persist_options().force_html_storage);
        let meta = prepared.persist_meta();
        assert_eq!(meta.title.as_deref(), Some("Edited"));
        assert_eq!(meta.has_html, Some(true));
        assert_eq!(meta.kind, Some(ScrapeType::Html));
        assert_eq!(meta.confidence, Some(0.0));
    }

    #[test]
    fn rejects_bad_payloads() {
        let mut mismatched = payload();
        mismatched.id = Some("other".into());
        assert_eq!(
            mismatched.prepare("abc", Utc::now()).unwrap_err().to_string(),
            "Mismatched id in payload"
        );

        let mut no_url = payload();
        no_url.url = None;
        assert!(no_url.prepare("abc", Utc::now()).unwrap_err().is_invalid());

        let mut no_text = payload();
        no_text.content = Some(EditContent::default());
        assert_eq!(
            no_text.prepare("abc", Utc::now()).unwrap_err().to_string(),
            "Missing content text"
        );

        assert!(payload().prepare(" ", Utc::now()).is_err());
    }

    #[test]
    fn merged_result_prefers_stored_id_and_paths() {
        let prepared = payload().prepare("abc", Utc::now()).unwrap();
        let result = prepared.into_result(UpsertOutcome {
            id: "row-7".into(),
            paths: StoragePaths {
                html_path: Some("scraper/row-7/index.html".into()),
                ..Default::default()
            },
        });
        assert_eq!(result.id, "row-7");
        assert_eq!(result.content.text, "edited body");
        assert_eq!(result.metadata.title.as_deref(), Some("Edited"));
        assert_eq!(
            result.storage.unwrap().html_path.as_deref(),
            Some("scraper/row-7/index.html")
        );
    }

    #[test]
    fn disabled_store_keeps_path_id() {
        let prepared = payload().prepare("abc", Utc::now()).unwrap();
        let result = prepared.into_result(UpsertOutcome::default());
        assert_eq!(result.id, "abc");
        assert!(result.storage.is_none());
    }
}

// ABOUTME: Supabase persistence provider: PostgREST upserts on scrape_results/scrape_blobs and Storage uploads.
// ABOUTME: A failed upload degrades that blob to inline content instead of failing the upsert.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{
    freshness_threshold, BlobKind, PersistBlobs, PersistMeta, PersistOptions, ResultStore,
    StoredResult, UpsertOutcome,
};
use crate::error::StoreError;

const RESULTS_TABLE: &str = "scrape_results";
const BLOBS_TABLE: &str = "scrape_blobs";
const RESULT_COLUMNS: &str = "id,url,normalized_url,canonical_url,ts,type,status,confidence,title,language,site_name,content_hash,has_html,error_code,error_message,scrape_blobs(kind,path,content)";

/// Connection settings for a Supabase project.
#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    /// Storage bucket for offloaded blobs; `None` keeps every blob inline.
    pub bucket: Option<String>,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl SupabaseConfig {
    /// Settings from possibly-empty values; `None` without both url and key.
    pub fn from_parts(url: Option<String>, key: Option<String>, bucket: Option<String>) -> Option<Self> {
        let url = url.filter(|u| !u.trim().is_empty())?;
        let key = key.filter(|k| !k.trim().is_empty())?;
        Some(Self {
            url: url.trim_end_matches('/').to_string(),
            key,
            bucket: Some(
                bucket
                    .filter(|b| !b.trim().is_empty())
                    .unwrap_or_else(|| "scraper".to_string()),
            ),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseStore {
    config: SupabaseConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

#[derive(Debug, Serialize)]
struct BlobRow<'a> {
    result_id: &'a str,
    kind: BlobKind,
    path: Option<String>,
    content: Option<String>,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: SupabaseConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, table)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.config.url, bucket, path)
    }

    fn auth_headers(&self) -> Result<HeaderMap, StoreError> {
        let key = HeaderValue::from_str(&self.config.key)
            .map_err(|e| StoreError::Backend(format!("invalid Supabase key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.key))
            .map_err(|e| StoreError::Backend(format!("invalid Supabase key: {}", e)))?;
        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Http {
            status: status.as_u16(),
            body,
        })
    }

    /// Uploads one blob to `bucket/path`, overwriting any previous object.
    async fn upload(&self, bucket: &str, path: &str, kind: BlobKind, payload: &str) -> Result<(), StoreError> {
        let response = self
            .http
            .post(self.object_url(bucket, path))
            .headers(self.auth_headers()?)
            .header(CONTENT_TYPE, kind.content_type())
            .header("cache-control", "3600")
            .header("x-upsert", "true")
            .body(payload.to_string())
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}

#[async_trait]
impl ResultStore for SupabaseStore {
    fn name(&self) -> &'static str {
        "supabase"
    }

    async fn upsert_result(
        &self,
        meta: PersistMeta,
        blobs: PersistBlobs,
        options: PersistOptions,
    ) -> Result<UpsertOutcome, StoreError> {
        let row = meta.to_row(&blobs)?;

        let response = self
            .http
            .post(self.rest_url(RESULTS_TABLE))
            .query(&[("on_conflict", "normalized_url")])
            .headers(self.auth_headers()?)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row)
            .send()
            .await?;
        let rows: Vec<IdRow> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let id = rows
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| StoreError::Decode("upsert did not return an id".to_string()))?;

        let mut outcome = UpsertOutcome {
            id: id.clone(),
            ..Default::default()
        };
        let mut records = Vec::new();

        for (kind, payload) in blobs.payloads() {
            let mut stored_path = None;
            if let Some(bucket) = self.config.bucket.as_deref() {
                if kind.needs_external_storage(&payload, options.forces(kind)) {
                    let path = kind.storage_path(&id);
                    match self.upload(bucket, &path, kind, &payload).await {
                        Ok(()) => stored_path = Some(path),
                        Err(err) => tracing::warn!(
                            kind = kind.as_str(),
                            error = %err,
                            "blob upload failed; storing inline"
                        ),
                    }
                }
            }
            match stored_path {
                Some(path) => {
                    outcome.record_path(kind, path.clone());
                    records.push(BlobRow {
                        result_id: &id,
                        kind,
                        path: Some(path),
                        content: None,
                    });
                }
                None => records.push(BlobRow {
                    result_id: &id,
                    kind,
                    path: None,
                    content: Some(payload),
                }),
            }
        }

        if !records.is_empty() {
            let response = self
                .http
                .post(self.rest_url(BLOBS_TABLE))
                .query(&[("on_conflict", "result_id,kind")])
                .headers(self.auth_headers()?)
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&records)
                .send()
                .await?;
            Self::check(response).await?;
        }

        Ok(outcome)
    }

    async fn find_fresh_by_url(
        &self,
        normalized_url: &str,
        ttl_ms: i64,
    ) -> Result<Option<StoredResult>, StoreError> {
        if ttl_ms <= 0 {
            return Ok(None);
        }
        let threshold =
            freshness_threshold(Utc::now(), ttl_ms).to_rfc3339_opts(SecondsFormat::Millis, true);
        let response = self
            .http
            .get(self.rest_url(RESULTS_TABLE))
            .headers(self.auth_headers()?)
            .query(&[
                ("select", RESULT_COLUMNS.to_string()),
                ("normalized_url", format!("eq.{}", normalized_url)),
                ("ts", format!("gt.{}", threshold)),
                ("order", "ts.desc".to_string()),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<StoredResult> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::HTML_INLINE_LIMIT;
    use crate::result::{ScrapeStatus, ScrapeType};
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;

    fn store(server: &MockServer, bucket: Option<&str>) -> SupabaseStore {
        SupabaseStore::new(SupabaseConfig {
            url: server.base_url(),
            key: "service-key".into(),
            bucket: bucket.map(str::to_string),
        })
    }

    fn meta() -> PersistMeta {
        PersistMeta {
            url: "https://a.test/story".into(),
            normalized_url: "https://a.test/story".into(),
            kind: Some(ScrapeType::Html),
            status: Some(ScrapeStatus::Ok),
            confidence: Some(0.9),
            ..Default::default()
        }
    }

    #[test]
    fn config_requires_url_and_key() {
        assert!(SupabaseConfig::from_parts(None, Some("k".into()), None).is_none());
        assert!(SupabaseConfig::from_parts(Some("https://x.supabase.co".into()), Some(" ".into()), None).is_none());
        let cfg = SupabaseConfig::from_parts(Some("https://x.supabase.co/".into()), Some("k".into()), None).unwrap();
        assert_eq!(cfg.url, "https://x.supabase.co");
        assert_eq!(cfg.bucket.as_deref(), Some("scraper"));
        assert!(!format!("{:?}", cfg).contains("\"k\""));
    }

    #[tokio::test]
    async fn upsert_writes_row_uploads_large_html_and_blob_rows() {
        let server = MockServer::start();
        let row_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/scrape_results")
                .query_param("on_conflict", "normalized_url")
                .header("apikey", "service-key")
                .header("authorization", "Bearer service-key");
            then.status(201)
                .header("content-type", "application/json")
                .json_body(serde_json::json!([{ "id": "row-9" }]));
        });
        let upload_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/storage/v1/object/scraper/scraper/row-9/index.html")
                .header("x-upsert", "true");
            then.status(200).json_body(serde_json::json!({ "Key": "ok" }));
        });
        let blob_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/scrape_blobs")
                .query_param("on_conflict", "result_id,kind");
            then.status(201);
        });

        let outcome = store(&server, Some("scraper"))
            .upsert_result(
                meta(),
                PersistBlobs {
                    html: Some("x".repeat(HTML_INLINE_LIMIT + 10)),
                    text: Some("body".into()),
                    meta: None,
                },
                PersistOptions::default(),
            )
            .await
            .unwrap();

        row_mock.assert();
        upload_mock.assert();
        blob_mock.assert();
        assert_eq!(outcome.id, "row-9");
        assert_eq!(
            outcome.paths.html_path.as_deref(),
            Some("scraper/row-9/index.html")
        );
        assert!(outcome.paths.text_path.is_none());
    }

    #[tokio::test]
    async fn failed_upload_degrades_to_inline() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/v1/scrape_results");
            then.status(201).json_body(serde_json::json!([{ "id": "row-3" }]));
        });
        let upload_mock = server.mock(|when, then| {
            when.method(POST).path("/storage/v1/object/scraper/scraper/row-3/index.html");
            then.status(500).body("bucket missing");
        });
        server.mock(|when, then| {
            when.method(POST).path("/rest/v1/scrape_blobs");
            then.status(201);
        });

        let outcome = store(&server, Some("scraper"))
            .upsert_result(
                meta(),
                PersistBlobs {
                    html: Some("<p>tiny</p>".into()),
                    ..Default::default()
                },
                PersistOptions {
                    force_html_storage: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        upload_mock.assert();
        assert_eq!(outcome.id, "row-3");
        assert!(outcome.paths.is_empty());
    }

    #[tokio::test]
    async fn row_failure_is_http_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rest/v1/scrape_results");
            then.status(409).body("conflict");
        });
        let err = store(&server, None)
            .upsert_result(meta(), PersistBlobs::default(), PersistOptions::default())
            .await
            .unwrap_err();
        match err {
            StoreError::Http { status, body } => {
                assert_eq!(status, 409);
                assert_eq!(body, "conflict");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn find_fresh_decodes_joined_blobs() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/scrape_results")
                .query_param("normalized_url", "eq.https://a.test/story")
                .query_param("order", "ts.desc")
                .query_param("limit", "1");
            then.status(200).json_body(serde_json::json!([{
                "id": "row-1",
                "url": "https://a.test/story",
                "normalized_url": "https://a.test/story",
                "canonical_url": null,
                "ts": "2024-05-01T10:00:00.000+00:00",
                "type": "html",
                "status": "ok",
                "confidence": 0.8,
                "title": "Story",
                "language": "en",
                "site_name": null,
                "content_hash": null,
                "has_html": false,
                "error_code": null,
                "error_message": null,
                "scrape_blobs": [
                    { "kind": "text", "path": null, "content": "cached body" }
                ]
            }]));
        });

        let found = store(&server, None)
            .find_fresh_by_url("https://a.test/story", 60_000)
            .await
            .unwrap()
            .unwrap();
        mock.assert();
        assert_eq!(found.id, "row-1");
        assert_eq!(found.into_scrape_result().content.text, "cached body");
    }

    #[tokio::test]
    async fn zero_ttl_skips_the_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/rest/v1/scrape_results");
            then.status(200).json_body(serde_json::json!([]));
        });
        let found = store(&server, None)
            .find_fresh_by_url("https://a.test/story", 0)
            .await
            .unwrap();
        assert!(found.is_none());
        mock.assert_hits(0);
    }
}

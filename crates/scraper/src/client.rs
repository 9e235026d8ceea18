// ABOUTME: The pipeline Client: cache check, type detection, HTML/PDF dispatch, persistence and trace attachment.
// ABOUTME: scrape() always yields a well-formed ScrapeResult; save_edit() re-persists a manually edited result.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;

use crate::edit::EditPayload;
use crate::error::{EditError, ScrapeError};
use crate::html::scrape_html;
use crate::options::{ClientBuilder, ScraperConfig};
use crate::pdf::scrape_pdf;
use crate::persistence::{PersistBlobs, PersistMeta, PersistOptions};
use crate::resource::{redirect_policy, FetchOptions};
use crate::result::{RequestType, ScrapeOptions, ScrapeRequest, ScrapeResult, ScrapeType};
use crate::trace::{Trace, METHOD_CACHE_HIT, TOOL_CACHE, TOOL_PERSIST};
use crate::urls::{detect_type_from_url, normalize_url};

/// The scraping pipeline.
#[derive(Debug, Clone)]
pub struct Client {
    config: ScraperConfig,
    http: reqwest::Client,
}

/// A finished extraction before persistence.
struct Extraction {
    result: ScrapeResult,
    raw_html: Option<String>,
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given configuration.
    pub fn new(config: ScraperConfig) -> Self {
        let http = config.http_client.clone().unwrap_or_else(|| {
            reqwest::Client::builder()
                .redirect(redirect_policy(config.allow_private_networks))
                .user_agent(&config.user_agent)
                .cookie_store(true)
                .gzip(true)
                .brotli(true)
                .deflate(true)
                .build()
                .unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "failed to build HTTP client; using defaults");
                    reqwest::Client::new()
                })
        });
        Self { config, http }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Bearer token the HTTP surface expects, if configured.
    pub fn secret(&self) -> Option<&str> {
        self.config.secret.as_deref().filter(|s| !s.is_empty())
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetch options for one outbound call: configured headers, user agent and `accept`.
    pub(crate) fn fetch_options(&self, accept: &str, timeout: Duration) -> FetchOptions {
        let mut opts = FetchOptions {
            headers: self.config.headers.clone(),
            allow_private_networks: self.config.allow_private_networks,
            timeout,
        };
        opts.headers
            .insert("user-agent".to_string(), self.config.user_agent.clone());
        opts.headers.insert("accept".to_string(), accept.to_string());
        opts
    }

    /// Whether `content.html` is returned: the request option, else the configured default.
    pub fn include_html(&self, options: &ScrapeOptions) -> bool {
        options.return_html.unwrap_or(self.config.return_html_default)
    }

    /// Scrape type for a request: an explicit non-auto type wins, else the URL decides.
    pub fn resolve_type(request: &ScrapeRequest) -> ScrapeType {
        match request.request_type {
            Some(RequestType::Html) => ScrapeType::Html,
            Some(RequestType::Pdf) => ScrapeType::Pdf,
            Some(RequestType::Youtube) => ScrapeType::Youtube,
            Some(RequestType::Auto) | None => detect_type_from_url(request.url.trim()),
        }
    }

    /// Runs the pipeline for one request.
    ///
    /// Never fails: fetch, extraction and persistence problems end up in the
    /// returned result's `status`/`error` and in its `debug` trace.
    pub async fn scrape(&self, request: ScrapeRequest) -> ScrapeResult {
        let url = request.url.trim().to_string();
        let normalized_url = normalize_url(&url);
        let kind = Self::resolve_type(&request);
        let options = request.options;
        let include_html = self.include_html(&options);
        let mut trace = Trace::new();

        if options.prefer_browser.unwrap_or(false) {
            trace.note("browser rendering unavailable; using HTTP fetch");
        }

        let ttl = self.config.cache_ttl_ms;
        if !options.is_forced() && ttl > 0 {
            match self.config.store.find_fresh_by_url(&normalized_url, ttl).await {
                Ok(Some(stored)) => {
                    trace.set_method(METHOD_CACHE_HIT);
                    trace.use_tool(TOOL_CACHE);
                    let mut result = stored.into_scrape_result();
                    if !include_html {
                        result.content.html = None;
                    }
                    attach_debug(&mut result, &trace, &url);
                    return result;
                }
                Ok(None) => {}
                Err(err) => trace.note(format!("cache lookup failed: {}", err)),
            }
        }

        let run = AssertUnwindSafe(self.extract(
            kind,
            &url,
            &normalized_url,
            &options,
            include_html,
            &mut trace,
        ))
        .catch_unwind()
        .await;

        let Extraction {
            mut result,
            raw_html,
        } = match run {
            Ok(extraction) => extraction,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Scrape failed".to_string());
                trace.note(message.clone());
                let kind = if kind == ScrapeType::Pdf {
                    ScrapeType::Pdf
                } else {
                    ScrapeType::Html
                };
                let err = ScrapeError::unhandled(&url, "Scrape", Some(anyhow::anyhow!(message)));
                Extraction {
                    result: ScrapeResult::from_error(kind, &url, &err),
                    raw_html: None,
                }
            }
        };

        result.debug = Some(trace.finalize());
        self.persist(&mut result, raw_html.as_deref(), include_html, &mut trace)
            .await;
        attach_debug(&mut result, &trace, &url);
        result
    }

    async fn extract(
        &self,
        kind: ScrapeType,
        url: &str,
        normalized_url: &str,
        options: &ScrapeOptions,
        include_html: bool,
        trace: &mut Trace,
    ) -> Extraction {
        if kind == ScrapeType::Pdf {
            let result = scrape_pdf(self, url, normalized_url, options, trace).await;
            return Extraction {
                result,
                raw_html: None,
            };
        }
        let outcome = scrape_html(self, url, normalized_url, options, include_html, trace).await;
        Extraction {
            result: outcome.result,
            raw_html: outcome.raw_html,
        }
    }

    /// Stores the result; failures become trace notes.
    ///
    /// Raw HTML is always offered to the store and forced to external storage
    /// when the caller did not ask for it inline.
    async fn persist(
        &self,
        result: &mut ScrapeResult,
        raw_html: Option<&str>,
        include_html: bool,
        trace: &mut Trace,
    ) {
        let html_source = raw_html
            .map(str::to_string)
            .or_else(|| result.content.html.clone());
        let meta = PersistMeta::from_result(result, html_source.is_some());
        let blobs = PersistBlobs {
            html: html_source,
            text: Some(result.content.text.clone()),
            meta: Some(serde_json::json!({
                "metadata": result.metadata,
                "confidenceFactors": result.confidence_factors,
                "debug": result.debug,
                "storage": result.storage,
                "error": result.error,
            })),
        };
        let options = PersistOptions {
            force_html_storage: raw_html.is_some() && !include_html,
            ..Default::default()
        };

        match self.config.store.upsert_result(meta, blobs, options).await {
            Ok(outcome) => {
                if !outcome.paths.is_empty() {
                    result
                        .storage
                        .get_or_insert_with(Default::default)
                        .merge(outcome.paths);
                }
                if !outcome.id.is_empty() {
                    result.id = outcome.id;
                    trace.use_tool(TOOL_PERSIST);
                }
            }
            Err(err) => {
                tracing::warn!(url = %result.url, error = %err, "persisting scrape result failed");
                trace.note(format!("persistence failed: {}", err));
            }
        }
    }

    /// Re-persists a manually edited result under `id`.
    pub async fn save_edit(&self, id: &str, payload: EditPayload) -> Result<ScrapeResult, EditError> {
        let prepared = payload.prepare(id, Utc::now())?;
        let stored = self
            .config
            .store
            .upsert_result(
                prepared.persist_meta(),
                prepared.persist_blobs(),
                prepared.persist_options(),
            )
            .await
            .map_err(|err| {
                EditError::Store(ScrapeError::db(
                    prepared.url.clone(),
                    "SaveEdit",
                    Some(anyhow::anyhow!("{}", err)),
                ))
            })?;
        Ok(prepared.into_result(stored))
    }
}

fn attach_debug(result: &mut ScrapeResult, trace: &Trace, url: &str) {
    let report = trace.finalize();
    tracing::info!(
        url = %url,
        method = %report.method,
        status = result.status.as_str(),
        attempts = report.attempts.len(),
        tools = ?report.tools_used,
        notes = ?report.notes,
        "scrape finished"
    );
    result.debug = Some(report);
}

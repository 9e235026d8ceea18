// ABOUTME: Anti-bot challenge detection and the AMP fallback resolver for HTML pages.
// ABOUTME: Candidates are loaded through a PageSource so the fallback order can be tested without the network.

use std::time::Duration;

use async_trait::async_trait;

use crate::client::Client;
use crate::error::ScrapeError;
use crate::resource::{fetch, ACCEPT_HTML};
use crate::trace::{Trace, STEP_AMP_FALLBACK, TOOL_AMP};
use crate::urls::build_fallback_urls;

/// Lower-cased body markers of known bot-protection interstitials.
pub const CHALLENGE_MARKERS: &[&str] = &["client_captcha", "attempt to load the requested page"];

pub const BLOCKED_MESSAGE: &str =
    "Blocked by upstream anti-bot challenge. Try manual review or browser mode.";

pub fn is_challenge_page(html: &str) -> bool {
    let lowered = html.to_lowercase();
    CHALLENGE_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// An HTML body and the URL it was finally served from.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub html: String,
    pub url: String,
}

/// Loads fallback candidates.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn load(&self, url: &str) -> Result<Page, ScrapeError>;
}

/// Loads candidates over HTTP with browser-like headers.
pub(crate) struct HttpPages<'a> {
    client: &'a Client,
    timeout: Duration,
}

impl<'a> HttpPages<'a> {
    pub(crate) fn new(client: &'a Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl PageSource for HttpPages<'_> {
    async fn load(&self, url: &str) -> Result<Page, ScrapeError> {
        let opts = self
            .client
            .fetch_options(ACCEPT_HTML, self.timeout)
            .header("accept-language", "en-US,en;q=0.9");
        let response = fetch(self.client.http(), url, &opts).await?;
        Ok(Page {
            html: response.text(),
            url: response.final_url,
        })
    }
}

/// Outcome of resolving a fetched page.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Page(Page),
    Blocked,
}

/// Returns `initial` unless it is a challenge page; otherwise tries each AMP
/// candidate of `original_url` in order and returns the first clean one.
pub async fn resolve(
    initial: Page,
    original_url: &str,
    source: &dyn PageSource,
    trace: &mut Trace,
) -> Resolution {
    if !is_challenge_page(&initial.html) {
        return Resolution::Page(initial);
    }

    trace.note("Encountered challenge page, attempting AMP fallback");
    for candidate in build_fallback_urls(original_url) {
        trace.attempt(STEP_AMP_FALLBACK, Some(&candidate));
        match source.load(&candidate).await {
            Ok(page) if !is_challenge_page(&page.html) => {
                trace.use_tool(TOOL_AMP);
                return Resolution::Page(page);
            }
            Ok(_) => tracing::debug!(candidate = %candidate, "fallback candidate is also a challenge"),
            Err(err) => {
                trace.note(format!("AMP fallback failed for {}: {}", candidate, err.message()))
            }
        }
    }

    Resolution::Blocked
}

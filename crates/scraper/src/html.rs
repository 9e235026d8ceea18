// ABOUTME: HTML extractor: fetches a page, reroutes PDFs, resolves challenge pages and builds the HTML ScrapeResult.
// ABOUTME: Configured host fields take precedence over baseline metadata; the summary falls back to the body text.

use scraper::Html;

use crate::challenge::{self, HttpPages, Page, Resolution, BLOCKED_MESSAGE};
use crate::client::Client;
use crate::error::{ErrorCode, ScrapeError};
use crate::extractors::fields::{extract_base_metadata, extract_configured_fields};
use crate::extractors::readable::extract_readable_text;
use crate::options::ScraperConfig;
use crate::pdf;
use crate::resource::{fetch, ACCEPT_HTML};
use crate::result::{Metadata, ScrapeOptions, ScrapeResult, ScrapeStatus, ScrapeType};
use crate::scoring::{score_html, HtmlSignals, FACTOR_CHALLENGE};
use crate::text::{create_summary_from_text, sanitize_summary};
use crate::trace::{Trace, METHOD_HTML, STEP_HTML_FETCH, TOOL_HTTP};
use crate::urls::hostname;

/// An HTML run's result plus the markup handed to persistence.
#[derive(Debug)]
pub(crate) struct HtmlOutcome {
    pub result: ScrapeResult,
    pub raw_html: Option<String>,
}

impl HtmlOutcome {
    fn bare(result: ScrapeResult) -> Self {
        Self {
            result,
            raw_html: None,
        }
    }
}

pub(crate) async fn scrape_html(
    client: &Client,
    url: &str,
    normalized_url: &str,
    options: &ScrapeOptions,
    include_html: bool,
    trace: &mut Trace,
) -> HtmlOutcome {
    trace.set_method(METHOD_HTML);
    trace.attempt(STEP_HTML_FETCH, Some(url));

    let timeout = options.timeout_or(client.config().html_timeout);
    let fetch_opts = client.fetch_options(ACCEPT_HTML, timeout);
    let response = match fetch(client.http(), url, &fetch_opts).await {
        Ok(response) => response,
        Err(err) => {
            trace.note(err.message());
            return HtmlOutcome::bare(ScrapeResult::from_error(ScrapeType::Html, url, &err));
        }
    };
    trace.use_tool(TOOL_HTTP);

    if response.is_pdf() {
        trace.note("Content-Type application/pdf detected during HTML scrape path");
        let result =
            pdf::extract_pdf(client, url, normalized_url, &response.body, options, trace).await;
        return HtmlOutcome::bare(result);
    }

    if !response.is_html() {
        let message = format!(
            "Unsupported content type: {}",
            response.content_type_or_unknown()
        );
        trace.note(message.clone());
        let err = ScrapeError::unsupported_content_type(url, "Html", Some(anyhow::anyhow!(message)));
        return HtmlOutcome::bare(ScrapeResult::from_error(ScrapeType::Html, url, &err));
    }

    let initial = Page {
        html: response.text(),
        url: response.final_url.clone(),
    };
    let pages = HttpPages::new(client, timeout);
    match challenge::resolve(initial, url, &pages, trace).await {
        Resolution::Blocked => HtmlOutcome::bare(blocked_result(url)),
        Resolution::Page(page) => {
            let result = build_html_result(
                client.config(),
                url,
                normalized_url,
                &page,
                options.language_hint.as_deref(),
                include_html,
            );
            HtmlOutcome {
                result,
                raw_html: Some(page.html),
            }
        }
    }
}

/// Terminal result for a page whose fallbacks were all challenges.
pub fn blocked_result(url: &str) -> ScrapeResult {
    let mut result = ScrapeResult::failure(ScrapeType::Html, url, ErrorCode::Blocked, BLOCKED_MESSAGE);
    result.status = ScrapeStatus::Blocked;
    result.confidence_factors.push(FACTOR_CHALLENGE.to_string());
    result
}

fn present(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Extracts text and metadata from a resolved page.
pub(crate) fn build_html_result(
    config: &ScraperConfig,
    url: &str,
    normalized_url: &str,
    page: &Page,
    language_hint: Option<&str>,
    include_html: bool,
) -> ScrapeResult {
    let guideline = &config.rules.summary;
    let doc = Html::parse_document(&page.html);

    let base = extract_base_metadata(&doc, &page.url);
    let text = extract_readable_text(&doc);
    let host = hostname(&page.url).unwrap_or_default();
    let rules = config.rules.for_host(&host);
    let configured = extract_configured_fields(&doc, &page.html, &rules, guideline.max_length);

    let summary_source = present(configured.summary)
        .or_else(|| base.description.clone())
        .unwrap_or_else(|| create_summary_from_text(&text, guideline.max_length));
    let summary = sanitize_summary(&summary_source, guideline.max_length);

    let title = present(configured.title).or(base.title);
    let author = present(configured.author).or(base.author);
    let site_name = present(configured.publication).or(base.site_name);

    let confidence = score_html(&HtmlSignals {
        text: &text,
        title: title.as_deref(),
        description: base.description.as_deref(),
        canonical_url: base.canonical_url.as_deref(),
        language: base.language.as_deref(),
    });

    let language = base.language.or_else(|| {
        language_hint
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
            .map(str::to_string)
    });

    let mut result = ScrapeResult::new(ScrapeType::Html, url, normalized_url);
    result.canonical_url = base.canonical_url;
    result.confidence = confidence.score;
    result.confidence_factors = confidence.factors;
    result.content.text = text;
    result.content.html = if include_html {
        Some(page.html.clone())
    } else {
        None
    };
    result.metadata = Metadata {
        title,
        description: base.description,
        summary: present(summary),
        summary_guideline: Some(guideline.prompt.clone()),
        author,
        publish_date: base.publish_date,
        site_name,
        language,
        images: if base.images.is_empty() {
            None
        } else {
            Some(base.images)
        },
        tags: None,
    };
    result
}

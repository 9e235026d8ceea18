// ABOUTME: PDF extractor: downloads a PDF and runs the ordered text strategies (library, stream decode, readability proxy).
// ABOUTME: Builds the PDF ScrapeResult with document-info metadata, the PDF confidence score and a bounded text body.

pub mod date;
pub mod library;
pub mod proxy;
pub mod streams;

use crate::client::Client;
use crate::error::ScrapeError;
use crate::pdf::library::PdfInfo;
use crate::pdf::proxy::{parse_proxy_document, ProxyDocument};
use crate::resource::{fetch, ACCEPT_PDF};
use crate::result::{Metadata, ScrapeOptions, ScrapeResult, ScrapeType};
use crate::scoring::score_pdf;
use crate::text::{
    clean_extracted_value, create_summary_from_text, first_non_empty, sanitize_summary,
    truncate_with_ellipsis, MAX_PDF_TEXT_LENGTH,
};
use crate::trace::{
    Trace, METHOD_PDF, STEP_PDF_FETCH, STEP_PDF_PROXY, STEP_PDF_TEXT, TOOL_HTTP, TOOL_PDF_LIBRARY,
    TOOL_PDF_STREAMS, TOOL_PROXY,
};
use crate::urls::{build_proxy_url, hostname};

/// Text shorter than this (in characters) still triggers the readability proxy.
pub const MIN_PDF_TEXT: usize = 120;

/// Longest title derived from the body text when no document title exists.
const MAX_DERIVED_TITLE: usize = 200;

/// Text strategies, in the order they are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfStrategy {
    Library,
    StreamDecode,
    ReadabilityProxy,
}

pub const STRATEGY_ORDER: [PdfStrategy; 3] = [
    PdfStrategy::Library,
    PdfStrategy::StreamDecode,
    PdfStrategy::ReadabilityProxy,
];

impl PdfStrategy {
    /// Whether this strategy runs given the text gathered so far.
    pub fn should_run(&self, current_text: &str) -> bool {
        match self {
            PdfStrategy::Library => true,
            PdfStrategy::StreamDecode => current_text.is_empty(),
            PdfStrategy::ReadabilityProxy => {
                current_text.is_empty() || current_text.chars().count() < MIN_PDF_TEXT
            }
        }
    }

    /// Detail recorded on the trace attempt.
    pub fn label(&self) -> &'static str {
        match self {
            PdfStrategy::Library => "lopdf",
            PdfStrategy::StreamDecode => "regex",
            PdfStrategy::ReadabilityProxy => "readability-proxy",
        }
    }
}

/// State threaded through the strategy chain.
#[derive(Debug, Default)]
struct PdfExtraction {
    text: String,
    info: PdfInfo,
    proxy: Option<ProxyDocument>,
}

/// Downloads `url` as a PDF and extracts it.
pub(crate) async fn scrape_pdf(
    client: &Client,
    url: &str,
    normalized_url: &str,
    options: &ScrapeOptions,
    trace: &mut Trace,
) -> ScrapeResult {
    trace.set_method(METHOD_PDF);
    trace.attempt(STEP_PDF_FETCH, Some(url));

    let timeout = options.timeout_or(client.config().pdf_timeout);
    let fetch_opts = client.fetch_options(ACCEPT_PDF, timeout);
    let response = match fetch(client.http(), url, &fetch_opts).await {
        Ok(response) => response,
        Err(err) => {
            trace.note(err.message());
            return ScrapeResult::from_error(ScrapeType::Pdf, url, &err);
        }
    };
    trace.use_tool(TOOL_HTTP);

    if !response.is_pdf() {
        let content_type = response.content_type_or_unknown();
        trace.note(format!("Expected PDF but received {}", content_type));
        let err = ScrapeError::unsupported_content_type(
            url,
            "Pdf",
            Some(anyhow::anyhow!(
                "Expected application/pdf but received {}",
                content_type
            )),
        );
        return ScrapeResult::from_error(ScrapeType::Pdf, url, &err);
    }

    extract_pdf(client, url, normalized_url, &response.body, options, trace).await
}

/// Runs the text strategies over an already downloaded PDF body.
pub(crate) async fn extract_pdf(
    client: &Client,
    url: &str,
    normalized_url: &str,
    body: &[u8],
    options: &ScrapeOptions,
    trace: &mut Trace,
) -> ScrapeResult {
    trace.set_method(METHOD_PDF);
    let summary_max = client.config().rules.summary.max_length;
    let mut run = PdfExtraction::default();

    for strategy in STRATEGY_ORDER {
        if !strategy.should_run(&run.text) {
            continue;
        }
        match strategy {
            PdfStrategy::Library => {
                trace.attempt(STEP_PDF_TEXT, Some(strategy.label()));
                match library::extract(body) {
                    Ok(output) => {
                        if !output.text.is_empty() {
                            run.text = output.text;
                            trace.use_tool(TOOL_PDF_LIBRARY);
                        }
                        run.info = output.info;
                    }
                    Err(err) => trace.note(format!("pdf library failed: {}", err)),
                }
            }
            PdfStrategy::StreamDecode => {
                trace.attempt(STEP_PDF_TEXT, Some(strategy.label()));
                let text = streams::extract_text_from_streams(body);
                if !text.is_empty() {
                    run.text = text;
                    trace.use_tool(TOOL_PDF_STREAMS);
                }
            }
            PdfStrategy::ReadabilityProxy => {
                trace.note(
                    "PDF extraction yielded little or no text, attempting jina.ai proxy fallback",
                );
                let proxy_url = build_proxy_url(&client.config().readability_proxy_base, url);
                trace.attempt(STEP_PDF_PROXY, Some(&proxy_url));
                let timeout = options.timeout_or(client.config().pdf_timeout);
                let fetch_opts = client.fetch_options("text/plain,*/*;q=0.8", timeout);
                match fetch(client.http(), &proxy_url, &fetch_opts).await {
                    Ok(response) => {
                        let raw = response.text();
                        let document = parse_proxy_document(&raw, summary_max);
                        let text = document
                            .as_ref()
                            .map(|d| d.text.clone())
                            .filter(|t| !t.is_empty())
                            .unwrap_or_else(|| clean_extracted_value(&raw));
                        if !text.is_empty() {
                            run.text = text;
                            trace.use_tool(TOOL_PROXY);
                        }
                        run.proxy = document;
                    }
                    Err(err) => trace.note(format!("jina.ai fallback failed: {}", err.message())),
                }
            }
        }
    }

    if run.text.is_empty() {
        trace.note("PDF extraction returned no usable text");
        let err = ScrapeError::empty_content(
            url,
            "Pdf",
            Some(anyhow::anyhow!("PDF extraction returned no text")),
        );
        return ScrapeResult::from_error(ScrapeType::Pdf, url, &err);
    }

    build_pdf_result(client, url, normalized_url, run)
}

fn build_pdf_result(
    client: &Client,
    url: &str,
    normalized_url: &str,
    run: PdfExtraction,
) -> ScrapeResult {
    let guideline = &client.config().rules.summary;
    let text = truncate_with_ellipsis(&run.text, MAX_PDF_TEXT_LENGTH);
    let proxy = run.proxy.unwrap_or_default();
    let info = run.info;

    let summary_source = proxy
        .summary
        .clone()
        .unwrap_or_else(|| create_summary_from_text(&text, guideline.max_length));
    let summary = sanitize_summary(&summary_source, guideline.max_length);

    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| truncate_with_ellipsis(line, MAX_DERIVED_TITLE));
    let title = first_non_empty([
        proxy.title.as_deref(),
        info.title.as_deref(),
        first_line.as_deref(),
    ]);

    let tags = info.tags();
    let confidence = score_pdf(&text);

    let mut result = ScrapeResult::new(ScrapeType::Pdf, url, normalized_url);
    result.confidence = confidence.score;
    result.confidence_factors = confidence.factors;
    result.metadata = Metadata {
        title,
        description: non_empty(summary.clone()),
        summary: non_empty(summary),
        summary_guideline: Some(guideline.prompt.clone()),
        author: proxy.author.clone().or(info.author),
        publish_date: proxy.published_time.clone().or(info.publish_date),
        site_name: proxy.site_name.clone().or_else(|| hostname(url)),
        language: None,
        images: None,
        tags: if tags.is_empty() { None } else { Some(tags) },
    };
    result.content.text = text;
    result
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

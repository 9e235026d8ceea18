// ABOUTME: End-to-end pipeline tests against a local mock server: HTML, challenge fallbacks, PDF chain, cache and edits.
// ABOUTME: Every client allows private networks and persists into an in-memory store.

use std::sync::Arc;

use httpmock::prelude::*;
use newsdesk_scraper::persistence::BlobKind;
use newsdesk_scraper::{
    Client, EditPayload, MemoryStore, RequestType, ScrapeOptions, ScrapeRequest, ScrapeStatus,
    ScrapeType,
};
use pretty_assertions::assert_eq;

fn client(store: Arc<MemoryStore>) -> Client {
    Client::builder()
        .allow_private_networks(true)
        .store(store)
        .build()
}

fn article_html(canonical: &str) -> String {
    let paragraph = "The council approved the new transit plan after a long debate about \
                     funding, routes and the timeline for construction across the city. ";
    format!(
        r#"<html lang="en"><head>
<title>Transit plan approved</title>
<meta name="description" content="The council approved a transit plan.">
<link rel="canonical" href="{canonical}">
</head><body><nav>Home</nav><article><h1>Transit plan approved</h1><p>{body}</p></article>
<script>var tracking = true;</script></body></html>"#,
        canonical = canonical,
        body = paragraph.repeat(8)
    )
}

const CHALLENGE_HTML: &str =
    "<html><body><div id=\"client_captcha\">Please verify you are human</div></body></html>";

#[tokio::test]
async fn html_article_is_scored_and_persisted() {
    let server = MockServer::start();
    let page = server.mock(|when, then| {
        when.method(GET).path("/news/transit");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(article_html("https://city.test/news/transit"));
    });

    let store = Arc::new(MemoryStore::new());
    let url = server.url("/news/transit");
    let mut request = ScrapeRequest::new(&url);
    request.options.return_html = Some(false);
    let result = client(store.clone()).scrape(request).await;
    page.assert();

    assert_eq!(result.status, ScrapeStatus::Ok);
    assert_eq!(result.kind, ScrapeType::Html);
    assert!(result.confidence >= 0.7, "confidence {}", result.confidence);
    for factor in [
        "text_length>=800",
        "title_present",
        "description_present",
        "canonical_present",
        "language_detected",
    ] {
        assert!(
            result.confidence_factors.iter().any(|f| f == factor),
            "missing {factor}"
        );
    }
    assert!(result.content.text.contains("transit plan"));
    assert!(!result.content.text.contains("tracking"));
    assert!(result.content.html.is_none());
    assert_eq!(result.metadata.title.as_deref(), Some("Transit plan approved"));
    assert_eq!(result.metadata.language.as_deref(), Some("en"));
    assert_eq!(
        result.canonical_url.as_deref(),
        Some("https://city.test/news/transit")
    );

    let debug = result.debug.as_ref().unwrap();
    assert_eq!(debug.method, "html-http");
    assert!(debug.tools_used.iter().any(|t| t == "reqwest:http"));
    assert!(debug.tools_used.iter().any(|t| t == "store:persist"));

    let stored = store.get(&result.normalized_url).unwrap();
    assert_eq!(stored.id, result.id);
    // raw HTML is kept out of the row when the caller did not ask for it
    let html_blob = stored.blob(BlobKind::Html).unwrap();
    assert!(html_blob.content.is_none());
    let html_path = html_blob.path.clone().unwrap();
    assert!(store.object(&html_path).unwrap().contains("<article>"));
    assert_eq!(
        result.storage.as_ref().and_then(|s| s.html_path.as_deref()),
        Some(html_path.as_str())
    );
}

#[tokio::test]
async fn html_is_returned_by_default() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/news/default");
        then.status(200)
            .header("content-type", "text/html; charset=utf-8")
            .body(article_html("https://city.test/news/default"));
    });

    let store = Arc::new(MemoryStore::new().with_external_storage(false));
    let result = client(store.clone())
        .scrape(ScrapeRequest::new(server.url("/news/default")))
        .await;

    assert_eq!(result.status, ScrapeStatus::Ok);
    assert!(result.content.html.as_deref().unwrap().contains("<article>"));
    let stored = store.get(&result.normalized_url).unwrap();
    assert!(stored.blob(BlobKind::Html).unwrap().content.is_some());
}

#[tokio::test]
async fn challenge_everywhere_is_blocked() {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method(GET);
        then.status(200)
            .header("content-type", "text/html")
            .body(CHALLENGE_HTML);
    });

    let url = server.url("/story");
    let result = client(Arc::new(MemoryStore::new()))
        .scrape(ScrapeRequest::new(&url))
        .await;

    // original page plus three AMP candidates
    any.assert_hits(4);
    assert_eq!(result.status, ScrapeStatus::Blocked);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.url, url);
    assert_eq!(result.error.as_ref().map(|e| e.code.as_str()), Some("BLOCKED"));
    assert_eq!(result.confidence_factors, vec!["challenge_page_detected"]);
    assert!(result.content.text.is_empty());
    let debug = result.debug.unwrap();
    assert!(debug.notes.iter().any(|n| n.contains("AMP fallback")));
    assert!(!debug.tools_used.iter().any(|t| t == "amp-fallback"));
}

#[tokio::test]
async fn amp_fallback_recovers_article() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/story").query_param("outputType", "amp");
        then.status(200)
            .header("content-type", "text/html")
            .body(article_html("https://city.test/story"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/story");
        then.status(200)
            .header("content-type", "text/html")
            .body(CHALLENGE_HTML);
    });

    let result = client(Arc::new(MemoryStore::new()))
        .scrape(ScrapeRequest::new(server.url("/story")))
        .await;

    assert_eq!(result.status, ScrapeStatus::Ok);
    assert!(result.content.text.contains("transit plan"));
    let debug = result.debug.unwrap();
    assert!(debug.tools_used.iter().any(|t| t == "amp-fallback"));
}

fn stream_pdf(sentence: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf ({}) Tj ET", sentence);
    format!(
        "%PDF-1.4\n4 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n%%EOF\n",
        content.len(),
        content
    )
    .into_bytes()
}

#[tokio::test]
async fn pdf_stream_text_skips_proxy() {
    let sentence = "Quarterly report on regional water quality shows steady improvement \
                    across all monitored reservoirs and treatment plants this year";
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/files/report.pdf");
        then.status(200)
            .header("content-type", "application/pdf")
            .body(stream_pdf(sentence));
    });
    let proxy = server.mock(|when, then| {
        when.method(GET).path_includes("/proxy/");
        then.status(200).body("Title: Proxy\n\nMarkdown Content:\nproxy text");
    });

    let client = Client::builder()
        .allow_private_networks(true)
        .readability_proxy_base(server.url("/proxy/"))
        .store(Arc::new(MemoryStore::new()))
        .build();
    let result = client
        .scrape(ScrapeRequest::new(server.url("/files/report.pdf")))
        .await;

    proxy.assert_hits(0);
    assert_eq!(result.status, ScrapeStatus::Ok);
    assert_eq!(result.kind, ScrapeType::Pdf);
    assert!(result.content.text.contains("regional water quality"));
    assert!(result.confidence > 0.0);
    let debug = result.debug.unwrap();
    assert_eq!(debug.method, "pdf-basic");
    assert!(!debug.tools_used.iter().any(|t| t == "jina.ai-proxy"));
}

#[tokio::test]
async fn short_pdf_text_uses_proxy() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/files/scan.pdf");
        then.status(200)
            .header("content-type", "application/pdf")
            .body(stream_pdf("Page 1"));
    });
    let proxy = server.mock(|when, then| {
        when.method(GET).path_includes("/proxy/");
        then.status(200).header("content-type", "text/plain").body(
            "Title: Annual Budget\nURL Source: https://city.test/files/scan.pdf\n\n\
             Markdown Content:\nThe annual budget allocates funding to schools, parks and \
             public safety with a focus on long term maintenance of existing infrastructure.",
        );
    });

    let client = Client::builder()
        .allow_private_networks(true)
        .readability_proxy_base(server.url("/proxy/"))
        .store(Arc::new(MemoryStore::new()))
        .build();
    let result = client
        .scrape(ScrapeRequest::new(server.url("/files/scan.pdf")))
        .await;

    proxy.assert();
    assert_eq!(result.status, ScrapeStatus::Ok);
    assert!(result.content.text.contains("annual budget"));
    assert_eq!(result.metadata.title.as_deref(), Some("Annual Budget"));
    let debug = result.debug.unwrap();
    assert!(debug.tools_used.iter().any(|t| t == "jina.ai-proxy"));
    assert!(debug
        .notes
        .iter()
        .any(|n| n.contains("attempting jina.ai proxy fallback")));
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let server = MockServer::start();
    let page = server.mock(|when, then| {
        when.method(GET).path("/cached");
        then.status(200)
            .header("content-type", "text/html")
            .body(article_html("https://city.test/cached"));
    });

    let client = client(Arc::new(MemoryStore::new()));
    let url = server.url("/cached");
    let without_html = || {
        let mut request = ScrapeRequest::new(&url);
        request.options.return_html = Some(false);
        request
    };
    let first = client.scrape(without_html()).await;
    let second = client.scrape(without_html()).await;

    page.assert_hits(1);
    assert_eq!(second.id, first.id);
    assert_eq!(second.content.text, first.content.text);
    assert!(second.content.html.is_none());
    let debug = second.debug.unwrap();
    assert_eq!(debug.method, "cache-hit");
    assert_eq!(debug.tools_used, vec!["store:cache"]);

    let mut forced = ScrapeRequest::new(&url);
    forced.options = ScrapeOptions {
        force: Some(true),
        ..Default::default()
    };
    let third = client.scrape(forced).await;
    page.assert_hits(2);
    assert_eq!(third.debug.unwrap().method, "html-http");
}

#[tokio::test]
async fn cache_hit_returns_html_only_when_asked() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/with-html");
        then.status(200)
            .header("content-type", "text/html")
            .body(article_html("https://city.test/with-html"));
    });

    let client = Client::builder()
        .allow_private_networks(true)
        .store(Arc::new(MemoryStore::new().with_external_storage(false)))
        .build();
    let url = server.url("/with-html");
    client.scrape(ScrapeRequest::new(&url)).await;

    let mut request = ScrapeRequest::new(&url);
    request.options.return_html = Some(true);
    let hit = client.scrape(request).await;
    assert_eq!(hit.debug.as_ref().unwrap().method, "cache-hit");
    assert!(hit.content.html.unwrap().contains("<article>"));
}

#[tokio::test]
async fn unsupported_content_type_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/data.json");
        then.status(200)
            .header("content-type", "application/json")
            .body("{}");
    });

    let result = client(Arc::new(MemoryStore::new()))
        .scrape(ScrapeRequest::new(server.url("/data.json")))
        .await;

    assert_eq!(result.status, ScrapeStatus::Error);
    assert_eq!(
        result.error.as_ref().map(|e| e.code.as_str()),
        Some("UNSUPPORTED_CONTENT_TYPE")
    );
    assert_eq!(
        result.error.as_ref().map(|e| e.message.as_str()),
        Some("Unsupported content type: application/json")
    );
}

#[tokio::test]
async fn upstream_error_status_is_fetch_failed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/broken");
        then.status(500).body("oops");
    });

    let result = client(Arc::new(MemoryStore::new()))
        .scrape(ScrapeRequest::new(server.url("/broken")))
        .await;

    assert_eq!(result.status, ScrapeStatus::Error);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(
        result.error.as_ref().map(|e| e.code.as_str()),
        Some("FETCH_FAILED")
    );
    assert!(result.debug.unwrap().notes.iter().any(|n| n.contains("500")));
}

#[tokio::test]
async fn pdf_served_to_html_path_is_rerouted() {
    let server = MockServer::start();
    let download = server.mock(|when, then| {
        when.method(GET).path("/download");
        then.status(200)
            .header("content-type", "application/pdf")
            .body(stream_pdf(
                "Minutes of the planning commission meeting held on the first Tuesday \
                 of the month with all members present and the public invited to comment",
            ));
    });

    let result = client(Arc::new(MemoryStore::new()))
        .scrape(ScrapeRequest::new(server.url("/download")))
        .await;

    download.assert_hits(1);
    assert_eq!(result.kind, ScrapeType::Pdf);
    assert_eq!(result.status, ScrapeStatus::Ok);
    assert!(result.content.text.contains("planning commission"));
    let debug = result.debug.unwrap();
    assert!(debug
        .notes
        .iter()
        .any(|n| n.contains("Content-Type application/pdf detected")));
}

#[tokio::test]
async fn explicit_pdf_type_rejects_html_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/page");
        then.status(200)
            .header("content-type", "text/html")
            .body("<html></html>");
    });

    let mut request = ScrapeRequest::new(server.url("/page"));
    request.request_type = Some(RequestType::Pdf);
    let result = client(Arc::new(MemoryStore::new())).scrape(request).await;

    assert_eq!(result.kind, ScrapeType::Pdf);
    assert_eq!(
        result.error.as_ref().map(|e| e.code.as_str()),
        Some("UNSUPPORTED_CONTENT_TYPE")
    );
}

#[tokio::test]
async fn save_edit_overwrites_stored_row() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/edit-me");
        then.status(200)
            .header("content-type", "text/html")
            .body(article_html("https://city.test/edit-me"));
    });

    let store = Arc::new(MemoryStore::new());
    let client = client(store.clone());
    let scraped = client.scrape(ScrapeRequest::new(server.url("/edit-me"))).await;

    let payload: EditPayload = serde_json::from_value(serde_json::json!({
        "id": scraped.id,
        "url": scraped.url,
        "type": "html",
        "status": "ok",
        "confidence": 1.0,
        "content": { "text": "Corrected article text" },
        "metadata": { "title": "Corrected title" }
    }))
    .unwrap();
    let saved = client.save_edit(&scraped.id, payload).await.unwrap();

    assert_eq!(saved.id, scraped.id);
    assert_eq!(saved.content.text, "Corrected article text");
    let stored = store.get(&scraped.normalized_url).unwrap();
    assert_eq!(stored.row.title.as_deref(), Some("Corrected title"));
    assert_eq!(
        stored.blob(BlobKind::Text).and_then(|b| b.content.as_deref()),
        Some("Corrected article text")
    );

    let err = client
        .save_edit("other-id", EditPayload {
            id: Some(scraped.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_invalid());
}

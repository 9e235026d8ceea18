// ABOUTME: Integration tests for the newsdesk CLI binary.
// ABOUTME: Runs scrape and feeds check against a local mock server with private targets allowed.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use httpmock::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn newsdesk_cmd() -> Command {
    Command::cargo_bin("newsdesk").unwrap()
}

fn article_html() -> String {
    let paragraph = "Residents packed the library meeting room to hear the zoning board explain \
                     how the new housing rules would change building heights downtown. ";
    format!(
        "<html lang=\"en\"><head><title>Zoning rules explained</title></head>\
         <body><article><h1>Zoning rules explained</h1><p>{}</p></article></body></html>",
        paragraph.repeat(8)
    )
}

#[test]
fn scrape_prints_result_json() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/zoning");
        then.status(200)
            .header("content-type", "text/html")
            .body(article_html());
    });

    newsdesk_cmd()
        .arg("--compact")
        .arg("--allow-private")
        .arg("scrape")
        .arg(server.url("/zoning"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\":\"ok\""))
        .stdout(predicate::str::contains("Zoning rules explained"))
        .stdout(predicate::str::contains("\"html\":\"<html").not());
}

#[test]
fn scrape_of_private_target_is_refused_by_default() {
    let server = MockServer::start();
    let page = server.mock(|when, then| {
        when.method(GET).path("/zoning");
        then.status(200).body(article_html());
    });

    newsdesk_cmd()
        .arg("--compact")
        .arg("scrape")
        .arg(server.url("/zoning"))
        .assert()
        .success()
        .stdout(predicate::str::contains("FETCH_FAILED"));
    page.assert_hits(0);
}

#[test]
fn feeds_check_runs_one_pass() {
    let server = MockServer::start();
    let article_url = server.url("/zoning");
    let feed = format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Town</title>
<item><title>New housing rules</title><link>{}</link><guid>z-1</guid></item>
</channel></rss>"#,
        article_url
    );
    server.mock(|when, then| {
        when.method(GET).path("/feed.xml");
        then.status(200).body(feed);
    });
    server.mock(|when, then| {
        when.method(GET).path("/zoning");
        then.status(200)
            .header("content-type", "text/html")
            .body(article_html());
    });

    let dir = TempDir::new().unwrap();
    let config = dir.path().join("feeds.yaml");
    let cache = dir.path().join("processed.json");
    fs::write(
        &config,
        format!(
            "system_prompt: housing\nfeeds:\n  - rss_feed_url: {}\n",
            server.url("/feed.xml")
        ),
    )
    .unwrap();

    newsdesk_cmd()
        .arg("--allow-private")
        .arg("feeds")
        .arg("check")
        .arg("--config")
        .arg(&config)
        .arg("--cache")
        .arg(&cache)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Processed 1 feeds, found 1 relevant items, created 1 suggestions",
        ))
        .stdout(predicate::str::contains("Zoning rules explained"));

    let saved = fs::read_to_string(&cache).unwrap();
    assert!(saved.contains("z-1"));
}

#[test]
fn missing_subcommand_fails() {
    newsdesk_cmd().assert().failure();
}

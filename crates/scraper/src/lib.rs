// ABOUTME: Library entry point for the newsdesk scraper: fetch, extract, score and persist web pages and PDFs.
// ABOUTME: Re-exports the public API: Client, ClientBuilder, ScrapeRequest/ScrapeResult, errors and result stores.

//! Newsdesk scraper - turns a URL into a normalized, scored `ScrapeResult`.
//!
//! HTML pages go through challenge detection (with AMP fallbacks), metadata and
//! readable-text extraction driven by per-domain rules. PDFs go through a chain
//! of text extractors ending in a readability proxy. Results are cached and
//! persisted through a pluggable [`ResultStore`].
//!
//! # Example
//!
//! ```no_run
//! use newsdesk_scraper::{Client, ScrapeRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::builder().build();
//!     let result = client.scrape(ScrapeRequest::new("https://example.com/article")).await;
//!     println!("{} {:.2}", result.status.as_str(), result.confidence);
//! }
//! ```

pub mod challenge;
pub mod client;
pub mod edit;
pub mod error;
pub mod extractors;
pub mod html;
pub mod options;
pub mod pdf;
pub mod persistence;
pub mod resource;
pub mod result;
pub mod rules;
pub mod scoring;
pub mod text;
pub mod trace;
pub mod urls;

pub use crate::client::Client;
pub use crate::edit::{EditContent, EditPayload};
pub use crate::error::{EditError, ErrorCode, ScrapeError, StoreError};
pub use crate::options::{ClientBuilder, ScraperConfig};
pub use crate::persistence::{
    DisabledStore, MemoryStore, ResultStore, StoredResult, SupabaseConfig, SupabaseStore,
};
pub use crate::result::{
    Content, DebugInfo, Metadata, RequestType, ScrapeOptions, ScrapeRequest, ScrapeResult,
    ScrapeStatus, ScrapeType,
};
pub use crate::rules::{load_builtin_rules, DomainRules, RuleRegistry};

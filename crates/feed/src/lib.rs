// ABOUTME: Feed intake library: RSS/Atom parsing, GUID dedup, keyword relevance and scheduled ingestion passes.
// ABOUTME: Relevant items are handed to an injected extractor (the scraper Client) and forwarded to a suggestion sink.

pub mod config;
pub mod dedup;
pub mod error;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod processor;
pub mod relevance;
pub mod scheduler;

pub use config::{FeedConfig, IntakeConfig, IntakeConfigStore};
pub use dedup::DedupCache;
pub use error::FeedError;
pub use ingest::{Intake, ItemExtractor, SuggestionSink, INTAKE_SOURCE};
pub use models::{
    CheckSummary, FeedProcessingResult, FeedSummary, ProcessedFeed, ProcessedFeedCache,
    RelevanceResult, RssFeedItem,
};
pub use parser::{detect_format, parse_feed_xml, FeedFormat};
pub use processor::{process_feed, FeedFetcher};
pub use relevance::{analyze_relevance, extract_keywords, RELEVANCE_THRESHOLD};
pub use scheduler::IntakeScheduler;

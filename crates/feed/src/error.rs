// ABOUTME: Error types for feed intake operations.
// ABOUTME: Provides FeedError with Fetch, Parse, UnsupportedFormat, Io and Config variants.

use std::fmt;
use thiserror::Error;

/// Errors raised while fetching, parsing or bookkeeping feeds.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed could not be downloaded (network error or non-2xx status).
    #[error("failed to fetch feed: {0}")]
    Fetch(String),

    /// The body looked like a feed but could not be read.
    #[error("failed to parse feed: {0}")]
    Parse(String),

    /// Neither RSS nor Atom.
    #[error("Unsupported feed format")]
    UnsupportedFormat,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Intake configuration or dedup cache content is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FeedError {
    pub fn fetch(err: impl fmt::Display) -> Self {
        FeedError::Fetch(err.to_string())
    }

    pub fn parse(err: impl fmt::Display) -> Self {
        FeedError::Parse(err.to_string())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        FeedError::Config(msg.into())
    }
}

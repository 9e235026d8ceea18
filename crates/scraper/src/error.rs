// ABOUTME: Error types for the scraping pipeline including the ErrorCode taxonomy and ScrapeError struct.
// ABOUTME: ErrorCode values travel inside ScrapeResult records; ScrapeError is used between internal stages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error codes carried in `ScrapeResult.error.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    FetchFailed,
    UnsupportedContentType,
    Blocked,
    EmptyContent,
    UnhandledError,
    DbError,
}

impl ErrorCode {
    /// Wire representation, e.g. `FETCH_FAILED`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FetchFailed => "FETCH_FAILED",
            ErrorCode::UnsupportedContentType => "UNSUPPORTED_CONTENT_TYPE",
            ErrorCode::Blocked => "BLOCKED",
            ErrorCode::EmptyContent => "EMPTY_CONTENT",
            ErrorCode::UnhandledError => "UNHANDLED_ERROR",
            ErrorCode::DbError => "DB_ERROR",
        }
    }

    /// Parses a stored code. Unknown codes map to `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FETCH_FAILED" => Some(ErrorCode::FetchFailed),
            "UNSUPPORTED_CONTENT_TYPE" => Some(ErrorCode::UnsupportedContentType),
            "BLOCKED" => Some(ErrorCode::Blocked),
            "EMPTY_CONTENT" => Some(ErrorCode::EmptyContent),
            "UNHANDLED_ERROR" => Some(ErrorCode::UnhandledError),
            "DB_ERROR" => Some(ErrorCode::DbError),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by an internal pipeline stage.
///
/// Never crosses `Client::scrape`; the entry point folds it into a terminal
/// `ScrapeResult` carrying `code` and the rendered message.
#[derive(Debug, thiserror::Error)]
pub struct ScrapeError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.op, self.url, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ScrapeError {
    fn with_code(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create a FetchFailed error.
    pub fn fetch(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::FetchFailed, url, op, source)
    }

    /// Create an UnsupportedContentType error.
    pub fn unsupported_content_type(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::UnsupportedContentType, url, op, source)
    }

    /// Create an EmptyContent error.
    pub fn empty_content(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::EmptyContent, url, op, source)
    }

    /// Create a DbError.
    pub fn db(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::DbError, url, op, source)
    }

    /// Create an UnhandledError.
    pub fn unhandled(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::UnhandledError, url, op, source)
    }

    /// The message placed in `ScrapeResult.error.message`.
    ///
    /// Uses the underlying cause when present, the code otherwise.
    pub fn message(&self) -> String {
        match self.source {
            Some(ref src) => src.to_string(),
            None => self.code.to_string(),
        }
    }

    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::FetchFailed
    }

    pub fn is_unsupported_content_type(&self) -> bool {
        self.code == ErrorCode::UnsupportedContentType
    }

    pub fn is_empty_content(&self) -> bool {
        self.code == ErrorCode::EmptyContent
    }

    pub fn is_db(&self) -> bool {
        self.code == ErrorCode::DbError
    }
}

/// Errors raised by a persistence provider.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `upsert_result` was called without one of its required fields.
    #[error("missing required fields for upsert: {0}")]
    MissingFields(String),

    /// The backend answered with a non-success status.
    #[error("store request failed with HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport-level failure talking to the backend.
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend response could not be decoded.
    #[error("store response could not be decoded: {0}")]
    Decode(String),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Rejection of a manual edit submitted through `Client::save_edit`.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// The payload is unusable (missing url/text, mismatched id).
    #[error("{0}")]
    Invalid(String),

    /// The store refused the edit; carries `DB_ERROR`.
    #[error(transparent)]
    Store(ScrapeError),
}

impl EditError {
    pub fn is_invalid(&self) -> bool {
        matches!(self, EditError::Invalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::UnsupportedContentType).unwrap();
        assert_eq!(json, "\"UNSUPPORTED_CONTENT_TYPE\"");
        let back: ErrorCode = serde_json::from_str("\"EMPTY_CONTENT\"").unwrap();
        assert_eq!(back, ErrorCode::EmptyContent);
    }

    #[test]
    fn parse_matches_as_str() {
        for code in [
            ErrorCode::FetchFailed,
            ErrorCode::UnsupportedContentType,
            ErrorCode::Blocked,
            ErrorCode::EmptyContent,
            ErrorCode::UnhandledError,
            ErrorCode::DbError,
        ] {
            assert_eq!(ErrorCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(ErrorCode::parse("NOPE"), None);
    }

    #[test]
    fn message_prefers_source() {
        let err = ScrapeError::fetch(
            "https://example.com",
            "Fetch",
            Some(anyhow::anyhow!("HTTP status 503")),
        );
        assert!(err.is_fetch());
        assert_eq!(err.message(), "HTTP status 503");
        assert_eq!(
            err.to_string(),
            "Fetch https://example.com: FETCH_FAILED: HTTP status 503"
        );

        let bare = ScrapeError::empty_content("u", "Pdf", None);
        assert_eq!(bare.message(), "EMPTY_CONTENT");
    }
}

//! Capture error taxonomy
//!
//! Scrapers report failures as free text. [`classify_error`] folds that text
//! into a small fixed set of kinds; a scraper that already knows the kind can
//! attach it to the [`ScrapeError`] and skip text matching entirely.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Per-competitor failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    RateLimit,
    CircuitBreaker,
    Network,
    Permission,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RateLimit => "rate_limit",
            Self::CircuitBreaker => "circuit_breaker",
            Self::Network => "network",
            Self::Permission => "permission",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substring table checked in order; the first hit wins
const ERROR_PATTERNS: &[(&[&str], ErrorKind)] = &[
    (&["timeout", "timed out", "time out"], ErrorKind::Timeout),
    (&["rate limit", "throttle"], ErrorKind::RateLimit),
    (
        &["circuit breaker", "temporarily disabled"],
        ErrorKind::CircuitBreaker,
    ),
    (&["network", "connection", "dns"], ErrorKind::Network),
    (
        &["forbidden", "unauthorized", "blocked"],
        ErrorKind::Permission,
    ),
];

/// Maps a failure message to an [`ErrorKind`], case-insensitively
///
/// # Examples
///
/// ```
/// use sumi_snapshot::capture::{classify_error, ErrorKind};
///
/// assert_eq!(classify_error("Navigation Timed Out"), ErrorKind::Timeout);
/// assert_eq!(classify_error("Capture failed"), ErrorKind::Unknown);
/// ```
pub fn classify_error(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    ERROR_PATTERNS
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lower.contains(needle)))
        .map(|(_, kind)| *kind)
        .unwrap_or(ErrorKind::Unknown)
}

/// Error returned by a [`Scraper`](crate::capture::Scraper)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScrapeError {
    pub message: String,
    /// Structured kind, if the scraper knows it
    pub kind: Option<ErrorKind>,
    /// Set when the capture stopped because its batch was cancelled
    pub cancelled: bool,
}

impl ScrapeError {
    /// Creates an error whose kind will be derived from the message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
            cancelled: false,
        }
    }

    /// Creates an error with an explicit kind
    pub fn with_kind(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind: Some(kind),
            cancelled: false,
        }
    }

    /// The error a scraper returns when its cancellation token fires
    pub fn cancelled() -> Self {
        Self {
            message: "Capture cancelled".to_string(),
            kind: Some(ErrorKind::Timeout),
            cancelled: true,
        }
    }

    /// The structured kind if present, otherwise the classified message
    pub fn resolved_kind(&self) -> ErrorKind {
        self.kind.unwrap_or_else(|| classify_error(&self.message))
    }
}

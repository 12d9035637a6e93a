//! HTTP reference scraper
//!
//! This module captures competitor pages over plain HTTP, including:
//! - Building the HTTP client with the configured user agent
//! - Per-request timeouts taken from the website profile
//! - Retry logic for timeouts and server errors
//! - Mapping HTTP and network failures onto capture error kinds
//! - Persisting a snapshot record through a [`SnapshotStore`]
//!
//! Pages are fetched, not rendered: a profile that asks for JavaScript gets
//! the same request as one that does not.

use crate::capture::errors::{ErrorKind, ScrapeError};
use crate::capture::traits::{CaptureOptions, Competitor, Scraper, UserAgentHint};
use crate::config::UserAgentConfig;
use crate::storage::{NewSnapshot, SnapshotStore};
use crate::url::parse_website;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{redirect::Policy, Client, StatusCode};
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay between attempts when a capture is retried
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Result of a single fetch attempt
#[derive(Debug)]
pub enum FetchResult {
    /// The page was fetched
    Success {
        /// Final URL after redirects
        final_url: String,
        status_code: u16,
        content_type: Option<String>,
        body: String,
    },

    /// The server answered with a non-success status
    HttpError { status_code: u16 },

    /// The request never produced a response
    NetworkError { error: String, kind: ErrorKind },
}

impl FetchResult {
    /// Timeouts and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Success { .. } => false,
            Self::HttpError { status_code } => *status_code >= 500,
            Self::NetworkError { kind, .. } => *kind == ErrorKind::Timeout,
        }
    }

    /// Converts a failed fetch into the error handed back to the engine
    pub fn into_error(self) -> ScrapeError {
        match self {
            Self::Success { .. } => ScrapeError::new("Capture failed"),
            Self::HttpError { status_code } => http_error(status_code),
            Self::NetworkError { error, kind } => ScrapeError::with_kind(error, kind),
        }
    }
}

/// Builds an HTTP client identifying itself with `user_agent`
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once with the given timeout and user agent
pub async fn fetch_url(
    client: &Client,
    url: &str,
    user_agent: &str,
    timeout: Duration,
) -> FetchResult {
    let response = match client
        .get(url)
        .header(USER_AGENT, user_agent)
        .timeout(timeout)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return network_error(&e),
    };

    let status = response.status();
    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => network_error(&e),
    }
}

fn network_error(e: &reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timed out".to_string(),
            kind: ErrorKind::Timeout,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("Connection failed: {}", e),
            kind: ErrorKind::Network,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            kind: ErrorKind::Network,
        }
    }
}

/// Maps a non-success status to a capture error
fn http_error(status_code: u16) -> ScrapeError {
    let reason = StatusCode::from_u16(status_code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status");
    let message = format!("HTTP {} {}", status_code, reason);

    match status_code {
        401 | 403 => ScrapeError::with_kind(message, ErrorKind::Permission),
        429 => ScrapeError::with_kind(message, ErrorKind::RateLimit),
        _ => ScrapeError::new(message),
    }
}

/// Extracts the page title from an HTML document
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// SHA-256 of a page body, hex encoded
pub fn content_hash(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

/// Scraper that fetches pages with `reqwest` and stores them as snapshots
pub struct HttpScraper {
    client: Client,
    desktop_agent: String,
    mobile_agent: String,
    store: Arc<dyn SnapshotStore>,
    retry_delay: Duration,
}

impl HttpScraper {
    pub fn new(
        user_agent: &UserAgentConfig,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self, reqwest::Error> {
        let desktop_agent = user_agent.desktop();
        Ok(Self {
            client: build_http_client(&desktop_agent)?,
            mobile_agent: user_agent.mobile(),
            desktop_agent,
            store,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    fn user_agent(&self, hint: UserAgentHint) -> &str {
        match hint {
            UserAgentHint::Mobile => &self.mobile_agent,
            UserAgentHint::Desktop => &self.desktop_agent,
        }
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn capture(
        &self,
        competitor: &Competitor,
        options: &CaptureOptions,
        cancel: &CancellationToken,
    ) -> Result<String, ScrapeError> {
        let url = parse_website(&competitor.website)
            .map_err(|e| ScrapeError::with_kind(e.to_string(), ErrorKind::Unknown))?;
        let user_agent = self.user_agent(options.user_agent);
        let timeout = Duration::from_millis(options.timeout_ms);

        if options.enable_javascript {
            tracing::trace!("{} prefers JavaScript rendering; fetching raw HTML", url);
        }

        let attempts = options.retries + 1;
        let mut attempt = 0;
        let (final_url, status_code, content_type, body) = loop {
            attempt += 1;

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(ScrapeError::cancelled()),
                result = fetch_url(&self.client, url.as_str(), user_agent, timeout) => result,
            };

            match result {
                FetchResult::Success {
                    final_url,
                    status_code,
                    content_type,
                    body,
                } => break (final_url, status_code, content_type, body),
                failed if failed.is_retryable() && attempt < attempts => {
                    tracing::debug!(
                        "Attempt {}/{} for {} failed: {:?}, retrying",
                        attempt,
                        attempts,
                        url,
                        failed
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ScrapeError::cancelled()),
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
                failed => return Err(failed.into_error()),
            }
        };

        let snapshot = NewSnapshot {
            project_id: competitor.project_id.clone(),
            competitor_id: competitor.id.clone(),
            url: url.to_string(),
            final_url,
            status_code,
            content_type,
            title: extract_title(&body),
            content_hash: content_hash(&body),
            content_length: body.len(),
            user_agent: user_agent.to_string(),
            javascript_requested: options.enable_javascript,
        };

        self.store.save_snapshot(snapshot).await.map_err(|e| {
            ScrapeError::with_kind(format!("Failed to store snapshot: {}", e), ErrorKind::Unknown)
        })
    }
}

//! URL handling module for Sumi-Snapshot
//!
//! Competitor websites are entered by people, so they arrive both as full
//! URLs (`https://www.shopify.com/pricing`) and as bare hosts (`uber.com`).
//! This module turns either form into a parsed URL and a throttle/profile key.

mod domain;

pub use domain::extract_domain;

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a competitor website, assuming `https://` when no scheme is given
///
/// # Examples
///
/// ```
/// use sumi_snapshot::url::parse_website;
///
/// let url = parse_website("uber.com").unwrap();
/// assert_eq!(url.as_str(), "https://uber.com/");
///
/// let url = parse_website("http://example.com/about").unwrap();
/// assert_eq!(url.scheme(), "http");
/// ```
pub fn parse_website(website: &str) -> UrlResult<Url> {
    let trimmed = website.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty website".to_string()));
    }

    let url = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("https://{}", trimmed))
    }
    .map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain(trimmed.to_string()));
    }

    Ok(url)
}

/// Resolves the domain key for a competitor website
///
/// This is the key used by the domain throttle and the profile cache.
pub fn domain_of(website: &str) -> UrlResult<String> {
    let url = parse_website(website)?;
    extract_domain(&url).ok_or_else(|| UrlError::MissingDomain(website.to_string()))
}

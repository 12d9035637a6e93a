use url::Url;

/// Extracts the domain from a URL
///
/// The host is lowercased and a leading `www.` is dropped, so
/// `https://www.example.com` and `https://example.com` share one throttle
/// slot and one cached profile.
///
/// # Returns
///
/// * `Some(String)` - The lowercase domain
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_snapshot::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://www.example.com/").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => host,
        }
    })
}

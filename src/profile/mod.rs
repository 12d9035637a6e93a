//! Website complexity profiles
//!
//! Every competitor domain is classified once into a [`WebsiteType`] which
//! decides the capture timeout, retry budget, JavaScript requirement and
//! device hint handed to the scraper. Profiles are cached by domain for the
//! life of the process.

pub mod rules;

use crate::url::parse_website;
use crate::url::extract_domain;
use rules::{match_rules, settings_for, ProfileSettings, SEED_DOMAINS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Website complexity classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebsiteType {
    Basic,
    Ecommerce,
    Saas,
    Marketplace,
    Spa,
    Complex,
}

impl WebsiteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Ecommerce => "ecommerce",
            Self::Saas => "saas",
            Self::Marketplace => "marketplace",
            Self::Spa => "spa",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for WebsiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capture profile resolved for a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebsiteComplexityProfile {
    pub domain: String,
    #[serde(rename = "type")]
    pub website_type: WebsiteType,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub requires_javascript: bool,
    pub mobile_friendly: bool,
    pub expected_load_time_ms: u64,
}

impl WebsiteComplexityProfile {
    fn from_settings(domain: String, settings: ProfileSettings) -> Self {
        Self {
            domain,
            website_type: settings.website_type,
            timeout_ms: settings.timeout_ms,
            retry_attempts: settings.retry_attempts,
            requires_javascript: settings.requires_javascript,
            mobile_friendly: settings.mobile_friendly,
            expected_load_time_ms: settings.expected_load_time_ms,
        }
    }
}

/// Classifies URLs into complexity profiles, caching the result per domain
pub struct WebsiteProfileClassifier {
    cache: Mutex<HashMap<String, WebsiteComplexityProfile>>,
}

impl WebsiteProfileClassifier {
    /// Creates a classifier whose cache is pre-populated with well-known domains
    pub fn new() -> Self {
        let cache = SEED_DOMAINS
            .iter()
            .map(|(domain, website_type)| {
                (
                    domain.to_string(),
                    WebsiteComplexityProfile::from_settings(
                        domain.to_string(),
                        settings_for(*website_type),
                    ),
                )
            })
            .collect();

        Self {
            cache: Mutex::new(cache),
        }
    }

    /// Creates a classifier with an empty cache
    pub fn empty() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the profile for a URL or bare host
    ///
    /// A cached profile for the URL's domain is returned as-is; otherwise the
    /// full lowercased URL runs through the rule table and the result is
    /// cached under the domain, so every later URL on that domain gets the
    /// same profile.
    pub fn classify(&self, url: &str) -> WebsiteComplexityProfile {
        let url_lower = url.trim().to_lowercase();
        let domain = parse_website(&url_lower)
            .ok()
            .and_then(|parsed| extract_domain(&parsed))
            .unwrap_or_else(|| url_lower.clone());

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(profile) = cache.get(&domain) {
            return profile.clone();
        }

        let profile = WebsiteComplexityProfile::from_settings(domain.clone(), match_rules(&url_lower));
        tracing::debug!(
            "Classified {} as {} (timeout {}ms, {} retries)",
            domain,
            profile.website_type,
            profile.timeout_ms,
            profile.retry_attempts
        );
        cache.insert(domain, profile.clone());
        profile
    }

    /// Returns the cached profile for a domain without classifying
    pub fn cached(&self, domain: &str) -> Option<WebsiteComplexityProfile> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(domain).cloned()
    }

    /// Number of domains with a cached profile
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WebsiteProfileClassifier {
    fn default() -> Self {
        Self::new()
    }
}

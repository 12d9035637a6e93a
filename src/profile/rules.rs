//! Keyword rule table for website classification
//!
//! Rules are checked top to bottom against the lowercased URL and the first
//! rule with a matching keyword wins, so a URL mentioning both `platform` and
//! `shop` is a marketplace. Keep the order.

use super::WebsiteType;

/// Capture settings attached to a website type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileSettings {
    pub website_type: WebsiteType,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub requires_javascript: bool,
    pub mobile_friendly: bool,
    pub expected_load_time_ms: u64,
}

/// One row of the classification table
#[derive(Debug, Clone, Copy)]
pub struct ProfileRule {
    pub keywords: &'static [&'static str],
    pub settings: ProfileSettings,
}

impl ProfileRule {
    /// Returns true if any keyword occurs in the lowercased URL
    pub fn matches(&self, url_lower: &str) -> bool {
        self.keywords.iter().any(|keyword| url_lower.contains(keyword))
    }
}

const MARKETPLACE: ProfileSettings = ProfileSettings {
    website_type: WebsiteType::Marketplace,
    timeout_ms: 30_000,
    retry_attempts: 2,
    requires_javascript: true,
    mobile_friendly: true,
    expected_load_time_ms: 8_000,
};

const SAAS: ProfileSettings = ProfileSettings {
    website_type: WebsiteType::Saas,
    timeout_ms: 25_000,
    retry_attempts: 2,
    requires_javascript: true,
    mobile_friendly: false,
    expected_load_time_ms: 6_000,
};

const ECOMMERCE: ProfileSettings = ProfileSettings {
    website_type: WebsiteType::Ecommerce,
    timeout_ms: 20_000,
    retry_attempts: 2,
    requires_javascript: true,
    mobile_friendly: true,
    expected_load_time_ms: 5_000,
};

const SPA: ProfileSettings = ProfileSettings {
    website_type: WebsiteType::Spa,
    timeout_ms: 25_000,
    retry_attempts: 3,
    requires_javascript: true,
    mobile_friendly: true,
    expected_load_time_ms: 6_000,
};

const BASIC: ProfileSettings = ProfileSettings {
    website_type: WebsiteType::Basic,
    timeout_ms: 15_000,
    retry_attempts: 1,
    requires_javascript: false,
    mobile_friendly: true,
    expected_load_time_ms: 2_000,
};

/// Settings used when no rule matches
pub const DEFAULT_SETTINGS: ProfileSettings = ProfileSettings {
    website_type: WebsiteType::Complex,
    timeout_ms: 20_000,
    retry_attempts: 2,
    requires_javascript: true,
    mobile_friendly: true,
    expected_load_time_ms: 5_000,
};

/// Ordered classification rules
pub const PROFILE_RULES: &[ProfileRule] = &[
    ProfileRule {
        keywords: &[
            "marketplace",
            "freelance",
            "uber",
            "airbnb",
            "upwork",
            "gig",
            "platform",
        ],
        settings: MARKETPLACE,
    },
    ProfileRule {
        keywords: &["saas", "crm", "app.", "dashboard", "platform", "software"],
        settings: SAAS,
    },
    ProfileRule {
        keywords: &["shop", "store", "ecommerce", "buy", "cart", "commerce"],
        settings: ECOMMERCE,
    },
    ProfileRule {
        keywords: &["app", "web-app", "react", "angular", "vue"],
        settings: SPA,
    },
    ProfileRule {
        keywords: &["blog", "news", "info", "about", "simple"],
        settings: BASIC,
    },
];

/// Well-known domains loaded into the profile cache at startup
pub const SEED_DOMAINS: &[(&str, WebsiteType)] = &[
    ("amazon.com", WebsiteType::Ecommerce),
    ("shopify.com", WebsiteType::Ecommerce),
    ("walmart.com", WebsiteType::Ecommerce),
    ("ebay.com", WebsiteType::Marketplace),
    ("etsy.com", WebsiteType::Marketplace),
    ("airbnb.com", WebsiteType::Marketplace),
    ("uber.com", WebsiteType::Marketplace),
    ("upwork.com", WebsiteType::Marketplace),
    ("fiverr.com", WebsiteType::Marketplace),
    ("salesforce.com", WebsiteType::Saas),
    ("hubspot.com", WebsiteType::Saas),
    ("slack.com", WebsiteType::Saas),
    ("notion.so", WebsiteType::Saas),
    ("medium.com", WebsiteType::Basic),
    ("wikipedia.org", WebsiteType::Basic),
];

/// Returns the capture settings for a website type
pub fn settings_for(website_type: WebsiteType) -> ProfileSettings {
    match website_type {
        WebsiteType::Marketplace => MARKETPLACE,
        WebsiteType::Saas => SAAS,
        WebsiteType::Ecommerce => ECOMMERCE,
        WebsiteType::Spa => SPA,
        WebsiteType::Basic => BASIC,
        WebsiteType::Complex => DEFAULT_SETTINGS,
    }
}

/// Runs the rule table over a lowercased URL
pub fn match_rules(url_lower: &str) -> ProfileSettings {
    PROFILE_RULES
        .iter()
        .find(|rule| rule.matches(url_lower))
        .map(|rule| rule.settings)
        .unwrap_or(DEFAULT_SETTINGS)
}

//! Sumi-Snapshot: a polite competitor snapshot engine
//!
//! This crate captures point-in-time snapshots of competitor websites for many
//! projects at once, under a global and per-project concurrency ceiling, a
//! per-domain request interval, a daily capture quota and an error-rate
//! circuit breaker.

pub mod capture;
pub mod config;
pub mod output;
pub mod profile;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing domain in URL: {0}")]
    MissingDomain(String),
}

/// Result type alias for Sumi-Snapshot operations
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use capture::{
    CaptureOrchestrator, CaptureRequestOptions, ErrorKind, OptimizedSnapshotResult, SystemStatus,
};
pub use config::{CaptureConfig, Config};
pub use profile::{WebsiteComplexityProfile, WebsiteProfileClassifier, WebsiteType};
pub use url::extract_domain;

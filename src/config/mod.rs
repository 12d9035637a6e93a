//! Configuration module for Sumi-Snapshot
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_snapshot::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("snapshot.toml")).unwrap();
//! println!("Global capture limit: {}", config.capture.max_global_concurrent);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CaptureConfig, CaptureConfigPatch, CompetitorEntry, Config, ProjectEntry, StorageConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::{validate, validate_capture_config};

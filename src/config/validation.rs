use crate::config::types::{CaptureConfig, Config, ProjectEntry, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_capture_config(&config.capture)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_projects(&config.projects)?;
    Ok(())
}

/// Validates the capture limits
///
/// Every limit must be positive and a single project may never be allowed
/// more in-flight captures than the whole process.
pub fn validate_capture_config(config: &CaptureConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_per_project < 1 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_per_project must be >= 1, got {}",
            config.max_concurrent_per_project
        )));
    }

    if config.max_global_concurrent < 1 {
        return Err(ConfigError::Validation(format!(
            "max_global_concurrent must be >= 1, got {}",
            config.max_global_concurrent
        )));
    }

    if config.max_concurrent_per_project > config.max_global_concurrent {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_per_project ({}) cannot exceed max_global_concurrent ({})",
            config.max_concurrent_per_project, config.max_global_concurrent
        )));
    }

    if config.per_domain_throttle_ms == 0 {
        return Err(ConfigError::Validation(
            "per_domain_throttle_ms must be > 0".to_string(),
        ));
    }

    if config.daily_snapshot_limit == 0 {
        return Err(ConfigError::Validation(
            "daily_snapshot_limit must be > 0".to_string(),
        ));
    }

    let threshold = config.circuit_breaker_error_threshold;
    if !threshold.is_finite() || threshold <= 0.0 || threshold > 1.0 {
        return Err(ConfigError::Validation(format!(
            "circuit_breaker_error_threshold must be in (0, 1], got {}",
            threshold
        )));
    }

    if config.circuit_breaker_window_ms == 0 {
        return Err(ConfigError::Validation(
            "circuit_breaker_window_ms must be > 0".to_string(),
        ));
    }

    if config.max_total_capture_time_ms == 0 {
        return Err(ConfigError::Validation(
            "max_total_capture_time_ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    if !config.contact_email.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            config.contact_email
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &crate::config::types::StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates project entries: unique ids, and every competitor has a website
/// that resolves to a domain
fn validate_projects(projects: &[ProjectEntry]) -> Result<(), ConfigError> {
    let mut project_ids = HashSet::new();

    for project in projects {
        if project.id.is_empty() {
            return Err(ConfigError::Validation(
                "project id cannot be empty".to_string(),
            ));
        }

        if !project_ids.insert(project.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate project id '{}'",
                project.id
            )));
        }

        let mut competitor_ids = HashSet::new();
        for competitor in &project.competitors {
            if !competitor_ids.insert(competitor.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate competitor id '{}' in project '{}'",
                    competitor.id, project.id
                )));
            }

            crate::url::parse_website(&competitor.website).map_err(|e| {
                ConfigError::InvalidUrl(format!(
                    "competitor '{}' has an invalid website: {}",
                    competitor.id, e
                ))
            })?;
        }
    }

    Ok(())
}

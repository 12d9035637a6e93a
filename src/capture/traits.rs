//! Collaborator traits consumed by the capture engine
//!
//! The engine never fetches pages, loads projects or pushes progress itself.
//! It talks to a [`Scraper`], a [`ProjectRepository`] and a [`ProgressSink`].

use crate::capture::errors::ScrapeError;
use crate::config::ProjectEntry;
use crate::profile::WebsiteComplexityProfile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// A competitor website tracked by a project
///
/// Competitor ids are only unique within their project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    pub project_id: String,
    pub id: String,
    pub name: String,
    pub website: String,
}

/// A project with the competitors it tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub competitors: Vec<Competitor>,
}

impl From<&ProjectEntry> for Project {
    fn from(entry: &ProjectEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            competitors: entry
                .competitors
                .iter()
                .map(|c| Competitor {
                    project_id: entry.id.clone(),
                    id: c.id.clone(),
                    name: c.name.clone(),
                    website: c.website.clone(),
                })
                .collect(),
        }
    }
}

/// Device class the scraper should present as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAgentHint {
    Mobile,
    Desktop,
}

/// Per-capture settings handed to the scraper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    pub timeout_ms: u64,
    pub retries: u32,
    pub enable_javascript: bool,
    pub user_agent: UserAgentHint,
}

impl CaptureOptions {
    pub fn from_profile(profile: &WebsiteComplexityProfile) -> Self {
        Self {
            timeout_ms: profile.timeout_ms,
            retries: profile.retry_attempts,
            enable_javascript: profile.requires_javascript,
            user_agent: if profile.mobile_friendly {
                UserAgentHint::Mobile
            } else {
                UserAgentHint::Desktop
            },
        }
    }
}

/// Captures a snapshot of one competitor website
///
/// Implementations should stop promptly once `cancel` fires and return
/// [`ScrapeError::cancelled`]; the engine also drops the future when a batch
/// runs out of time.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the id of the stored snapshot
    async fn capture(
        &self,
        competitor: &Competitor,
        options: &CaptureOptions,
        cancel: &CancellationToken,
    ) -> Result<String, ScrapeError>;
}

/// Looks up projects and their competitors
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn get_project_with_competitors(&self, project_id: &str)
        -> crate::Result<Option<Project>>;
}

/// Receives per-competitor progress, fire and forget
pub trait ProgressSink: Send + Sync {
    fn notify(&self, project_id: &str, index: usize, total: usize, competitor_name: &str);
}

/// Progress sink that writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn notify(&self, project_id: &str, index: usize, total: usize, competitor_name: &str) {
        tracing::info!(
            "[{}] Capturing {}/{}: {}",
            project_id,
            index + 1,
            total,
            competitor_name
        );
    }
}

/// Project repository backed by a fixed set of projects
#[derive(Debug, Default, Clone)]
pub struct InMemoryProjectRepository {
    projects: HashMap<String, Project>,
}

impl InMemoryProjectRepository {
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        Self {
            projects: projects.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn from_entries(entries: &[ProjectEntry]) -> Self {
        Self::new(entries.iter().map(Project::from))
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn get_project_with_competitors(
        &self,
        project_id: &str,
    ) -> crate::Result<Option<Project>> {
        Ok(self.projects.get(project_id).cloned())
    }
}

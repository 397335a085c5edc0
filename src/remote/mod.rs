//! Remote collaborators: git hosting, npm registry and Jenkins
//!
//! Each concern sits behind an `async_trait` trait so the checker can be
//! exercised without a network.
//!
//! - [`git`]: fetches a raw package.json from a git host
//! - [`npm`]: fetches a package document from an npm registry
//! - [`jenkins`]: triggers a Jenkins build
//! - [`error`]: [`FetchError`] shared by all clients

pub mod error;
pub mod git;
pub mod jenkins;
pub mod npm;

use std::collections::HashMap;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use chrono::{DateTime, Local};

use crate::config::{APP_NAME, FETCH_TIMEOUT_MS, PUBLISH_TIME_FORMAT};

pub use error::FetchError;
pub use git::GitClient;
pub use jenkins::JenkinsClient;
pub use npm::NpmRegistry;

/// The parts of a package.json the checker needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitManifest {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    /// Full registry document URL for this package
    pub registry_url: String,
}

/// Registry document of one package
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryDocument {
    pub name: String,
    /// dist-tag -> version
    pub dist_tags: HashMap<String, String>,
    /// version (plus `created`/`modified`) -> RFC 3339 timestamp
    pub time: HashMap<String, String>,
}

/// Version currently published under a dist-tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    /// Local time, formatted for display
    pub published_at: Option<String>,
}

impl RegistryDocument {
    pub fn release(&self, tag: &str) -> Option<Release> {
        let version = self.dist_tags.get(tag).filter(|v| !v.is_empty())?;
        Some(Release {
            version: version.clone(),
            published_at: self.time.get(version).and_then(|t| format_time(t)),
        })
    }
}

fn format_time(timestamp: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|t| t.with_timezone(&Local).format(PUBLISH_TIME_FORMAT).to_string())
}

/// Fetches package.json files from a git host
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait GitSource: Send + Sync {
    async fn fetch_manifest(&self, url: &str) -> Result<GitManifest, FetchError>;
}

/// Fetches package documents from an npm registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RegistrySource: Send + Sync {
    async fn fetch_document(&self, url: &str) -> Result<RegistryDocument, FetchError>;
}

/// Triggers Jenkins builds
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait JenkinsTrigger: Send + Sync {
    async fn trigger(&self, url: &str, cookie: Option<String>) -> Result<(), FetchError>;
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(APP_NAME)
        .timeout(Duration::from_millis(FETCH_TIMEOUT_MS))
        .build()
        .expect("Failed to create HTTP client")
}

//! Release-drift checking
//!
//! # Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │    Config    │────▶│   Select     │────▶│   Checker    │
//! │ (packages)   │     │ (URLs/tag)   │     │ (fetch, cmp) │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                                                  │
//!                                                  ▼
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │   Jenkins    │◀────│   Report     │
//!                      │  (trigger)   │     │ (classify)   │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! - [`runner`]: [`Checker`] fetching versions and triggering builds
//! - [`report`]: classification and text rendering of results

pub mod report;
pub mod runner;

use thiserror::Error;

use crate::config::CheckConfig;
use crate::remote::FetchError;
use crate::template::{resolve_git_url, resolve_jenkins_url};
use crate::version::{CompareOutcome, VersionFormatError};

pub use report::{Classification, Status, classify, render_check_report, render_trigger_report};
pub use runner::Checker;

/// Per-package failure; never aborts the other packages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("No usable git URL configured")]
    MissingGitUrl,

    #[error("Failed to fetch git package.json: {0}")]
    Git(FetchError),

    #[error("Failed to fetch npm registry info: {0}")]
    Registry(FetchError),

    #[error("Tag '{tag}' is not published to the registry")]
    TagNotPublished { tag: String },

    #[error(transparent)]
    Version(#[from] VersionFormatError),

    #[error("No usable Jenkins URL configured")]
    MissingJenkinsUrl,

    #[error("Failed to trigger Jenkins: {0}")]
    Jenkins(FetchError),
}

impl CheckError {
    /// URL of the failed request, if the failure came from one
    pub fn url(&self) -> Option<&str> {
        match self {
            CheckError::Git(e) | CheckError::Registry(e) | CheckError::Jenkins(e) => Some(e.url()),
            _ => None,
        }
    }
}

/// One package/tag pair and everything learnt about it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageItem {
    pub name: String,
    pub tag: String,
    pub git_url: Option<String>,
    pub jenkins_url: Option<String>,
    /// Cookie for this Jenkins job only; `Some("")` sends no cookie at all
    pub jenkins_cookie: Option<String>,
    pub registry_url: Option<String>,
    /// Version found in the git package.json
    pub git_version: Option<String>,
    /// Version published under `tag`
    pub publish_version: Option<String>,
    pub publish_time: Option<String>,
    /// git version > published version
    pub can_update: Option<CompareOutcome>,
    /// git version < published version
    pub anomaly: Option<CompareOutcome>,
    pub error: Option<CheckError>,
    /// `None` until a trigger was attempted
    pub trigger: Option<Result<(), CheckError>>,
}

impl PackageItem {
    pub fn new(name: &str, tag: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    /// `name [tag]`
    pub fn label(&self) -> String {
        format!("{} [{}]", self.name, self.tag)
    }
}

/// Build the items to check: every configured package × requested tag.
///
/// `tags` overrides the config's `checkTags` when given and non-empty.
/// Packages without an entry for a tag are skipped; order follows the config.
pub fn select_packages(config: &CheckConfig, tags: Option<&[String]>) -> Vec<PackageItem> {
    let tags = tags
        .filter(|tags| !tags.is_empty())
        .unwrap_or(&config.check_tags);

    let mut items = Vec::new();
    for (name, tag_configs) in &config.package {
        for tag in tags {
            let Some(entry) = tag_configs.get(tag) else {
                continue;
            };
            items.push(PackageItem {
                git_url: resolve_git_url(&config.git, entry.git.as_ref()),
                jenkins_url: resolve_jenkins_url(config.jenkins.as_ref(), entry.jenkins.as_ref()),
                jenkins_cookie: entry.jenkins.as_ref().and_then(|j| j.cookie.clone()),
                ..PackageItem::new(name, tag)
            });
        }
    }
    items
}

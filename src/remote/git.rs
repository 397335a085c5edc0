//! Raw package.json fetching from a git host

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{DEFAULT_NPM_REGISTRY, GitConfig};
use crate::remote::error::FetchError;
use crate::remote::{GitManifest, GitSource, http_client};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    name: String,
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    publish_config: Option<PublishConfig>,
}

#[derive(Debug, Deserialize)]
struct PublishConfig {
    #[serde(default)]
    registry: Option<String>,
}

/// Git client sending the global git cookie with every request
pub struct GitClient {
    client: reqwest::Client,
    cookie: Option<String>,
    login_marker: String,
}

impl GitClient {
    pub fn new(cookie: Option<String>, login_marker: &str) -> Self {
        Self {
            client: http_client(),
            cookie: cookie.filter(|c| !c.is_empty()),
            login_marker: login_marker.to_string(),
        }
    }

    pub fn from_config(config: &GitConfig) -> Self {
        Self::new(config.cookie.clone(), config.login_marker())
    }
}

/// Encode package name for URL (handles scoped packages)
pub(crate) fn encode_package_name(package_name: &str) -> String {
    if package_name.starts_with('@') {
        // Scoped package: @scope/name -> @scope%2Fname
        package_name.replace('/', "%2F")
    } else {
        package_name.to_string()
    }
}

/// Registry document URL for a package published to `registry`
pub(crate) fn registry_url(registry: Option<&str>, package_name: &str) -> String {
    let registry = registry
        .map(|r| r.trim_end_matches('/'))
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_NPM_REGISTRY);
    format!("{}/{}", registry, encode_package_name(package_name))
}

#[async_trait::async_trait]
impl GitSource for GitClient {
    async fn fetch_manifest(&self, url: &str) -> Result<GitManifest, FetchError> {
        let mut request = self.client.get(url);
        if let Some(cookie) = &self.cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("git host returned status {}: {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Hosts answer unauthenticated raw requests with a redirect to their login page
        if response.url().as_str().contains(&self.login_marker) {
            debug!("git request redirected to login page: {}", response.url());
            return Err(FetchError::LoginRequired {
                url: url.to_string(),
            });
        }

        let package: PackageJson = response.json().await.map_err(|e| {
            warn!("Failed to parse package.json from {}: {}", url, e);
            FetchError::invalid_response(url, e)
        })?;

        let registry = package
            .publish_config
            .as_ref()
            .and_then(|c| c.registry.as_deref());
        Ok(GitManifest {
            registry_url: registry_url(registry, &package.name),
            name: package.name,
            version: package.version,
            description: package.description,
        })
    }
}

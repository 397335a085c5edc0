//! npm registry API implementation

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::remote::error::FetchError;
use crate::remote::{RegistryDocument, RegistrySource, http_client};

/// Response from npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(default)]
    name: String,
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    time: HashMap<String, String>,
}

/// Registry implementation for npm registry API
pub struct NpmRegistry {
    client: reqwest::Client,
}

impl NpmRegistry {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RegistrySource for NpmRegistry {
    async fn fetch_document(&self, url: &str) -> Result<RegistryDocument, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let package_info: NpmPackageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            FetchError::invalid_response(url, e)
        })?;

        Ok(RegistryDocument {
            name: package_info.name,
            dist_tags: package_info.dist_tags,
            time: package_info.time,
        })
    }
}

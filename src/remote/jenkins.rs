//! Jenkins build triggering

use reqwest::StatusCode;
use tracing::{info, warn};

use crate::remote::error::FetchError;
use crate::remote::{JenkinsTrigger, http_client};

/// Header Jenkins uses to report the authenticated user
const AUTHENTICATED_AS_HEADER: &str = "x-you-are-authenticated-as";

pub struct JenkinsClient {
    client: reqwest::Client,
}

impl JenkinsClient {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for JenkinsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JenkinsTrigger for JenkinsClient {
    async fn trigger(&self, url: &str, cookie: Option<String>) -> Result<(), FetchError> {
        let mut request = self.client.get(url);
        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if status.is_success() {
            info!("Triggered Jenkins build: {}", url);
            return Ok(());
        }

        warn!("Jenkins returned status {}: {}", status, url);
        let anonymous = response
            .headers()
            .get(AUTHENTICATED_AS_HEADER)
            .and_then(|v| v.to_str().ok())
            == Some("anonymous");

        Err(match status {
            StatusCode::FORBIDDEN if anonymous => FetchError::LoginRequired {
                url: url.to_string(),
            },
            StatusCode::METHOD_NOT_ALLOWED => FetchError::TokenMismatch {
                url: url.to_string(),
            },
            _ => FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            },
        })
    }
}

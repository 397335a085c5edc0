use thiserror::Error;

/// Failure of a request to git, the npm registry or Jenkins
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error: {message} (URL: {url})")]
    Network { url: String, message: String },

    #[error("Unexpected status {status} (URL: {url})")]
    Status { url: String, status: u16 },

    #[error("Authentication required, check the cookie configuration (URL: {url})")]
    LoginRequired { url: String },

    #[error("Jenkins token mismatch, check the token configuration (URL: {url})")]
    TokenMismatch { url: String },

    #[error("Invalid response: {message} (URL: {url})")]
    InvalidResponse { url: String, message: String },
}

impl FetchError {
    pub fn network(url: &str, error: reqwest::Error) -> Self {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }

    pub fn invalid_response(url: &str, message: impl ToString) -> Self {
        FetchError::InvalidResponse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// URL of the failed request
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::LoginRequired { url }
            | FetchError::TokenMismatch { url }
            | FetchError::InvalidResponse { url, .. } => url,
        }
    }
}

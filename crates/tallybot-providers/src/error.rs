//! Provider error type.

use thiserror::Error;

/// Failures talking to an LLM backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// No API key configured.
    #[error("API key not configured for {0}")]
    ApiKeyMissing(String),

    /// The configured backend name isn't one we know.
    #[error("Unknown provider '{0}' (expected \"gemini\" or \"openai\")")]
    UnknownProvider(String),

    /// The HTTP request could not be sent or was rejected as malformed.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 => Self::AuthenticationFailed(body.to_string()),
            403 => Self::AuthenticationFailed(format!("Forbidden: {}", body)),
            429 => Self::RateLimited(body.to_string()),
            400 | 404 | 422 => Self::RequestFailed(format!("Status {}: {}", status, body)),
            500..=599 => Self::ServerError(format!("Status {}: {}", status, body)),
            _ => Self::Unknown(format!("Status {}: {}", status, body)),
        }
    }

    /// Whether a retry might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Timeout | Self::ServerError(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::ParseError(e.to_string())
        } else {
            Self::RequestFailed(e.to_string())
        }
    }
}

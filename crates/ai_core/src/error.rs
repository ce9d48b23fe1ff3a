//! AI service errors

use domain::ErrorKind;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while requesting a completion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiServiceError {
    /// Caller passed an unusable request (e.g. no messages)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No credential is available for the selected backend
    #[error("{service} is not configured. Please set your API key.")]
    NotConfigured { service: String },

    /// Backend rejected the credential
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// Backend throttled the request
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Backend reported a server-side failure
    #[error("Server error: {0}")]
    ServerUnavailable(String),

    /// Transport failure or unexpected HTTP status
    #[error("Network error: {0}")]
    NetworkUnavailable(String),

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    MalformedResponse(String),

    /// Request exceeded the configured deadline
    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

impl AiServiceError {
    /// Create a not-configured error for a backend display name
    pub fn not_configured(service: impl Into<String>) -> Self {
        Self::NotConfigured {
            service: service.into(),
        }
    }

    /// Structured classification used by the orchestrator
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotConfigured { .. } | Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::ServerUnavailable(_) => ErrorKind::ServerUnavailable,
            Self::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Map a reqwest failure, using the deadline that was in force
    pub fn from_transport(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_ms)
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::NetworkUnavailable(err.to_string())
        }
    }

    /// Classify a non-success HTTP status
    ///
    /// The backend's own error message is preferred when the body carries one
    /// in the usual `{"error": {"message": ...}}` or `{"error": "..."}` shape.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 | 403 => Self::Unauthenticated(message.unwrap_or_else(|| "Invalid API key".into())),
            429 => Self::RateLimited(
                message.unwrap_or_else(|| "Please wait a moment and try again".into()),
            ),
            // Includes Anthropic's 529 "overloaded"
            500..=599 => Self::ServerUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message.unwrap_or_else(|| "server error".into())
            )),
            _ => Self::NetworkUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                message.unwrap_or_else(|| status.canonical_reason().unwrap_or("error").into())
            )),
        }
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("error"))
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

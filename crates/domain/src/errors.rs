//! Error classification shared across layers
//!
//! Adapters attach one of these to every failure they report so the
//! orchestrator can react (and phrase spoken errors) without inspecting
//! message text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured classification of a failed conversation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-supplied empty or malformed input, caught before any I/O
    InvalidInput,
    /// Missing or rejected credential
    Unauthenticated,
    /// Backend throttled the request
    RateLimited,
    /// Backend reported a server-side failure
    ServerUnavailable,
    /// Transport-level failure
    NetworkUnavailable,
    /// Response could not be decoded into the expected shape
    MalformedResponse,
    /// A collaborator exceeded its deadline
    Timeout,
    /// Speech capture failed or heard nothing
    CaptureError,
    /// Microphone or recognition access was refused
    PermissionDenied,
    /// Speech synthesis or playback failed
    SynthesisError,
}

impl ErrorKind {
    /// Whether the failure is likely to go away by simply trying again
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerUnavailable | Self::NetworkUnavailable | Self::Timeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidInput => "invalid_input",
            Self::Unauthenticated => "unauthenticated",
            Self::RateLimited => "rate_limited",
            Self::ServerUnavailable => "server_unavailable",
            Self::NetworkUnavailable => "network_unavailable",
            Self::MalformedResponse => "malformed_response",
            Self::Timeout => "timeout",
            Self::CaptureError => "capture_error",
            Self::PermissionDenied => "permission_denied",
            Self::SynthesisError => "synthesis_error",
        };
        f.write_str(name)
    }
}

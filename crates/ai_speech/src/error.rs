//! Speech processing errors

use domain::ErrorKind;
use thiserror::Error;

/// Errors that can occur during speech capture or synthesis
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    /// Empty or otherwise unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Microphone or recognition access refused
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Session ended without recognizable speech
    #[error("No speech detected")]
    NoSpeechDetected,

    /// Capture device or recognizer failure
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Synthesis or playback failure
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Engine or player binary is missing
    #[error("Not available: {0}")]
    NotAvailable(String),

    /// Remote speech service is not ready
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Transport failure talking to a remote speech service
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Timeout during processing
    #[error("Speech processing timeout after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SpeechError {
    /// Structured classification used by the orchestrator
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::NoSpeechDetected | Self::CaptureFailed(_) => ErrorKind::CaptureError,
            Self::SynthesisFailed(_) | Self::NotAvailable(_) | Self::Configuration(_) => {
                ErrorKind::SynthesisError
            },
            Self::ServiceUnavailable(_) => ErrorKind::ServerUnavailable,
            Self::Network(_) => ErrorKind::NetworkUnavailable,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Whether this error comes from the capture side
    pub const fn is_capture_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::NoSpeechDetected | Self::CaptureFailed(_)
        )
    }
}

//! Application-level errors

use ai_core::{AiServiceError, CredentialError};
use ai_speech::SpeechError;
use domain::ErrorKind;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// AI service error
    #[error(transparent)]
    Ai(#[from] AiServiceError),

    /// Speech capture or synthesis error
    #[error(transparent)]
    Speech(#[from] SpeechError),

    /// Credential could not be stored
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The orchestrator task has shut down
    #[error("Conversation orchestrator is not running")]
    OrchestratorStopped,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Structured classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ai(e) => e.kind(),
            Self::Speech(e) => e.kind(),
            Self::Credential(CredentialError::EmptyKey) | Self::Configuration(_) => {
                ErrorKind::InvalidInput
            },
            Self::Credential(_) | Self::OrchestratorStopped => ErrorKind::ServerUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_forwarded_from_collaborators() {
        let err = ApplicationError::from(AiServiceError::RateLimited("slow down".into()));
        assert_eq!(err.kind(), ErrorKind::RateLimited);

        let err = ApplicationError::from(SpeechError::PermissionDenied("mic".into()));
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn empty_key_is_invalid_input() {
        let err = ApplicationError::from(CredentialError::EmptyKey);
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn transparent_messages_are_kept() {
        let err = ApplicationError::from(AiServiceError::not_configured("OpenAI"));
        assert_eq!(
            err.to_string(),
            "OpenAI is not configured. Please set your API key."
        );
    }
}

//! Conversation events published by the orchestrator

use std::fmt;

use domain::{ConversationState, ErrorKind};
use serde::Serialize;

/// A failure surfaced to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationError {
    /// Structured classification
    pub kind: ErrorKind,
    /// Message from the failing collaborator
    pub message: String,
}

impl ConversationError {
    /// Create a new error event payload
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

/// Everything an observer (UI, logger, test) can learn about a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// The state machine moved; never emitted for self-transitions
    StateChanged(ConversationState),
    /// Capture produced the user's utterance
    UserSpeechRecognized(String),
    /// Unfiltered reply from the AI service
    ResponseReceived(String),
    /// Reply as handed to the synthesizer
    ResponseSpeaking(String),
    /// A stage failed; the state is `Error`
    Error(ConversationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_kind() {
        let err = ConversationError::new(ErrorKind::Timeout, "Request timed out after 30000ms");
        assert_eq!(err.to_string(), "Request timed out after 30000ms (timeout)");
    }
}

//! Conversation orchestrator state

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a conversation cycle
///
/// The happy path is `Idle → Listening → Processing → Speaking → Idle`.
/// `Error` can be entered from any non-idle state and always leads back to
/// `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    /// Waiting for a trigger
    #[default]
    Idle,
    /// Capturing user speech
    Listening,
    /// Waiting for the AI backend
    Processing,
    /// Playing back the reply
    Speaking,
    /// A stage failed; returns to idle after a delay
    Error,
}

impl ConversationState {
    /// Whether a cycle is currently in progress
    pub const fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Listening => write!(f, "listening"),
            Self::Processing => write!(f, "processing"),
            Self::Speaking => write!(f, "speaking"),
            Self::Error => write!(f, "error"),
        }
    }
}

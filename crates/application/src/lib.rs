//! Application layer - Conversation orchestration
//!
//! Drives one spoken exchange at a time: listen, ask the AI service, filter
//! the reply and speak it. The [`ConversationOrchestrator`] owns the history
//! and the state machine; collaborators are reached only through the ports
//! defined in `ai_core` and `ai_speech`.

pub mod config;
pub mod error;
pub mod events;
pub mod humanize;
pub mod orchestrator;

pub use config::OrchestratorConfig;
pub use error::ApplicationError;
pub use events::{ConversationError, ConversationEvent};
pub use humanize::friendly_message;
pub use orchestrator::ConversationOrchestrator;

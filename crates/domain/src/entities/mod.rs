//! Domain entities

pub mod conversation_history;
pub mod message;

pub use conversation_history::ConversationHistory;
pub use message::{Message, MessageRole};

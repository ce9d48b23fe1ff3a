//! Value objects

pub mod conversation_state;

pub use conversation_state::ConversationState;

//! Domain layer for Palaver
//!
//! Contains the conversation model shared by every other crate: role-tagged
//! messages, the bounded conversation history, the orchestrator state, the
//! error classification and the spoken-text response filter.
//! This layer performs no I/O.

pub mod entities;
pub mod errors;
pub mod response_filter;
pub mod value_objects;

pub use entities::*;
pub use errors::ErrorKind;
pub use value_objects::*;

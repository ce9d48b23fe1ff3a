//! Bounded conversation history
//!
//! Holds the most recent user and assistant turns. The system prompt is never
//! stored here; callers prepend it when assembling a request.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::{Message, MessageRole};

/// Smallest capacity a history can have
pub const MIN_HISTORY_CAPACITY: usize = 2;

/// Ordered, bounded buffer of conversation messages (oldest first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl ConversationHistory {
    /// Create an empty history holding at most `capacity` messages
    ///
    /// Capacities below [`MIN_HISTORY_CAPACITY`] are raised to it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_HISTORY_CAPACITY);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting the oldest ones while over capacity
    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push_back(Message::new(role, content));
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// Snapshot of the stored messages, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Iterate over the stored messages without copying
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Remove every message; capacity is unchanged
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the history is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Maximum number of stored messages
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(10)
    }
}

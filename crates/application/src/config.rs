//! Orchestrator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Smallest accepted history window
pub const MIN_MAX_HISTORY: usize = 2;
/// Largest accepted history window
pub const MAX_MAX_HISTORY: usize = 50;

/// Behaviour of the conversation loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Prompt sent as the first message of every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Keep earlier exchanges and send them with each request
    #[serde(default = "default_true")]
    pub enable_history: bool,

    /// Number of messages kept in history (user and assistant combined)
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Also speak a friendly version of errors aloud
    #[serde(default)]
    pub speak_errors: bool,

    /// Delay before the error state falls back to idle
    #[serde(default = "default_error_recovery_delay_ms")]
    pub error_recovery_delay_ms: u64,
}

fn default_system_prompt() -> String {
    "You are Palaver, a curious and friendly companion for children aged 7 to 12. \
     Keep every answer short (two or three sentences), cheerful and easy to understand. \
     Your replies are read aloud, so use plain spoken sentences only: no action \
     descriptions between asterisks and no formatting."
        .to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_history() -> usize {
    10
}

const fn default_error_recovery_delay_ms() -> u64 {
    2000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            enable_history: default_true(),
            max_history: default_max_history(),
            speak_errors: false,
            error_recovery_delay_ms: default_error_recovery_delay_ms(),
        }
    }
}

impl OrchestratorConfig {
    /// Delay before `Error` returns to `Idle`
    pub fn error_recovery_delay(&self) -> Duration {
        Duration::from_millis(self.error_recovery_delay_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.system_prompt.trim().is_empty() {
            return Err("conversation.system_prompt must not be empty".to_string());
        }
        if !(MIN_MAX_HISTORY..=MAX_MAX_HISTORY).contains(&self.max_history) {
            return Err(format!(
                "conversation.max_history must be between {MIN_MAX_HISTORY} and {MAX_MAX_HISTORY}"
            ));
        }
        Ok(())
    }
}

//! AI Core - Language-model service port and backends
//!
//! Defines the [`AiService`] capability used by the conversation orchestrator
//! and ships three HTTP backends: the OpenAI chat-completions API, the
//! Anthropic messages API and a local llama.cpp server. Credentials are
//! resolved through [`ApiKey`], which can persist runtime changes via a
//! [`CredentialStore`].

pub mod config;
pub mod credentials;
pub mod error;
pub mod ports;
pub mod providers;

pub use config::{AiBackend, AiServiceConfig, AnthropicConfig, LocalLlmConfig, OpenAiConfig};
pub use credentials::{ApiKey, CredentialError, CredentialStore, KeySource};
pub use error::AiServiceError;
pub use ports::AiService;
pub use providers::{AnthropicService, LocalLlmService, OpenAiService};

//! Infrastructure layer - Configuration, persistence and wiring
//!
//! Loads [`AppConfig`], persists runtime-set credentials, installs logging
//! and builds the concrete adapters behind the `ai_core` and `ai_speech`
//! ports.

pub mod config;
pub mod credentials;
pub mod factory;
pub mod telemetry;

pub use config::{AppConfig, CredentialsConfig, Environment, TelemetryAppConfig};
pub use credentials::{FileCredentialStore, InMemoryCredentialStore};
pub use factory::{build_ai_service, build_synthesizer, build_terminal_capture, credential_store};
pub use telemetry::{TelemetryError, init_logging};

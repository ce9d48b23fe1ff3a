//! Application configuration

use std::fmt;
use std::path::{Path, PathBuf};

use ai_core::AiServiceConfig;
use ai_speech::SpeechConfig;
use application::OrchestratorConfig;
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides, e.g. `PALAVER_AI__BACKEND=anthropic`
pub const ENV_PREFIX: &str = "PALAVER";

/// Base name of the optional configuration file in the working directory
const CONFIG_FILE: &str = "palaver";

/// Application environment (development or production)
///
/// In production, API keys are never read from ad-hoc environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Production environment
    Production,
}

impl Environment {
    /// Whether `PALAVER_<BACKEND>_API_KEY` variables are consulted
    pub const fn allows_env_credentials(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!(
                "Invalid environment: {s}. Use 'development' or 'production'"
            )),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment
    #[serde(default)]
    pub environment: Environment,

    /// AI backend selection and settings
    #[serde(default)]
    pub ai: AiServiceConfig,

    /// Conversation loop behaviour
    #[serde(default)]
    pub conversation: OrchestratorConfig,

    /// Speech capture and synthesis
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryAppConfig,

    /// Credential persistence
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryAppConfig {
    /// Log level filter (e.g., "info", "application=debug,ai_core=info");
    /// `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Emit JSON lines instead of human-readable logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "warn,application=info,ai_core=info,ai_speech=info".to_string()
}

impl Default for TelemetryAppConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json: false,
        }
    }
}

/// Where runtime-set API keys are stored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Credential file; defaults to `<config dir>/palaver/credentials.json`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CredentialsConfig {
    /// Effective credential file, if a location can be determined
    pub fn resolve_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            dirs::config_dir().map(|dir| dir.join("palaver").join("credentials.json"))
        })
    }
}

impl AppConfig {
    /// Load configuration from `palaver.toml` (optional) and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(None, None)
    }

    /// Load configuration from an explicit file plus environment
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        Self::load_with(Some(path), None)
    }

    fn load_with(
        path: Option<&Path>,
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(CONFIG_FILE).required(false),
        };

        let builder = config::Config::builder()
            .set_default("environment", "development")?
            .add_source(file)
            // Override with environment variables (e.g., PALAVER_SPEECH__SYNTHESIZER)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate().map_err(config::ConfigError::Message)?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.ai.validate().map_err(|e| format!("[ai] {e}"))?;
        self.conversation
            .validate()
            .map_err(|e| format!("[conversation] {e}"))?;
        self.speech.validate().map_err(|e| format!("[speech] {e}"))?;
        if self.telemetry.log_filter.trim().is_empty() {
            return Err("[telemetry] log_filter must not be empty".to_string());
        }
        Ok(())
    }

    /// Effective configuration as TOML
    ///
    /// API keys are `skip_serializing` and never appear in the output.
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

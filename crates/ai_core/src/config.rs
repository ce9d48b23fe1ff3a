//! AI service configuration

use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Which language-model backend answers the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiBackend {
    /// OpenAI chat completions
    #[default]
    OpenAi,
    /// Anthropic messages API
    Anthropic,
    /// llama.cpp server on the local network
    Local,
}

impl AiBackend {
    /// Every backend, in declaration order
    pub const ALL: [Self; 3] = [Self::OpenAi, Self::Anthropic, Self::Local];

    /// Stable identifier used in config files and the credential store
    pub const fn id(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Local => "local",
        }
    }

    /// Human-facing service name
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Claude",
            Self::Local => "LocalLLM",
        }
    }

    /// Whether requests need a credential
    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::Local)
    }

    /// Environment variable consulted as the last credential fallback
    pub fn env_var(self) -> String {
        format!("PALAVER_{}_API_KEY", self.id().to_uppercase())
    }
}

impl fmt::Display for AiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for AiBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "local" | "llama" | "localllm" => Ok(Self::Local),
            _ => Err(format!(
                "Invalid AI backend: {s}. Use 'openai', 'anthropic' or 'local'"
            )),
        }
    }
}

/// Top-level AI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiServiceConfig {
    /// Active backend
    #[serde(default)]
    pub backend: AiBackend,

    /// Log request and response bodies (credentials are never logged)
    #[serde(default)]
    pub log_requests: bool,

    /// OpenAI settings
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Anthropic settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Local llama.cpp settings
    #[serde(default)]
    pub local: LocalLlmConfig,
}

impl AiServiceConfig {
    /// Statically configured credential for a backend
    pub fn configured_key(&self, backend: AiBackend) -> Option<SecretString> {
        match backend {
            AiBackend::OpenAi => self.openai.api_key.clone(),
            AiBackend::Anthropic => self.anthropic.api_key.clone(),
            AiBackend::Local => None,
        }
    }

    /// Validate every backend section
    pub fn validate(&self) -> Result<(), String> {
        validate_generation(
            "openai",
            &self.openai.base_url,
            self.openai.temperature,
            self.openai.max_tokens,
            self.openai.timeout_ms,
        )?;
        validate_generation(
            "anthropic",
            &self.anthropic.base_url,
            self.anthropic.temperature,
            self.anthropic.max_tokens,
            self.anthropic.timeout_ms,
        )?;
        validate_generation(
            "local",
            &self.local.base_url,
            self.local.temperature,
            self.local.max_tokens,
            self.local.timeout_ms,
        )
    }
}

fn validate_generation(
    section: &str,
    base_url: &str,
    temperature: f32,
    max_tokens: u32,
    timeout_ms: u64,
) -> Result<(), String> {
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(format!("ai.{section}.base_url must be an http(s) URL"));
    }
    if !(0.0..=2.0).contains(&temperature) {
        return Err(format!("ai.{section}.temperature must be between 0.0 and 2.0"));
    }
    if max_tokens == 0 {
        return Err(format!("ai.{section}.max_tokens must be greater than 0"));
    }
    if timeout_ms == 0 {
        return Err(format!("ai.{section}.timeout_ms must be greater than 0"));
    }
    Ok(())
}

/// OpenAI chat-completions backend
#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (sensitive - uses SecretString)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// API base URL, without the `/chat/completions` suffix
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Anthropic messages backend
#[derive(Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (sensitive - uses SecretString)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// API base URL, without the `/v1/messages` suffix
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    /// Value of the `anthropic-version` header
    #[serde(default = "default_anthropic_version")]
    pub api_version: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_version", &self.api_version)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            api_version: default_anthropic_version(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// llama.cpp server backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalLlmConfig {
    /// Server base URL, without the `/completion` suffix
    #[serde(default = "default_local_base_url")]
    pub base_url: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to predict
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LocalLlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

fn default_local_base_url() -> String {
    "http://localhost:8080".to_string()
}

const fn default_temperature() -> f32 {
    0.7
}

const fn default_max_tokens() -> u32 {
    150 // short, speakable replies
}

const fn default_timeout_ms() -> u64 {
    30000 // 30 seconds
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = AiServiceConfig::default();
        assert_eq!(config.backend, AiBackend::OpenAi);
        assert!(!config.log_requests);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.max_tokens, 150);
        assert!((config.openai.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.openai.timeout_ms, 30000);
        assert_eq!(config.anthropic.api_version, "2023-06-01");
        assert_eq!(config.local.base_url, "http://localhost:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_deserializes_partial_toml() {
        let toml = r#"
            backend = "anthropic"
            log_requests = true

            [anthropic]
            api_key = "sk-ant-test"
            max_tokens = 300
        "#;

        let config: AiServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.backend, AiBackend::Anthropic);
        assert!(config.log_requests);
        assert_eq!(config.anthropic.max_tokens, 300);
        assert_eq!(config.anthropic.model, "claude-3-5-sonnet-20241022");
        assert_eq!(
            config
                .configured_key(AiBackend::Anthropic)
                .unwrap()
                .expose_secret(),
            "sk-ant-test"
        );
        assert!(config.configured_key(AiBackend::OpenAi).is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = OpenAiConfig {
            api_key: Some(SecretString::from("sk-secret-value".to_string())),
            ..OpenAiConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-secret-value"));
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let mut config = AiServiceConfig::default();
        config.openai.temperature = 3.5;
        let err = config.validate().unwrap_err();
        assert!(err.contains("temperature"));
    }

    #[test]
    fn validate_rejects_non_http_base_url() {
        let mut config = AiServiceConfig::default();
        config.local.base_url = "localhost:8080".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn backend_parses_aliases() {
        assert_eq!("Claude".parse::<AiBackend>().unwrap(), AiBackend::Anthropic);
        assert_eq!("openai".parse::<AiBackend>().unwrap(), AiBackend::OpenAi);
        assert_eq!("llama".parse::<AiBackend>().unwrap(), AiBackend::Local);
        assert!("gemini".parse::<AiBackend>().is_err());
    }

    #[test]
    fn env_var_names_follow_backend_id() {
        assert_eq!(AiBackend::OpenAi.env_var(), "PALAVER_OPENAI_API_KEY");
        assert_eq!(AiBackend::Anthropic.env_var(), "PALAVER_ANTHROPIC_API_KEY");
    }

    #[test]
    fn only_local_backend_works_without_key() {
        assert!(AiBackend::OpenAi.requires_api_key());
        assert!(AiBackend::Anthropic.requires_api_key());
        assert!(!AiBackend::Local.requires_api_key());
    }
}

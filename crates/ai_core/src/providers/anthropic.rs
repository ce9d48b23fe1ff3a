//! Anthropic messages backend

use async_trait::async_trait;
use domain::{Message, MessageRole};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::http::{HttpBackend, ensure_messages, require_key};
use crate::config::{AiBackend, AnthropicConfig};
use crate::credentials::{ApiKey, CredentialError};
use crate::error::AiServiceError;
use crate::ports::AiService;

/// Backend talking to `/v1/messages`
#[derive(Debug)]
pub struct AnthropicService {
    http: HttpBackend,
    config: AnthropicConfig,
    api_key: ApiKey,
}

impl AnthropicService {
    /// Create a new Anthropic backend
    pub fn new(
        config: AnthropicConfig,
        api_key: ApiKey,
        log_requests: bool,
    ) -> Result<Self, AiServiceError> {
        let http = HttpBackend::new(
            AiBackend::Anthropic.display_name(),
            config.timeout_ms,
            log_requests,
        )?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            configured = api_key.is_set(),
            "Initialized Anthropic service"
        );

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a Message>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u32>,
}

/// The messages API takes the system prompt as a separate field
fn split_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str())
        .collect();
    let turns = messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, turns)
}

#[async_trait]
impl AiService for AnthropicService {
    fn service_name(&self) -> &'static str {
        AiBackend::Anthropic.display_name()
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_set()
    }

    #[instrument(skip(self, messages), fields(model = %self.config.model, messages = messages.len()))]
    async fn get_response(&self, messages: &[Message]) -> Result<String, AiServiceError> {
        ensure_messages(messages)?;
        let key = require_key(&self.api_key, self.service_name())?;

        let (system, turns) = split_system(messages);
        if turns.is_empty() {
            return Err(AiServiceError::InvalidInput(
                "at least one user message is required".to_string(),
            ));
        }

        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: turns,
        };

        let request = self
            .http
            .client()
            .post(self.messages_url())
            .header("x-api-key", key.expose_secret())
            .header("anthropic-version", &self.config.api_version);

        let response: MessagesResponse = self.http.execute(request, &body).await?;

        if let Some(usage) = &response.usage {
            debug!(
                input_tokens = ?usage.input_tokens,
                output_tokens = ?usage.output_tokens,
                "Anthropic completion usage"
            );
        }

        let text: Vec<String> = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(AiServiceError::MalformedResponse(
                "No text content in Claude response".into(),
            ));
        }

        Ok(text.join("").trim().to_string())
    }

    async fn set_api_key(&self, key: SecretString) -> Result<(), CredentialError> {
        self.api_key.set(key).await
    }
}

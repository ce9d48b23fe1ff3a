//! llama.cpp server backend

use async_trait::async_trait;
use domain::{Message, MessageRole};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::http::{HttpBackend, ensure_messages};
use crate::config::{AiBackend, LocalLlmConfig};
use crate::credentials::CredentialError;
use crate::error::AiServiceError;
use crate::ports::AiService;

/// Backend talking to a llama.cpp `/completion` endpoint
///
/// The server takes a raw prompt, so the conversation is flattened into a
/// role-tagged transcript ending with an open assistant turn.
#[derive(Debug)]
pub struct LocalLlmService {
    http: HttpBackend,
    config: LocalLlmConfig,
}

impl LocalLlmService {
    /// Create a new local backend
    pub fn new(config: LocalLlmConfig, log_requests: bool) -> Result<Self, AiServiceError> {
        let http = HttpBackend::new(
            AiBackend::Local.display_name(),
            config.timeout_ms,
            log_requests,
        )?;

        info!(base_url = %config.base_url, "Initialized local LLM service");

        Ok(Self { http, config })
    }

    fn completion_url(&self) -> String {
        format!("{}/completion", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: String,
    n_predict: u32,
    temperature: f32,
    stop: [&'a str; 2],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
    #[serde(default)]
    tokens_predicted: Option<u32>,
}

fn speaker(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "System",
        MessageRole::User => "User",
        MessageRole::Assistant => "Assistant",
    }
}

fn build_prompt(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for message in messages {
        prompt.push_str(speaker(message.role));
        prompt.push_str(": ");
        prompt.push_str(message.content.trim());
        prompt.push('\n');
    }
    prompt.push_str("Assistant:");
    prompt
}

#[async_trait]
impl AiService for LocalLlmService {
    fn service_name(&self) -> &'static str {
        AiBackend::Local.display_name()
    }

    fn is_configured(&self) -> bool {
        true
    }

    #[instrument(skip(self, messages), fields(messages = messages.len()))]
    async fn get_response(&self, messages: &[Message]) -> Result<String, AiServiceError> {
        ensure_messages(messages)?;

        let body = CompletionRequest {
            prompt: build_prompt(messages),
            n_predict: self.config.max_tokens,
            temperature: self.config.temperature,
            stop: ["\nUser:", "\nSystem:"],
            stream: false,
        };

        let request = self.http.client().post(self.completion_url());
        let response: CompletionResponse = self.http.execute(request, &body).await?;

        debug!(tokens = ?response.tokens_predicted, "Local completion finished");

        Ok(response.content.trim().to_string())
    }

    async fn set_api_key(&self, _key: SecretString) -> Result<(), CredentialError> {
        debug!("Local LLM does not use an API key; ignoring");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_role_tagged_and_open_ended() {
        let prompt = build_prompt(&[
            Message::system("Be kind."),
            Message::user("Hi there "),
            Message::assistant("Hello!"),
            Message::user("How are you?"),
        ]);
        assert_eq!(
            prompt,
            "System: Be kind.\nUser: Hi there\nAssistant: Hello!\nUser: How are you?\nAssistant:"
        );
    }

    #[test]
    fn local_backend_is_always_configured() {
        let svc = LocalLlmService::new(LocalLlmConfig::default(), false).unwrap();
        assert!(svc.is_configured());
        assert_eq!(svc.service_name(), "LocalLLM");
    }

    #[tokio::test]
    async fn empty_messages_are_rejected() {
        let svc = LocalLlmService::new(LocalLlmConfig::default(), false).unwrap();
        assert!(matches!(
            svc.get_response(&[]).await,
            Err(AiServiceError::InvalidInput(_))
        ));
    }
}

//! OpenAI chat-completions backend

use async_trait::async_trait;
use domain::Message;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::http::{HttpBackend, ensure_messages, require_key};
use crate::config::{AiBackend, OpenAiConfig};
use crate::credentials::{ApiKey, CredentialError};
use crate::error::AiServiceError;
use crate::ports::AiService;

/// Reference backend talking to `/chat/completions`
#[derive(Debug)]
pub struct OpenAiService {
    http: HttpBackend,
    config: OpenAiConfig,
    api_key: ApiKey,
}

impl OpenAiService {
    /// Create a new OpenAI backend
    pub fn new(
        config: OpenAiConfig,
        api_key: ApiKey,
        log_requests: bool,
    ) -> Result<Self, AiServiceError> {
        let http = HttpBackend::new(
            AiBackend::OpenAi.display_name(),
            config.timeout_ms,
            log_requests,
        )?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            configured = api_key.is_set(),
            "Initialized OpenAI service"
        );

        Ok(Self {
            http,
            config,
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

#[async_trait]
impl AiService for OpenAiService {
    fn service_name(&self) -> &'static str {
        AiBackend::OpenAi.display_name()
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_set()
    }

    #[instrument(skip(self, messages), fields(model = %self.config.model, messages = messages.len()))]
    async fn get_response(&self, messages: &[Message]) -> Result<String, AiServiceError> {
        ensure_messages(messages)?;
        let key = require_key(&self.api_key, self.service_name())?;

        let body = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let request = self
            .http
            .client()
            .post(self.completions_url())
            .bearer_auth(key.expose_secret());

        let response: ChatResponse = self.http.execute(request, &body).await?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                "OpenAI completion usage"
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiServiceError::MalformedResponse("No response from OpenAI".into()))?;

        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }

    async fn set_api_key(&self, key: SecretString) -> Result<(), CredentialError> {
        self.api_key.set(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(key: Option<&str>) -> OpenAiService {
        OpenAiService::new(
            OpenAiConfig::default(),
            ApiKey::fixed(AiBackend::OpenAi, key.map(|k| SecretString::from(k.to_string()))),
            false,
        )
        .unwrap()
    }

    #[test]
    fn request_serializes_wire_shape() {
        let messages = vec![Message::system("Be brief"), Message::user("Hi")];
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.5,
            max_tokens: 150,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "Be brief"},
                    {"role": "user", "content": "Hi"}
                ],
                "temperature": 0.5,
                "max_tokens": 150
            })
        );
    }

    #[test]
    fn completions_url_tolerates_trailing_slash() {
        let mut config = OpenAiConfig::default();
        config.base_url = "http://localhost:9999/v1/".into();
        let svc = OpenAiService::new(config, ApiKey::fixed(AiBackend::OpenAi, None), false).unwrap();
        assert_eq!(svc.completions_url(), "http://localhost:9999/v1/chat/completions");
    }

    #[tokio::test]
    async fn empty_messages_fail_before_key_check() {
        let svc = service(None);
        let err = svc.get_response(&[]).await.unwrap_err();
        assert!(matches!(err, AiServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let svc = service(None);
        assert!(!svc.is_configured());
        let err = svc.get_response(&[Message::user("Hi")]).await.unwrap_err();
        assert_eq!(err, AiServiceError::not_configured("OpenAI"));
    }

    #[tokio::test]
    async fn set_api_key_configures_service() {
        let svc = service(None);
        svc.set_api_key(SecretString::from("sk-test".to_string()))
            .await
            .unwrap();
        assert!(svc.is_configured());
    }
}

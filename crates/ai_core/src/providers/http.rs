//! Shared HTTP plumbing for the backends

use std::time::Duration;

use domain::Message;
use reqwest::{Client, RequestBuilder};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::credentials::ApiKey;
use crate::error::AiServiceError;

/// Client plus the per-backend settings every request needs
#[derive(Debug)]
pub(crate) struct HttpBackend {
    client: Client,
    timeout_ms: u64,
    log_requests: bool,
    service: &'static str,
}

impl HttpBackend {
    pub(crate) fn new(
        service: &'static str,
        timeout_ms: u64,
        log_requests: bool,
    ) -> Result<Self, AiServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| AiServiceError::NetworkUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            timeout_ms,
            log_requests,
            service,
        })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Send `body` as JSON and decode a successful reply
    pub(crate) async fn execute<B, R>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> Result<R, AiServiceError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        if self.log_requests {
            info!(
                service = self.service,
                authorization = "[REDACTED]",
                body = %serde_json::to_string(body).unwrap_or_default(),
                "AI request"
            );
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| AiServiceError::from_transport(&e, self.timeout_ms))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AiServiceError::from_transport(&e, self.timeout_ms))?;

        if self.log_requests {
            info!(service = self.service, status = %status, body = %text, "AI response");
        }

        if !status.is_success() {
            let err = AiServiceError::from_status(status, &text);
            warn!(service = self.service, status = %status, error = %err, "AI request failed");
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| {
            debug!(service = self.service, error = %e, "Undecodable AI response");
            AiServiceError::MalformedResponse(e.to_string())
        })
    }
}

/// Checks every backend performs before touching the network
pub(crate) fn ensure_messages(messages: &[Message]) -> Result<(), AiServiceError> {
    if messages.is_empty() {
        return Err(AiServiceError::InvalidInput(
            "messages must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Current key or a not-configured error naming the service
pub(crate) fn require_key(key: &ApiKey, service: &str) -> Result<SecretString, AiServiceError> {
    key.get()
        .ok_or_else(|| AiServiceError::not_configured(service))
}

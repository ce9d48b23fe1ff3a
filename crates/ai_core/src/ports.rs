//! AI service port

use async_trait::async_trait;
use domain::Message;
#[cfg(test)]
use mockall::automock;
use secrecy::SecretString;

use crate::credentials::CredentialError;
use crate::error::AiServiceError;

/// A language-model backend that turns a conversation into a reply
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AiService: Send + Sync {
    /// Human-facing name, used in error messages
    fn service_name(&self) -> &'static str;

    /// Whether a request could be sent right now (credential available)
    fn is_configured(&self) -> bool;

    /// Request the assistant's reply to `messages`
    ///
    /// # Arguments
    /// * `messages` - Full request, system prompt first; must be non-empty
    ///
    /// # Errors
    /// `InvalidInput` for an empty list and `NotConfigured` for a missing
    /// credential, both before any network activity. Transport and backend
    /// failures are classified per [`AiServiceError`].
    async fn get_response(&self, messages: &[Message]) -> Result<String, AiServiceError>;

    /// Replace the credential; effective for the next request and persisted
    async fn set_api_key(&self, key: SecretString) -> Result<(), CredentialError>;
}

//! Credential resolution and persistence
//!
//! A backend's key is resolved once at construction in this order:
//! persisted runtime override, static configuration, then the
//! `PALAVER_<BACKEND>_API_KEY` environment variable (only when the caller
//! allows it, i.e. outside production). [`ApiKey::set`] replaces the key for
//! subsequent requests and writes it through to the store.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::config::AiBackend;

/// Errors raised by credential handling
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Empty or whitespace-only key
    #[error("API key must not be empty")]
    EmptyKey,

    /// Reading or writing the backing store failed
    #[error("Credential storage error: {0}")]
    Storage(String),

    /// The backing store holds unreadable data
    #[error("Corrupt credential store: {0}")]
    Corrupt(String),
}

/// Port for persisting runtime-set credentials across process runs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the persisted key for a backend
    async fn load(&self, backend: AiBackend) -> Result<Option<SecretString>, CredentialError>;

    /// Persist a key for a backend, replacing any previous one
    async fn save(&self, backend: AiBackend, key: SecretString) -> Result<(), CredentialError>;

    /// Forget the persisted key for a backend
    async fn remove(&self, backend: AiBackend) -> Result<(), CredentialError>;
}

/// Where the active key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Set at runtime (now or in an earlier run)
    Stored,
    /// Static configuration
    Config,
    /// Environment variable
    Environment,
    /// No key available
    Missing,
}

/// The active credential of one backend
pub struct ApiKey {
    backend: AiBackend,
    current: RwLock<Option<SecretString>>,
    source: RwLock<KeySource>,
    store: Option<Arc<dyn CredentialStore>>,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("backend", &self.backend)
            .field("source", &*self.source.read())
            .field("set", &self.is_set())
            .finish_non_exhaustive()
    }
}

impl ApiKey {
    /// A fixed key with no persistence, mainly for tests and one-off clients
    pub fn fixed(backend: AiBackend, key: Option<SecretString>) -> Self {
        let source = if key.is_some() {
            KeySource::Config
        } else {
            KeySource::Missing
        };
        Self {
            backend,
            current: RwLock::new(key),
            source: RwLock::new(source),
            store: None,
        }
    }

    /// Resolve a backend's key from the store, configuration and environment
    pub async fn resolve(
        backend: AiBackend,
        configured: Option<SecretString>,
        store: Option<Arc<dyn CredentialStore>>,
        allow_env: bool,
    ) -> Self {
        Self::resolve_with(backend, configured, store, allow_env, |name| {
            std::env::var(name).ok()
        })
        .await
    }

    /// Like [`ApiKey::resolve`] with an injectable environment lookup
    pub async fn resolve_with<F>(
        backend: AiBackend,
        configured: Option<SecretString>,
        store: Option<Arc<dyn CredentialStore>>,
        allow_env: bool,
        env: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String> + Send,
    {
        let stored = match &store {
            Some(store) => match store.load(backend).await {
                Ok(key) => key,
                Err(e) => {
                    warn!(backend = %backend, error = %e, "Failed to load stored credential");
                    None
                },
            },
            None => None,
        };

        let (key, source) = if let Some(key) = non_empty(stored) {
            (Some(key), KeySource::Stored)
        } else if let Some(key) = non_empty(configured) {
            (Some(key), KeySource::Config)
        } else if let Some(key) = allow_env
            .then(|| env(&backend.env_var()))
            .flatten()
            .map(SecretString::from)
            .and_then(|k| non_empty(Some(k)))
        {
            (Some(key), KeySource::Environment)
        } else {
            (None, KeySource::Missing)
        };

        debug!(backend = %backend, source = ?source, "Resolved API key");

        Self {
            backend,
            current: RwLock::new(key),
            source: RwLock::new(source),
            store,
        }
    }

    /// Backend this key belongs to
    pub const fn backend(&self) -> AiBackend {
        self.backend
    }

    /// Whether a key is available
    pub fn is_set(&self) -> bool {
        self.current.read().is_some()
    }

    /// Where the active key came from
    pub fn source(&self) -> KeySource {
        *self.source.read()
    }

    /// Copy of the active key
    pub fn get(&self) -> Option<SecretString> {
        self.current.read().clone()
    }

    /// Replace the key and persist it
    ///
    /// The new key is active for the next request even when persisting fails;
    /// the storage error is still reported.
    pub async fn set(&self, key: SecretString) -> Result<(), CredentialError> {
        let key = non_empty(Some(key)).ok_or(CredentialError::EmptyKey)?;

        *self.current.write() = Some(key.clone());
        *self.source.write() = KeySource::Stored;
        info!(backend = %self.backend, "API key updated");

        if let Some(store) = &self.store {
            store.save(self.backend, key).await?;
        }
        Ok(())
    }
}

fn non_empty(key: Option<SecretString>) -> Option<SecretString> {
    key.filter(|k| !k.expose_secret().trim().is_empty())
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn store_with(key: Option<&'static str>) -> Arc<dyn CredentialStore> {
        let mut store = MockCredentialStore::new();
        store
            .expect_load()
            .returning(move |_| Ok(key.map(|k| SecretString::from(k.to_string()))));
        Arc::new(store)
    }

    #[tokio::test]
    async fn stored_key_wins_over_config_and_env() {
        let key = ApiKey::resolve_with(
            AiBackend::OpenAi,
            Some(secret("from-config")),
            Some(store_with(Some("from-store"))),
            true,
            |_| Some("from-env".into()),
        )
        .await;

        assert_eq!(key.source(), KeySource::Stored);
        assert_eq!(key.get().unwrap().expose_secret(), "from-store");
    }

    #[tokio::test]
    async fn config_key_wins_over_env() {
        let key = ApiKey::resolve_with(
            AiBackend::OpenAi,
            Some(secret("from-config")),
            Some(store_with(None)),
            true,
            |_| Some("from-env".into()),
        )
        .await;

        assert_eq!(key.source(), KeySource::Config);
        assert_eq!(key.get().unwrap().expose_secret(), "from-config");
    }

    #[tokio::test]
    async fn env_key_is_used_when_allowed() {
        let key = ApiKey::resolve_with(AiBackend::Anthropic, None, None, true, |name| {
            (name == "PALAVER_ANTHROPIC_API_KEY").then(|| "from-env".to_string())
        })
        .await;

        assert_eq!(key.source(), KeySource::Environment);
        assert_eq!(key.get().unwrap().expose_secret(), "from-env");
    }

    #[tokio::test]
    async fn env_key_is_ignored_when_not_allowed() {
        let key = ApiKey::resolve_with(AiBackend::OpenAi, None, None, false, |_| {
            Some("from-env".into())
        })
        .await;

        assert_eq!(key.source(), KeySource::Missing);
        assert!(!key.is_set());
    }

    #[tokio::test]
    async fn blank_config_key_counts_as_missing() {
        let key =
            ApiKey::resolve_with(AiBackend::OpenAi, Some(secret("   ")), None, false, |_| None)
                .await;
        assert!(!key.is_set());
    }

    #[tokio::test]
    async fn store_failure_falls_back_to_config() {
        let mut store = MockCredentialStore::new();
        store
            .expect_load()
            .returning(|_| Err(CredentialError::Storage("disk on fire".into())));

        let key = ApiKey::resolve_with(
            AiBackend::OpenAi,
            Some(secret("from-config")),
            Some(Arc::new(store)),
            false,
            |_| None,
        )
        .await;

        assert_eq!(key.source(), KeySource::Config);
    }

    #[tokio::test]
    async fn set_persists_and_activates_key() {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|_| Ok(None));
        store
            .expect_save()
            .with(eq(AiBackend::OpenAi), mockall::predicate::always())
            .times(1)
            .returning(|_, _| Ok(()));

        let key =
            ApiKey::resolve_with(AiBackend::OpenAi, None, Some(Arc::new(store)), false, |_| None)
                .await;
        assert!(!key.is_set());

        key.set(secret("sk-new")).await.unwrap();
        assert!(key.is_set());
        assert_eq!(key.source(), KeySource::Stored);
        assert_eq!(key.get().unwrap().expose_secret(), "sk-new");
    }

    #[tokio::test]
    async fn set_rejects_empty_key() {
        let key = ApiKey::fixed(AiBackend::OpenAi, None);
        assert_eq!(key.set(secret("")).await, Err(CredentialError::EmptyKey));
        assert!(!key.is_set());
    }

    #[tokio::test]
    async fn set_keeps_key_active_when_persisting_fails() {
        let mut store = MockCredentialStore::new();
        store.expect_load().returning(|_| Ok(None));
        store
            .expect_save()
            .returning(|_, _| Err(CredentialError::Storage("read-only".into())));

        let key =
            ApiKey::resolve_with(AiBackend::OpenAi, None, Some(Arc::new(store)), false, |_| None)
                .await;

        assert!(key.set(secret("sk-new")).await.is_err());
        assert!(key.is_set());
    }

    #[test]
    fn debug_does_not_expose_key() {
        let key = ApiKey::fixed(AiBackend::OpenAi, Some(secret("sk-very-secret")));
        let debug = format!("{key:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("set: true"));
    }
}

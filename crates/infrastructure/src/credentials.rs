//! Credential store adapters
//!
//! [`FileCredentialStore`] keeps runtime-set API keys in a small JSON file
//! readable only by the owner. [`InMemoryCredentialStore`] serves tests and
//! ephemeral sessions.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ai_core::{AiBackend, CredentialError, CredentialStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

#[derive(Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    credentials: BTreeMap<String, StoredCredential>,
}

#[derive(Serialize, Deserialize)]
struct StoredCredential {
    api_key: String,
    updated_at: DateTime<Utc>,
}

/// JSON-file backed credential store
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    /// Create a store backed by `path`; the file is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Location of the credential file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<CredentialFile, CredentialError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CredentialFile::default()),
            Err(e) => {
                return Err(CredentialError::Storage(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            },
        };

        serde_json::from_slice(&raw)
            .map_err(|e| CredentialError::Corrupt(format!("{}: {e}", self.path.display())))
    }

    async fn write(&self, file: &CredentialFile) -> Result<(), CredentialError> {
        let storage = |e: std::io::Error| {
            CredentialError::Storage(format!("Failed to write {}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(storage)?;
        }

        let json = serde_json::to_vec_pretty(file)
            .map_err(|e| CredentialError::Storage(e.to_string()))?;

        // Write next to the target and rename, so readers never see a partial file
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await.map_err(storage)?;
        restrict_permissions(&staging).await.map_err(storage)?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(storage)?;
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self, backend: AiBackend) -> Result<Option<SecretString>, CredentialError> {
        let file = self.read().await?;
        let key = file
            .credentials
            .get(backend.id())
            .map(|entry| SecretString::from(entry.api_key.clone()));
        debug!(found = key.is_some(), "Loaded stored credential");
        Ok(key)
    }

    #[instrument(skip(self, key), fields(path = %self.path.display()))]
    async fn save(&self, backend: AiBackend, key: SecretString) -> Result<(), CredentialError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read().await?;
        file.credentials.insert(
            backend.id().to_string(),
            StoredCredential {
                api_key: key.expose_secret().to_string(),
                updated_at: Utc::now(),
            },
        );
        self.write(&file).await?;
        info!(backend = %backend, "Credential saved");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn remove(&self, backend: AiBackend) -> Result<(), CredentialError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read().await?;
        if file.credentials.remove(backend.id()).is_none() {
            debug!(backend = %backend, "No stored credential to remove");
            return Ok(());
        }
        self.write(&file).await?;
        info!(backend = %backend, "Credential removed");
        Ok(())
    }
}

/// Process-local credential store
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    keys: RwLock<HashMap<AiBackend, SecretString>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self, backend: AiBackend) -> Result<Option<SecretString>, CredentialError> {
        Ok(self.keys.read().get(&backend).cloned())
    }

    async fn save(&self, backend: AiBackend, key: SecretString) -> Result<(), CredentialError> {
        self.keys.write().insert(backend, key);
        Ok(())
    }

    async fn remove(&self, backend: AiBackend) -> Result<(), CredentialError> {
        self.keys.write().remove(&backend);
        Ok(())
    }
}

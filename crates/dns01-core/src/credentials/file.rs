// # File Credential Store
//
// File-backed implementation of CredentialStore.
//
// ## Purpose
//
// Stands in for the cluster secret store: a JSON document holding the app
// credentials and the current token pair, shared by the long-running daemon
// (which refreshes tokens) and one-shot invocations (which read them).
//
// ## Freshness
//
// Every read goes to disk. Nothing is cached in memory, so a token written by
// another process is visible to the next call.
//
// ## Crash Recovery
//
// - Atomic writes: write-then-rename
// - Automatic backup: keeps `.backup` of the previous document
// - Recovery: reads fall back to the backup if the main file is corrupt
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "name": "nicru-tokens",
//   "namespace": "cert-manager",
//   "updated_at": "2026-01-09T12:00:00Z",
//   "data": {
//     "APP_ID": "...",
//     "APP_SECRET": "...",
//     "REFRESH_TOKEN": "...",
//     "ACCESS_TOKEN": "..."
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::Error;
use crate::traits::credential_store::{CredentialStore, Secret};

/// Secret file format version
const SECRET_FILE_VERSION: &str = "1.0";

/// File-based credential store
///
/// # Example
///
/// ```rust,no_run
/// use dns01_core::credentials::FileCredentialStore;
/// use dns01_core::traits::CredentialStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileCredentialStore::open("/var/lib/dns01/nicru-tokens.json").await?;
///     let pair = store.token_pair().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

/// Serializable secret file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct SecretFileFormat {
    version: String,
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

impl SecretFileFormat {
    fn into_secret(self) -> Secret {
        Secret {
            name: self.name,
            namespace: self.namespace,
            data: self.data,
        }
    }
}

/// Outcome of reading one document from disk
enum LoadError {
    /// The file exists but does not parse
    Corrupt(String),
    /// Any other failure (missing file, permissions, ...)
    Unreadable(Error),
}

impl FileCredentialStore {
    /// Open an existing secret file
    ///
    /// Fails if neither the file nor its backup can be read.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        };

        let secret = store.read_with_recovery().await?;
        tracing::debug!(
            path = %store.path.display(),
            secret = %secret.name,
            namespace = %secret.namespace,
            "Opened credential file"
        );

        Ok(store)
    }

    /// Create (or replace) a secret file with the given contents
    ///
    /// Creates parent directories if needed.
    pub async fn create<P: AsRef<Path>>(path: P, secret: &Secret) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create credential directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };

        {
            let _guard = store.write_lock.lock().await;
            store.write_document(secret).await?;
        }

        Ok(store)
    }

    /// Path of the secret file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the secret, falling back to the backup if the main file is corrupt
    async fn read_with_recovery(&self) -> Result<Secret, Error> {
        match Self::load(&self.path).await {
            Ok(doc) => Ok(doc.into_secret()),
            Err(LoadError::Unreadable(e)) => Err(e),
            Err(LoadError::Corrupt(reason)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Credential file appears corrupted: {}. Attempting recovery from backup.",
                    reason
                );

                let backup_path = Self::backup_path(&self.path);
                match Self::load(&backup_path).await {
                    Ok(doc) => {
                        tracing::info!("Read credentials from backup file");
                        Ok(doc.into_secret())
                    }
                    Err(LoadError::Corrupt(backup_reason)) => Err(Error::credential_store(
                        format!(
                            "Credential file {} and its backup are corrupted: {}; {}",
                            self.path.display(),
                            reason,
                            backup_reason
                        ),
                    )),
                    Err(LoadError::Unreadable(_)) => Err(Error::credential_store(format!(
                        "Credential file {} is corrupted and no usable backup exists: {}",
                        self.path.display(),
                        reason
                    ))),
                }
            }
        }
    }

    /// Load one document from disk
    async fn load(path: &Path) -> Result<SecretFileFormat, LoadError> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadError::Unreadable(Error::credential_store(format!(
                "Failed to read credential file {}: {}",
                path.display(),
                e
            )))
        })?;

        let doc: SecretFileFormat =
            serde_json::from_str(&content).map_err(|e| LoadError::Corrupt(e.to_string()))?;

        if doc.version != SECRET_FILE_VERSION {
            tracing::warn!(
                "Credential file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                SECRET_FILE_VERSION,
                doc.version
            );
        }

        Ok(doc)
    }

    /// Write the document atomically
    ///
    /// Callers must hold `write_lock`.
    async fn write_document(&self, secret: &Secret) -> Result<(), Error> {
        let doc = SecretFileFormat {
            version: SECRET_FILE_VERSION.to_string(),
            name: secret.name.clone(),
            namespace: secret.namespace.clone(),
            updated_at: Some(chrono::Utc::now()),
            data: secret.data.clone(),
        };

        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| Error::credential_store(format!("Failed to serialize secret: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::credential_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::credential_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::credential_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create credential backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::credential_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!(path = %self.path.display(), "Credential file written");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get_secret(&self) -> Result<Secret, Error> {
        self.read_with_recovery().await
    }

    async fn patch_secret(&self, fields: BTreeMap<String, String>) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;

        let mut secret = self.read_with_recovery().await?;
        secret.data.extend(fields);

        self.write_document(&secret).await
    }
}

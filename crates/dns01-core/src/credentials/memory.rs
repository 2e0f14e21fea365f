// # Memory Credential Store
//
// In-memory implementation of CredentialStore.
//
// ## Purpose
//
// Holds the secret in a map protected by a RwLock. Nothing survives a
// restart, so a refreshed token pair is lost with the process; use the file
// store (or the cluster secret store) anywhere tokens must outlive it.
//
// ## When to Use
//
// - Tests
// - Embedding, where the host owns persistence

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::credential_store::{CredentialStore, Secret};

/// In-memory credential store
///
/// Clones share the same underlying secret.
///
/// # Example
///
/// ```rust
/// use dns01_core::credentials::MemoryCredentialStore;
/// use dns01_core::traits::{CredentialStore, Secret, TokenPair, ACCESS_TOKEN};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryCredentialStore::new(Secret::new("nicru-tokens", "default"));
///
///     store.store_token_pair(&TokenPair::new("access", "refresh")).await?;
///     assert_eq!(store.get_secret().await?.field(ACCESS_TOKEN), "access");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryCredentialStore {
    inner: Arc<RwLock<Secret>>,
}

impl MemoryCredentialStore {
    /// Create a store holding `secret`
    pub fn new(secret: Secret) -> Self {
        Self {
            inner: Arc::new(RwLock::new(secret)),
        }
    }

    /// Replace the whole secret
    pub async fn replace(&self, secret: Secret) {
        *self.inner.write().await = secret;
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new(Secret::default())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get_secret(&self) -> Result<Secret, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn patch_secret(&self, fields: BTreeMap<String, String>) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.data.extend(fields);
        Ok(())
    }
}

// # Credential Store Implementations
//
// This module provides implementations of the CredentialStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

use std::sync::Arc;

use crate::config::{CredentialBackend, CredentialStoreConfig};
use crate::traits::{CredentialStore, Secret};

/// Build a credential store from configuration
///
/// The file backend requires the file to exist already; it is seeded by the
/// operator with the app credentials and an initial token pair. The document
/// must name the configured secret and namespace.
pub async fn from_config(
    config: &CredentialStoreConfig,
) -> Result<Arc<dyn CredentialStore>, crate::Error> {
    config.validate()?;

    match &config.backend {
        CredentialBackend::File { path } => {
            let store = FileCredentialStore::open(path).await?;
            let secret = store.get_secret().await?;
            if secret.name != config.secret_name || secret.namespace != config.namespace {
                tracing::error!(
                    path = %path,
                    expected = %format!("{}/{}", config.namespace, config.secret_name),
                    found = %format!("{}/{}", secret.namespace, secret.name),
                    "Credential file holds a different secret"
                );
                return Err(crate::Error::config(format!(
                    "credential file {} holds secret {}/{}, expected {}/{}",
                    path, secret.namespace, secret.name, config.namespace, config.secret_name
                )));
            }
            Ok(Arc::new(store))
        }
        CredentialBackend::Memory => Ok(Arc::new(MemoryCredentialStore::new(Secret::new(
            config.secret_name.clone(),
            config.namespace.clone(),
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ACCESS_TOKEN;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_memory_backend_starts_empty() {
        let config = CredentialStoreConfig::default();
        let store = assert_ok!(from_config(&config).await);

        let secret = assert_ok!(store.get_secret().await);
        assert_eq!(secret.name, "nicru-tokens");
        assert_eq!(secret.field(ACCESS_TOKEN), "");
    }

    #[tokio::test]
    async fn test_file_backend_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nicru-tokens.json");
        let config = CredentialStoreConfig {
            namespace: "default".to_string(),
            backend: CredentialBackend::File {
                path: path.to_string_lossy().into_owned(),
            },
            ..CredentialStoreConfig::default()
        };

        assert!(from_config(&config).await.is_err());

        assert_ok!(
            FileCredentialStore::create(
                &path,
                &Secret::new("nicru-tokens", "default").with_field(ACCESS_TOKEN, "a"),
            )
            .await
        );
        let store = assert_ok!(from_config(&config).await);
        assert_eq!(assert_ok!(store.access_token().await), "a");
    }

    #[tokio::test]
    async fn test_file_backend_rejects_other_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nicru-tokens.json");
        assert_ok!(
            FileCredentialStore::create(
                &path,
                &Secret::new("nicru-tokens", "staging").with_field(ACCESS_TOKEN, "a"),
            )
            .await
        );
        let file = CredentialBackend::File {
            path: path.to_string_lossy().into_owned(),
        };

        let other_namespace = CredentialStoreConfig {
            secret_name: "nicru-tokens".to_string(),
            namespace: "prod".to_string(),
            backend: file.clone(),
        };
        let err = from_config(&other_namespace).await.err().unwrap();
        assert!(matches!(err, crate::Error::Config(_)), "got {:?}", err);
        assert!(err.to_string().contains("staging/nicru-tokens"));

        let other_name = CredentialStoreConfig {
            secret_name: "other-tokens".to_string(),
            namespace: "staging".to_string(),
            backend: file.clone(),
        };
        assert!(matches!(
            from_config(&other_name).await.err(),
            Some(crate::Error::Config(_))
        ));

        let matching = CredentialStoreConfig {
            secret_name: "nicru-tokens".to_string(),
            namespace: "staging".to_string(),
            backend: file,
        };
        assert_ok!(from_config(&matching).await);
    }
}

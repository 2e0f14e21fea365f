// # Credential Store Trait
//
// Defines the interface to the persisted secret that holds the provider's
// OAuth app credentials and the current token pair.
//
// ## Keys
//
// - `APP_ID`, `APP_SECRET`: OAuth app credentials, immutable for the process
// - `REFRESH_TOKEN`, `ACCESS_TOKEN`: rotated by the token refresher
//
// ## Consistency
//
// No local locking is layered on top of the store. Implementations must give
// read-after-write consistency per key: an access token written by the
// refresher is the one the next API call reads.
//
// ## Usage
//
// ```rust,ignore
// use dns01_core::CredentialStore;
//
// let pair = store.token_pair().await?;
// client.list_zones(&pair.access_token).await?;
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;

/// Secret key holding the OAuth app id
pub const APP_ID: &str = "APP_ID";
/// Secret key holding the OAuth app secret
pub const APP_SECRET: &str = "APP_SECRET";
/// Secret key holding the current refresh token
pub const REFRESH_TOKEN: &str = "REFRESH_TOKEN";
/// Secret key holding the current access token
pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";

/// A snapshot of the persisted secret
#[derive(Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Secret {
    /// Secret name (e.g. "nicru-tokens")
    pub name: String,
    /// Namespace the secret lives in
    pub namespace: String,
    /// Secret fields
    pub data: BTreeMap<String, String>,
}

impl Secret {
    /// Create an empty secret
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            data: BTreeMap::new(),
        }
    }

    /// Add a field (builder style)
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Read a field; a missing key reads as the empty string
    pub fn field(&self, key: &str) -> &str {
        self.data.get(key).map(String::as_str).unwrap_or("")
    }
}

// Values are secrets, only keys are shown.
impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// OAuth access/refresh token pair
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenPair {
    /// Bearer token for DNS API calls
    pub access_token: String,
    /// Token exchanged for the next pair
    pub refresh_token: String,
}

impl TokenPair {
    /// Create a token pair
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<REDACTED>")
            .field("refresh_token", &"<REDACTED>")
            .finish()
    }
}

/// OAuth app credentials
#[derive(Clone, PartialEq, Eq)]
pub struct AppCredentials {
    /// OAuth client id
    pub app_id: String,
    /// OAuth client secret
    pub app_secret: String,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<REDACTED>")
            .finish()
    }
}

/// Trait for credential store implementations
///
/// The store is the only shared mutable resource in the system. Every
/// authenticated API call reads it fresh; the token refresher is the only
/// writer of the token fields.
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the whole secret
    async fn get_secret(&self) -> Result<Secret, crate::Error>;

    /// Merge the given fields into the secret
    ///
    /// All fields of one patch must become visible together.
    async fn patch_secret(&self, fields: BTreeMap<String, String>) -> Result<(), crate::Error>;

    /// Read the current token pair
    async fn token_pair(&self) -> Result<TokenPair, crate::Error> {
        let secret = self.get_secret().await?;
        Ok(TokenPair::new(
            secret.field(ACCESS_TOKEN),
            secret.field(REFRESH_TOKEN),
        ))
    }

    /// Read the current access token
    async fn access_token(&self) -> Result<String, crate::Error> {
        Ok(self.token_pair().await?.access_token)
    }

    /// Read the OAuth app credentials
    async fn app_credentials(&self) -> Result<AppCredentials, crate::Error> {
        let secret = self.get_secret().await?;
        Ok(AppCredentials {
            app_id: secret.field(APP_ID).to_string(),
            app_secret: secret.field(APP_SECRET).to_string(),
        })
    }

    /// Overwrite both token fields in a single patch
    async fn store_token_pair(&self, pair: &TokenPair) -> Result<(), crate::Error> {
        let mut fields = BTreeMap::new();
        fields.insert(ACCESS_TOKEN.to_string(), pair.access_token.clone());
        fields.insert(REFRESH_TOKEN.to_string(), pair.refresh_token.clone());
        self.patch_secret(fields).await
    }
}

//! Challenge requests as handed over by the host framework

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One DNS-01 challenge to present or clean up
///
/// Field names follow the host's JSON encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    /// Fully qualified record name, with trailing dot
    /// (e.g. "_acme-challenge.example.com.")
    #[serde(rename = "resolvedFQDN")]
    pub resolved_fqdn: String,

    /// Zone the record belongs to, with trailing dot (e.g. "example.com.")
    pub resolved_zone: String,

    /// Challenge value to publish
    pub key: String,

    /// Namespace of the resource that requested the challenge
    #[serde(default)]
    pub resource_namespace: String,

    /// Provider-specific solver configuration, passed through undecoded
    #[serde(default, rename = "config", skip_serializing_if = "Option::is_none")]
    pub raw_config: Option<serde_json::Value>,
}

impl ChallengeRequest {
    /// Create a request without provider configuration
    pub fn new(
        resolved_fqdn: impl Into<String>,
        resolved_zone: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            resolved_fqdn: resolved_fqdn.into(),
            resolved_zone: resolved_zone.into(),
            key: key.into(),
            resource_namespace: String::new(),
            raw_config: None,
        }
    }

    /// Set the resource namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.resource_namespace = namespace.into();
        self
    }

    /// Attach raw provider configuration
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.raw_config = Some(config);
        self
    }

    /// Zone name without the trailing root separator
    ///
    /// # Errors
    ///
    /// `InvalidInput` if nothing is left once the separator is removed.
    pub fn zone_name(&self) -> Result<&str> {
        let zone = self
            .resolved_zone
            .strip_suffix('.')
            .unwrap_or(&self.resolved_zone);

        if zone.is_empty() {
            return Err(Error::invalid_input(format!(
                "resolved zone '{}' has no name",
                self.resolved_zone
            )));
        }
        Ok(zone)
    }

    /// Record name relative to the zone
    ///
    /// "_acme-challenge.example.com." in zone "example.com." becomes
    /// "_acme-challenge". A name outside the zone is returned unchanged.
    pub fn relative_record_name(&self) -> &str {
        let suffix = format!(".{}", self.resolved_zone);
        self.resolved_fqdn
            .strip_suffix(suffix.as_str())
            .unwrap_or(&self.resolved_fqdn)
    }
}

/// Reference to one key of a secret
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    /// Secret name
    pub name: String,
    /// Key within the secret
    #[serde(default)]
    pub key: String,
}

/// Provider-specific solver configuration embedded in a request
///
/// Decoded and validated on every call; no field changes solver behaviour
/// yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSolverConfig {
    /// Secret holding the provider tokens
    #[serde(
        rename = "nicruTokenSecretRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub token_secret_ref: Option<SecretKeySelector>,
}

impl ProviderSolverConfig {
    /// Decode the raw configuration of a request
    ///
    /// Absent or null configuration decodes to the default.
    pub fn decode(raw: Option<&serde_json::Value>) -> Result<Self> {
        match raw {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::invalid_input(format!("failed to decode config: {}", e))),
        }
    }
}

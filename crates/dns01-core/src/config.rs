//! Configuration types for the DNS-01 solver
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dns01Config {
    /// DNS provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Credential store configuration
    #[serde(default)]
    pub credentials: CredentialStoreConfig,

    /// Token refresher settings
    #[serde(default)]
    pub refresher: RefresherConfig,

    /// Challenge solver settings
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Dns01Config {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            provider: ProviderConfig::default(),
            credentials: CredentialStoreConfig::default(),
            refresher: RefresherConfig::default(),
            solver: SolverConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.credentials.validate()?;
        self.refresher.validate()?;
        self.solver.validate()?;
        Ok(())
    }
}

impl Default for Dns01Config {
    fn default() -> Self {
        Self::new()
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// NIC.RU DNS-master API
    Nicru {
        /// API base URL, with trailing slash
        #[serde(default = "default_api_base_url")]
        api_base_url: String,
        /// Per-request HTTP timeout (in seconds)
        #[serde(default = "default_request_timeout_secs")]
        request_timeout_secs: u64,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Nicru {
                api_base_url,
                request_timeout_secs,
            } => {
                if api_base_url.is_empty() {
                    return Err(crate::Error::config("API base URL cannot be empty"));
                }
                if !api_base_url.starts_with("https://") && !api_base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "API base URL must use HTTP or HTTPS scheme. Got: {}",
                        api_base_url
                    )));
                }
                if *request_timeout_secs == 0 {
                    return Err(crate::Error::config("Request timeout must be > 0"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Nicru { .. } => "nicru",
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Nicru {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Credential store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialStoreConfig {
    /// Name of the secret holding app credentials and tokens
    #[serde(default = "default_secret_name")]
    pub secret_name: String,

    /// Namespace of the secret
    #[serde(default)]
    pub namespace: String,

    /// Storage backend
    #[serde(default)]
    pub backend: CredentialBackend,
}

impl CredentialStoreConfig {
    /// Validate the credential store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.secret_name.is_empty() {
            return Err(crate::Error::config("Secret name cannot be empty"));
        }
        if let CredentialBackend::File { path } = &self.backend
            && path.is_empty()
        {
            return Err(crate::Error::config("Credential file path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for CredentialStoreConfig {
    fn default() -> Self {
        Self {
            secret_name: default_secret_name(),
            namespace: String::new(),
            backend: CredentialBackend::default(),
        }
    }
}

/// Credential store backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialBackend {
    /// JSON document on disk
    File {
        /// Path to the secret file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

/// Token refresher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefresherConfig {
    /// Delay before the first refresh (in seconds)
    ///
    /// Gives dependent clients time to initialize.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Period between refreshes (in seconds)
    #[serde(default = "default_refresh_interval_secs")]
    pub interval_secs: u64,

    /// Capacity of the refresher event channel
    ///
    /// When full, events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl RefresherConfig {
    /// Validate the refresher configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Refresh interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Startup delay as a `Duration`
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    /// Refresh period as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: default_startup_delay_secs(),
            interval_secs: default_refresh_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Challenge solver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// TTL of challenge TXT records (in seconds)
    #[serde(default = "default_record_ttl")]
    pub record_ttl: u32,

    /// Deadline for one present/clean-up invocation (in seconds)
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// What clean-up does when the zone cannot be resolved
    #[serde(default)]
    pub cleanup_zone_policy: CleanupZonePolicy,
}

impl SolverConfig {
    /// Validate the solver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.record_ttl == 0 {
            return Err(crate::Error::config("Record TTL must be > 0"));
        }
        if self.operation_timeout_secs == 0 {
            return Err(crate::Error::config("Operation timeout must be > 0"));
        }
        Ok(())
    }

    /// Operation deadline as a `Duration`
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            record_ttl: default_record_ttl(),
            operation_timeout_secs: default_operation_timeout_secs(),
            cleanup_zone_policy: CleanupZonePolicy::default(),
        }
    }
}

/// Clean-up behaviour when zone resolution fails or finds nothing
///
/// Present always aborts on a resolution failure. Clean-up historically
/// tolerates it and carries on with an empty service, which then fails at
/// record lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupZonePolicy {
    /// Log the resolution failure and continue with an empty service
    #[default]
    TolerateMissingZone,
    /// Abort clean-up with the resolution error (or NotFound if empty)
    FailFast,
}

impl std::str::FromStr for CleanupZonePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tolerant" | "tolerate-missing-zone" => Ok(Self::TolerateMissingZone),
            "fail-fast" | "strict" => Ok(Self::FailFast),
            other => Err(crate::Error::config(format!(
                "Unknown clean-up zone policy '{}'. Valid: tolerant, fail-fast",
                other
            ))),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.nic.ru/".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_secret_name() -> String {
    "nicru-tokens".to_string()
}

fn default_startup_delay_secs() -> u64 {
    60
}

fn default_refresh_interval_secs() -> u64 {
    3 * 60 * 60
}

fn default_event_channel_capacity() -> usize {
    64
}

fn default_record_ttl() -> u32 {
    60
}

fn default_operation_timeout_secs() -> u64 {
    120
}

// Environment configuration for dns01d
//
// Read once at startup. Every value has a default except GROUP_NAME (the
// host's API group; nothing can be registered without it) and
// DNS01_SECRET_PATH (where the token secret lives).

use anyhow::Result;
use dns01_core::config::{
    CleanupZonePolicy, CredentialBackend, CredentialStoreConfig, Dns01Config, ProviderConfig,
    RefresherConfig, SolverConfig,
};
use std::path::Path;
use std::str::FromStr;

/// Default secret name
pub const DEFAULT_SECRET_NAME: &str = "nicru-tokens";

/// Default namespace when NAMESPACE is unset
pub const DEFAULT_NAMESPACE: &str = "default";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub group_name: String,
    pub namespace: String,
    pub secret_name: String,
    pub secret_path: Option<String>,
    pub api_url: String,
    pub http_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub startup_delay_secs: u64,
    pub operation_timeout_secs: u64,
    pub cleanup_zone_policy: CleanupZonePolicy,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let group_name = var("GROUP_NAME").ok_or_else(|| {
            anyhow::anyhow!(
                "GROUP_NAME is required. \
                Set it via: export GROUP_NAME=acme.example.com"
            )
        })?;

        let cleanup_zone_policy = match var("DNS01_CLEANUP_ZONE_POLICY") {
            Some(raw) => CleanupZonePolicy::from_str(&raw)?,
            None => CleanupZonePolicy::default(),
        };

        Ok(Self {
            group_name,
            namespace: var("NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            secret_name: var("DNS01_SECRET_NAME")
                .unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string()),
            secret_path: var("DNS01_SECRET_PATH"),
            api_url: var("DNS01_API_URL")
                .unwrap_or_else(|| dns01_provider_nicru::NICRU_API_BASE.to_string()),
            http_timeout_secs: parse_secs(&var, "DNS01_HTTP_TIMEOUT_SECS", 30)?,
            refresh_interval_secs: parse_secs(&var, "DNS01_REFRESH_INTERVAL_SECS", 3 * 60 * 60)?,
            startup_delay_secs: parse_secs(&var, "DNS01_STARTUP_DELAY_SECS", 60)?,
            operation_timeout_secs: parse_secs(&var, "DNS01_OPERATION_TIMEOUT_SECS", 120)?,
            cleanup_zone_policy,
            log_level: var("DNS01_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match &self.secret_path {
            None => anyhow::bail!(
                "DNS01_SECRET_PATH is required. \
                Set it via: export DNS01_SECRET_PATH=/var/lib/dns01/nicru-tokens.json"
            ),
            Some(path) if !Path::new(path).exists() => anyhow::bail!(
                "DNS01_SECRET_PATH does not exist: {}. \
                Seed it with APP_ID, APP_SECRET, ACCESS_TOKEN and REFRESH_TOKEN first.",
                path
            ),
            Some(_) => {}
        }

        if self.api_url.starts_with("http://") {
            eprintln!(
                "WARNING: DNS01_API_URL uses HTTP (not HTTPS). \
                Tokens will be sent in clear text."
            );
        }

        if !(1..=300).contains(&self.http_timeout_secs) {
            anyhow::bail!(
                "DNS01_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.http_timeout_secs
            );
        }

        if self.refresh_interval_secs < 60 {
            anyhow::bail!(
                "DNS01_REFRESH_INTERVAL_SECS must be at least 60 seconds. Got: {}",
                self.refresh_interval_secs
            );
        }

        if self.operation_timeout_secs < self.http_timeout_secs {
            anyhow::bail!(
                "DNS01_OPERATION_TIMEOUT_SECS ({}) must not be shorter than \
                DNS01_HTTP_TIMEOUT_SECS ({})",
                self.operation_timeout_secs,
                self.http_timeout_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNS01_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.to_core().validate()?;
        Ok(())
    }

    /// Library configuration for the components
    pub fn to_core(&self) -> Dns01Config {
        Dns01Config {
            provider: ProviderConfig::Nicru {
                api_base_url: self.api_url.clone(),
                request_timeout_secs: self.http_timeout_secs,
            },
            credentials: CredentialStoreConfig {
                secret_name: self.secret_name.clone(),
                namespace: self.namespace.clone(),
                backend: match &self.secret_path {
                    Some(path) => CredentialBackend::File { path: path.clone() },
                    None => CredentialBackend::Memory,
                },
            },
            refresher: RefresherConfig {
                startup_delay_secs: self.startup_delay_secs,
                interval_secs: self.refresh_interval_secs,
                ..RefresherConfig::default()
            },
            solver: SolverConfig {
                operation_timeout_secs: self.operation_timeout_secs,
                cleanup_zone_policy: self.cleanup_zone_policy,
                ..SolverConfig::default()
            },
        }
    }
}

fn parse_secs(var: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            anyhow::anyhow!("{} must be a whole number of seconds. Got: '{}'", key, raw)
        }),
    }
}

//! DNS-01 challenge solver
//!
//! Orchestrates zone resolution and record management for the host
//! framework's present / clean-up lifecycle.
//!
//! ## Present
//!
//! ```text
//! resolved_zone ──strip "."──▶ zone ──resolve──▶ service ──(empty? abort)
//!                                                     │
//!                                decode config ◀──────┘
//!                                      │
//!                                      ▼
//!                    create TXT (fqdn, key, ttl) ──▶ commit
//! ```
//!
//! ## Clean-up
//!
//! ```text
//! resolved_zone ──strip "."──▶ zone ──resolve──▶ service (policy decides on failure)
//!                                                     │
//!         fqdn minus ".{zone}" ──lookup by name──▶ record id
//!                                                     │
//!                                decode config ──▶ delete ──▶ commit
//! ```
//!
//! Both entry points are one-shot: nothing is kept between invocations and
//! every step queries the provider fresh.

pub mod request;

pub use request::{ChallengeRequest, ProviderSolverConfig, SecretKeySelector};

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::{CleanupZonePolicy, SolverConfig};
use crate::error::{Error, Result};
use crate::traits::{CredentialStore, RecordManager, ResourceRecord, ZoneResolver};

/// Host-facing solver interface
///
/// The host framework calls `initialize` once, then `present` and `clean_up`
/// any number of times, possibly concurrently for different challenges.
///
/// # Cancellation
///
/// Dropping a `present` / `clean_up` future cancels the request in flight.
/// An edit the provider already accepted but did not yet commit stays
/// pending on the provider side.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Constant solver identifier
    fn name(&self) -> &str;

    /// Verify the solver can reach its credentials
    ///
    /// Takes no host client or stop channel: the credential store is injected
    /// at construction, and shutdown is handled by dropping in-flight futures.
    async fn initialize(&self) -> Result<()>;

    /// Publish the challenge TXT record
    async fn present(&self, request: &ChallengeRequest) -> Result<()>;

    /// Remove the challenge TXT record
    async fn clean_up(&self, request: &ChallengeRequest) -> Result<()>;
}

/// Solver for a provider addressed by (service, zone)
pub struct ChallengeSolver {
    name: String,
    store: Arc<dyn CredentialStore>,
    zones: Arc<dyn ZoneResolver>,
    records: Arc<dyn RecordManager>,
    config: SolverConfig,
}

impl ChallengeSolver {
    /// Create a solver
    ///
    /// The solver is named after the record manager's provider
    /// (e.g. "nicru-dns").
    pub fn new(
        store: Arc<dyn CredentialStore>,
        zones: Arc<dyn ZoneResolver>,
        records: Arc<dyn RecordManager>,
        config: SolverConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            name: format!("{}-dns", records.provider_name()),
            store,
            zones,
            records,
            config,
        })
    }

    /// Solver configuration
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    async fn present_inner(&self, request: &ChallengeRequest) -> Result<()> {
        let zone = request.zone_name()?;

        let service = self.zones.resolve(zone).await?;
        if service.is_empty() {
            return Err(Error::not_found(format!("no service owns zone {}", zone)));
        }

        info!(
            namespace = %request.resource_namespace,
            zone = %request.resolved_zone,
            fqdn = %request.resolved_fqdn,
            service = %service,
            "Presenting challenge"
        );

        let provider_config = ProviderSolverConfig::decode(request.raw_config.as_ref())?;
        debug!(config = ?provider_config, "Decoded provider configuration");

        let record = ResourceRecord::txt(
            request.resolved_fqdn.as_str(),
            self.config.record_ttl,
            request.key.as_str(),
        );
        let record_id = self.records.create(&service, zone, &record).await?;

        info!(
            fqdn = %request.resolved_fqdn,
            zone = %zone,
            record_id = %record_id,
            "Challenge record created and committed"
        );
        Ok(())
    }

    async fn clean_up_inner(&self, request: &ChallengeRequest) -> Result<()> {
        let zone = request.zone_name()?;
        let service = self.resolve_for_clean_up(zone).await?;

        let record_name = request.relative_record_name();
        let record_id = self.records.lookup(&service, zone, record_name).await?;

        let provider_config = ProviderSolverConfig::decode(request.raw_config.as_ref())?;
        debug!(config = ?provider_config, "Decoded provider configuration");

        info!(
            fqdn = %request.resolved_fqdn,
            zone = %request.resolved_zone,
            record_id = %record_id,
            "Cleaning up challenge"
        );

        self.records.delete(&service, zone, &record_id).await?;

        info!(record_id = %record_id, zone = %zone, "Challenge record deleted and committed");
        Ok(())
    }

    /// Resolve the service for clean-up under the configured policy
    async fn resolve_for_clean_up(&self, zone: &str) -> Result<String> {
        let outcome = self.zones.resolve(zone).await;

        match (outcome, self.config.cleanup_zone_policy) {
            (Ok(service), _) if !service.is_empty() => Ok(service),

            (Ok(_), CleanupZonePolicy::FailFast) => {
                Err(Error::not_found(format!("no service owns zone {}", zone)))
            }
            (Err(e), CleanupZonePolicy::FailFast) => Err(e),

            (Ok(_), CleanupZonePolicy::TolerateMissingZone) => {
                warn!(zone = %zone, "No service owns zone; continuing clean-up with empty service");
                Ok(String::new())
            }
            (Err(e), CleanupZonePolicy::TolerateMissingZone) => {
                warn!(
                    zone = %zone,
                    error = %e,
                    "Zone resolution failed; continuing clean-up with empty service"
                );
                Ok(String::new())
            }
        }
    }

    /// Run `operation` under the configured deadline
    async fn with_deadline<F>(&self, operation: &str, fut: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send,
    {
        let deadline = self.config.operation_timeout();
        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                error!(operation, deadline_secs = deadline.as_secs(), "Operation timed out");
                Err(Error::timeout(operation, deadline.as_secs()))
            }
        }
    }
}

#[async_trait]
impl Solver for ChallengeSolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<()> {
        let secret = self.store.get_secret().await?;

        if secret.field(crate::traits::ACCESS_TOKEN).is_empty() {
            warn!(
                secret = %secret.name,
                namespace = %secret.namespace,
                "Secret holds no access token yet; API calls will fail until the first refresh"
            );
        }

        info!(
            solver = %self.name,
            secret = %secret.name,
            namespace = %secret.namespace,
            "Solver initialized"
        );
        Ok(())
    }

    async fn present(&self, request: &ChallengeRequest) -> Result<()> {
        self.with_deadline("present", self.present_inner(request))
            .await
    }

    async fn clean_up(&self, request: &ChallengeRequest) -> Result<()> {
        self.with_deadline("clean-up", self.clean_up_inner(request))
            .await
    }
}

impl std::fmt::Debug for ChallengeSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeSolver")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

//! Token refresher
//!
//! Keeps the OAuth credentials valid by exchanging the stored refresh token
//! for a new pair on every scheduled tick and writing the result back to the
//! credential store.
//!
//! ## Tick Flow
//!
//! 1. Read the refresh token and app credentials from the store
//! 2. Call the token endpoint (refresh-token grant)
//! 3. On success, overwrite both token fields in one patch
//!
//! ## Best-Effort Policy
//!
//! A failed tick is logged and reported as [`RefreshEvent::RefreshFailed`];
//! nothing is written and nothing is retried. The next scheduled tick is the
//! retry. A revoked refresh token therefore fails every tick until an
//! operator reseeds the secret.
//!
//! ## Scheduling
//!
//! The refresher owns no timer. The composition root passes a
//! [`TickSource`] and a shutdown signal to [`TokenRefresher::run`].

pub mod interval;

pub use interval::IntervalTicks;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::RefresherConfig;
use crate::error::{Error, Result};
use crate::traits::{CredentialStore, Tick, TickSource, TokenEndpoint, TokenPair};

/// Events emitted by the TokenRefresher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// Refresher loop started
    Started,

    /// Token pair exchanged and persisted
    Refreshed {
        tick: u64,
        at: chrono::DateTime<chrono::Utc>,
    },

    /// Tick failed; store left untouched
    RefreshFailed { tick: u64, error: String },

    /// Refresher loop stopped
    Stopped { reason: String },
}

/// Periodic OAuth token refresher
pub struct TokenRefresher {
    store: Arc<dyn CredentialStore>,
    endpoint: Arc<dyn TokenEndpoint>,
    event_tx: mpsc::Sender<RefreshEvent>,
}

impl TokenRefresher {
    /// Create a new refresher
    ///
    /// # Returns
    ///
    /// A tuple of (refresher, event_receiver) where event_receiver yields refresher events
    pub fn new(
        store: Arc<dyn CredentialStore>,
        endpoint: Arc<dyn TokenEndpoint>,
        config: &RefresherConfig,
    ) -> Result<(Self, mpsc::Receiver<RefreshEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let refresher = Self {
            store,
            endpoint,
            event_tx: tx,
        };

        Ok((refresher, rx))
    }

    /// Exchange the stored refresh token once and persist the new pair
    ///
    /// The store is written only after the endpoint returned a complete pair;
    /// any earlier failure leaves it untouched.
    pub async fn refresh_once(&self) -> Result<TokenPair> {
        let current = self.store.token_pair().await?;
        if current.refresh_token.is_empty() {
            return Err(Error::credential_store(
                "REFRESH_TOKEN is empty; reseed the secret",
            ));
        }

        let app = self.store.app_credentials().await?;

        let pair = self.endpoint.refresh(&app, &current.refresh_token).await?;

        self.store
            .store_token_pair(&pair)
            .await
            .map_err(|e| Error::credential_store(format!("Failed to update the secret: {}", e)))?;

        Ok(pair)
    }

    /// Run the refresher until `shutdown` fires or the schedule ends
    ///
    /// A dropped shutdown sender counts as a shutdown signal. A refresh in
    /// progress when the signal arrives completes first.
    pub async fn run(&self, schedule: &dyn TickSource, mut shutdown: oneshot::Receiver<()>) {
        self.emit_event(RefreshEvent::Started);
        info!("Token refresher started");

        let mut ticks = schedule.ticks();

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping token refresher");
                    self.emit_event(RefreshEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }

                tick = ticks.next() => {
                    match tick {
                        Some(tick) => self.handle_tick(tick).await,
                        None => {
                            warn!("Refresh schedule ended, stopping token refresher");
                            self.emit_event(RefreshEvent::Stopped {
                                reason: "Schedule ended".to_string(),
                            });
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Handle one tick under the best-effort policy
    async fn handle_tick(&self, tick: Tick) {
        debug!(tick = tick.seq, "Refreshing token pair");

        match self.refresh_once().await {
            Ok(_) => {
                info!(tick = tick.seq, "Token pair refreshed");
                self.emit_event(RefreshEvent::Refreshed {
                    tick: tick.seq,
                    at: chrono::Utc::now(),
                });
            }
            Err(e) => {
                error!(
                    tick = tick.seq,
                    error = %e,
                    "Token refresh failed; the next scheduled tick will retry"
                );
                self.emit_event(RefreshEvent::RefreshFailed {
                    tick: tick.seq,
                    error: e.to_string(),
                });
            }
        }
    }

    fn emit_event(&self, event: RefreshEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Refresher event channel full or closed, dropping event");
        }
    }
}

//! OAuth token endpoint trait
//!
//! The token refresher exchanges the current refresh token for a new pair
//! through this interface. Implementations perform exactly one request per
//! call and never retry; the next scheduled tick is the retry mechanism.

use async_trait::async_trait;

use crate::traits::credential_store::{AppCredentials, TokenPair};

/// Trait for OAuth identity endpoints supporting the refresh-token grant
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange `refresh_token` for a new token pair
    ///
    /// # Returns
    ///
    /// - `Ok(TokenPair)`: The pair exactly as returned by the endpoint
    /// - `Err(Error)`: Transport failure, non-200 status or malformed body
    async fn refresh(
        &self,
        app: &AppCredentials,
        refresh_token: &str,
    ) -> Result<TokenPair, crate::Error>;
}

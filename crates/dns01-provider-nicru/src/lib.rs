// # nic.ru DNS-master Provider
//
// This crate implements the provider-facing traits of `dns01-core` against the
// nic.ru REST/XML API:
//
// - `ZoneResolver`: zone name → owning service
// - `RecordManager`: create / look up / delete records, commit zones
// - `TokenEndpoint`: OAuth refresh-token grant
//
// ## Behaviour
//
// - One HTTP request per operation, plus the commit that follows a create
//   or delete. No retries and no caching; the caller owns both.
// - The access token is read from the credential store on every call, so a
//   pair written by the refresher is picked up by the next request.
// - A response is a success only when its XML status is exactly "success",
//   whatever the HTTP status.
// - Every request carries the configured HTTP timeout.
//
// ## Security Requirements
//
// - Tokens and app secrets NEVER appear in logs or `Debug` output
// - The zone listing is the one call that authenticates with a `token`
//   query parameter instead of the Authorization header
//
// ## API Reference
//
// - List zones:     GET    `dns-master/zones/?token=..`
// - List records:   GET    `dns-master/services/:service/zones/:zone/records`
// - Create records: PUT    `dns-master/services/:service/zones/:zone/records`
// - Delete record:  DELETE `dns-master/services/:service/zones/:zone/records/:id`
// - Commit zone:    POST   `dns-master/services/:service/zones/:zone/commit`
// - Refresh token:  POST   `oauth/token` (form encoded, JSON response)

pub mod xml;

use async_trait::async_trait;
use dns01_core::config::ProviderConfig;
use dns01_core::traits::{
    AppCredentials, CredentialStore, RecordManager, ResourceRecord, TokenEndpoint, TokenPair,
    ZoneResolver,
};
use dns01_core::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::xml::{RecordRequest, Response};

/// Default API base URL
pub const NICRU_API_BASE: &str = "https://api.nic.ru/";

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider name reported through `RecordManager::provider_name`
pub const PROVIDER_NAME: &str = "nicru";

// The API accepts XML bodies under this content type
const REQUEST_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Client for the nic.ru DNS-master and OAuth endpoints
///
/// Stateless apart from the HTTP connection pool; clones share the pool and
/// the credential store.
#[derive(Clone)]
pub struct NicruClient {
    /// Base URL, always ending in '/'
    base_url: String,

    /// HTTP client with the request timeout applied
    client: reqwest::Client,

    /// Source of the access token, read per request
    store: Arc<dyn CredentialStore>,
}

// Custom Debug implementation that leaves out the credential store
impl std::fmt::Debug for NicruClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NicruClient")
            .field("base_url", &self.base_url)
            .field("store", &"<credential store>")
            .finish()
    }
}

impl NicruClient {
    /// Create a client
    ///
    /// # Parameters
    ///
    /// - `base_url`: API root (e.g. "https://api.nic.ru/"); a missing
    ///   trailing '/' is added
    /// - `request_timeout`: Per-request HTTP timeout
    /// - `store`: Credential store holding the access token
    ///
    /// # Errors
    ///
    /// `Config` if the URL is not http(s) or the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let mut base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            client,
            store,
        })
    }

    /// Create a client from provider configuration
    pub fn from_config(config: &ProviderConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;

        match config {
            ProviderConfig::Nicru {
                api_base_url,
                request_timeout_secs,
            } => Self::new(
                api_base_url.clone(),
                Duration::from_secs(*request_timeout_secs),
                store,
            ),
        }
    }

    /// API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn zone_url(&self, service: &str, zone: &str, suffix: &str) -> String {
        self.url(&format!(
            "dns-master/services/{}/zones/{}/{}",
            service, zone, suffix
        ))
    }

    /// Send a request and return the body of a 2xx response
    ///
    /// Transport errors are formatted without the request URL, which carries
    /// the access token for the zone listing.
    async fn send(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::transport(format!("{}: request timed out", operation))
            } else {
                Error::transport(format!(
                    "{}: request failed: {}",
                    operation,
                    e.without_url()
                ))
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::transport(format!(
                "{}: failed to read body: {}",
                operation,
                e.without_url()
            ))
        })?;

        if !status.is_success() {
            return Err(status_error(operation, status, &body));
        }

        Ok(body)
    }

    /// Send an authenticated DNS-master request and check the XML status
    async fn call(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<Response> {
        let access_token = self.store.access_token().await?;
        let body = self
            .send(operation, request.bearer_auth(access_token))
            .await?;

        Response::parse(operation, &body)?.ensure_success(operation)
    }
}

/// Map a non-2xx HTTP status to an error
fn status_error(operation: &str, status: StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: token rejected or insufficient permissions. Status: {}",
            operation, status
        )),
        429 => Error::rate_limited(format!(
            "{}: rate limit exceeded. Status: {}",
            operation, status
        )),
        _ => Error::protocol(operation, format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl ZoneResolver for NicruClient {
    /// Resolve the service owning `zone_name`
    ///
    /// ```http
    /// GET /dns-master/zones/?token=<access token>
    /// ```
    ///
    /// When several zones carry the name, the one listed last wins.
    async fn resolve(&self, zone_name: &str) -> Result<String> {
        const OPERATION: &str = "list zones";

        let access_token = self.store.access_token().await?;
        let request = self
            .client
            .get(self.url("dns-master/zones/"))
            .query(&[("token", access_token.as_str())]);

        let body = self.send(OPERATION, request).await?;
        let zones = Response::parse(OPERATION, &body)?
            .ensure_success(OPERATION)?
            .into_zones();

        let service = zones
            .into_iter()
            .filter(|z| z.name == zone_name)
            .last()
            .map(|z| z.service)
            .unwrap_or_default();

        if service.is_empty() {
            tracing::debug!(zone = %zone_name, "No service owns zone");
        } else {
            tracing::info!(zone = %zone_name, service = %service, "Resolved zone service");
        }
        Ok(service)
    }
}

#[async_trait]
impl RecordManager for NicruClient {
    /// Create one record, then commit the zone
    ///
    /// ```http
    /// PUT /dns-master/services/:service/zones/:zone/records
    /// Authorization: Bearer <token>
    ///
    /// <request><rr-list><rr>..</rr></rr-list></request>
    /// ```
    async fn create(&self, service: &str, zone: &str, record: &ResourceRecord) -> Result<String> {
        const OPERATION: &str = "create record";

        let payload = RecordRequest::single(record).to_xml()?;
        tracing::debug!(
            service = %service,
            zone = %zone,
            name = %record.name,
            ttl = record.ttl,
            "Creating record"
        );

        let request = self
            .client
            .put(self.zone_url(service, zone, "records"))
            .header(reqwest::header::CONTENT_TYPE, REQUEST_CONTENT_TYPE)
            .body(payload);

        let zones = self.call(OPERATION, request).await?.into_zones();

        let first_zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::protocol(OPERATION, "response lists no zone"))?;
        let record_id = first_zone
            .records
            .into_iter()
            .next()
            .map(|rr| rr.id)
            .ok_or_else(|| Error::protocol(OPERATION, "response lists no record"))?;
        if record_id.is_empty() {
            return Err(Error::protocol(OPERATION, "created record carries no id"));
        }

        self.commit(service, zone).await?;

        tracing::info!(zone = %zone, record_id = %record_id, "Record created");
        Ok(record_id)
    }

    /// Find a record id by exact name
    ///
    /// ```http
    /// GET /dns-master/services/:service/zones/:zone/records
    /// Authorization: Bearer <token>
    /// ```
    async fn lookup(&self, service: &str, zone: &str, record_name: &str) -> Result<String> {
        const OPERATION: &str = "list records";

        let request = self.client.get(self.zone_url(service, zone, "records"));
        let zones = self.call(OPERATION, request).await?.into_zones();

        // Full scan: with duplicate names the last one listed wins
        let record_id = zones
            .into_iter()
            .flat_map(|z| z.records)
            .filter(|rr| rr.name == record_name)
            .last()
            .map(|rr| rr.id)
            .ok_or_else(|| {
                Error::not_found(format!("record {} in zone {}", record_name, zone))
            })?;

        tracing::debug!(zone = %zone, name = %record_name, record_id = %record_id, "Found record");
        Ok(record_id)
    }

    /// Delete one record, then commit the zone
    ///
    /// ```http
    /// DELETE /dns-master/services/:service/zones/:zone/records/:id
    /// Authorization: Bearer <token>
    /// ```
    async fn delete(&self, service: &str, zone: &str, record_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.zone_url(service, zone, &format!("records/{}", record_id)));
        self.call("delete record", request).await?;

        self.commit(service, zone).await?;

        tracing::info!(zone = %zone, record_id = %record_id, "Record deleted");
        Ok(())
    }

    /// Commit pending edits
    ///
    /// ```http
    /// POST /dns-master/services/:service/zones/:zone/commit
    /// Authorization: Bearer <token>
    /// ```
    async fn commit(&self, service: &str, zone: &str) -> Result<()> {
        let request = self
            .client
            .post(self.zone_url(service, zone, "commit"))
            .header(reqwest::header::CONTENT_TYPE, REQUEST_CONTENT_TYPE);
        self.call("commit zone", request).await?;

        tracing::debug!(service = %service, zone = %zone, "Zone committed");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Token endpoint response body
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[async_trait]
impl TokenEndpoint for NicruClient {
    /// Exchange `refresh_token` for a new pair
    ///
    /// ```http
    /// POST /oauth/token
    /// Content-Type: application/x-www-form-urlencoded
    ///
    /// grant_type=refresh_token&refresh_token=..&client_id=..&client_secret=..
    /// ```
    ///
    /// Only HTTP 200 counts as success.
    async fn refresh(&self, app: &AppCredentials, refresh_token: &str) -> Result<TokenPair> {
        const OPERATION: &str = "refresh token";

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", app.app_id.as_str()),
            ("client_secret", app.app_secret.as_str()),
        ];

        let response = self
            .client
            .post(self.url("oauth/token"))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{}: request failed: {}", OPERATION, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("{}: failed to read body: {}", OPERATION, e)))?;

        if status != StatusCode::OK {
            return Err(status_error(OPERATION, status, &body));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::protocol(OPERATION, format!("malformed token response: {}", e)))?;

        if token.access_token.is_empty() || token.refresh_token.is_empty() {
            return Err(Error::protocol(OPERATION, "token response carries an empty token"));
        }

        tracing::debug!(expires_in = ?token.expires_in, "Token pair issued");
        Ok(TokenPair::new(token.access_token, token.refresh_token))
    }
}

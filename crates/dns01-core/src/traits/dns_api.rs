// # DNS API Traits
//
// Defines the interface to the provider's zone and record endpoints.
//
// ## Implementations
//
// - NIC.RU DNS-master API: `dns01-provider-nicru` crate
//
// ## Addressing
//
// Zone-scoped endpoints are addressed by the pair (service, zone). The
// service is a provider-internal identifier obtained from [`ZoneResolver`].
// Record ids are assigned by the provider on creation and are needed for
// deletion; clean-up runs in a separate invocation, so ids are looked up by
// name rather than remembered.

use async_trait::async_trait;

/// Record type used for DNS-01 challenges
pub const TXT_RECORD_TYPE: &str = "TXT";

/// A single resource record as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Provider-assigned id (empty for records not yet created)
    pub id: String,
    /// Record name as the provider reports it
    pub name: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Record type (e.g. "TXT")
    pub record_type: String,
    /// Record payload (the TXT string for TXT records)
    pub payload: String,
}

impl ResourceRecord {
    /// Create a TXT record descriptor for submission
    pub fn txt(name: impl Into<String>, ttl: u32, value: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            ttl,
            record_type: TXT_RECORD_TYPE.to_string(),
            payload: value.into(),
        }
    }
}

/// A zone as reported by the provider
///
/// Reconstructed from every response; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Zone {
    /// Zone name without trailing dot (e.g. "example.com")
    pub name: String,
    /// Service owning the zone
    pub service: String,
    /// Records in response order
    pub records: Vec<ResourceRecord>,
}

/// Maps a zone name to the service that owns it
#[async_trait]
pub trait ZoneResolver: Send + Sync {
    /// Resolve the service owning `zone_name`
    ///
    /// # Returns
    ///
    /// - `Ok(service)`: The owning service
    /// - `Ok(String::new())`: No zone with that exact name is listed
    /// - `Err(Error)`: Transport, protocol or credential store failure
    ///
    /// An empty service is not an error here; callers decide whether a
    /// missing zone aborts (see `CleanupZonePolicy`).
    async fn resolve(&self, zone_name: &str) -> Result<String, crate::Error>;
}

/// Creates, looks up and deletes records inside a zone
///
/// # Status Handling
///
/// A response whose provider status is not exactly "success" is a failure
/// even when the HTTP status is 200.
///
/// # Commit Semantics
///
/// Edits are pending until committed. `create` and `delete` commit on
/// success before returning, so a successful return means the edit is live.
#[async_trait]
pub trait RecordManager: Send + Sync {
    /// Create `record` in the zone, commit, and return the new record id
    ///
    /// Fails if the response lists no zone or no record, even when the
    /// provider status is "success".
    async fn create(
        &self,
        service: &str,
        zone: &str,
        record: &ResourceRecord,
    ) -> Result<String, crate::Error>;

    /// Find the id of the record named `record_name`
    ///
    /// All zones and records in the response are scanned. When several
    /// records share the name, the one listed last wins.
    async fn lookup(
        &self,
        service: &str,
        zone: &str,
        record_name: &str,
    ) -> Result<String, crate::Error>;

    /// Delete the record with `record_id`, then commit
    async fn delete(&self, service: &str, zone: &str, record_id: &str)
    -> Result<(), crate::Error>;

    /// Make pending edits of the zone live
    async fn commit(&self, service: &str, zone: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txt_descriptor() {
        let rr = ResourceRecord::txt("_acme-challenge.example.com.", 60, "abc123");
        assert_eq!(rr.record_type, "TXT");
        assert_eq!(rr.ttl, 60);
        assert!(rr.id.is_empty());
        assert_eq!(rr.payload, "abc123");
    }
}

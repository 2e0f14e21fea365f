//! Test doubles and common utilities for contract tests
//!
//! These doubles model the provider closely enough to check orchestration
//! (call order, commit placement, tie-breaks) without any network.

#![allow(dead_code)]

use dns01_core::error::{Error, Result};
use dns01_core::traits::{
    ACCESS_TOKEN, APP_ID, APP_SECRET, AppCredentials, CredentialStore, REFRESH_TOKEN,
    RecordManager, ResourceRecord, Secret, Tick, TickSource, TokenEndpoint, TokenPair,
    ZoneResolver,
};
use dns01_core::MemoryCredentialStore;
use std::collections::{BTreeMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// One call observed by [`FakeDnsApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Resolve { zone: String },
    Create { service: String, zone: String, name: String, ttl: u32, payload: String },
    Lookup { service: String, zone: String, name: String },
    Delete { service: String, zone: String, id: String },
    Commit { service: String, zone: String },
}

#[derive(Debug, Clone)]
struct FakeZone {
    name: String,
    service: String,
    records: Vec<ResourceRecord>,
}

/// In-memory provider implementing both DNS API traits
///
/// Created names are reported back relative to the zone, the way the
/// provider lists them.
#[derive(Clone)]
pub struct FakeDnsApi {
    zones: Arc<Mutex<Vec<FakeZone>>>,
    calls: Arc<Mutex<Vec<ApiCall>>>,
    next_id: Arc<AtomicUsize>,
    fail_resolve: Arc<AtomicBool>,
    empty_create_response: Arc<AtomicBool>,
    resolve_delay: Arc<Mutex<Option<Duration>>>,
}

impl FakeDnsApi {
    pub fn new() -> Self {
        Self {
            zones: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicUsize::new(1000)),
            fail_resolve: Arc::new(AtomicBool::new(false)),
            empty_create_response: Arc::new(AtomicBool::new(false)),
            resolve_delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Add a zone owned by `service`
    pub fn with_zone(self, zone: &str, service: &str) -> Self {
        self.zones.lock().unwrap().push(FakeZone {
            name: zone.to_string(),
            service: service.to_string(),
            records: Vec::new(),
        });
        self
    }

    /// Add an existing record to `zone`
    pub fn with_record(self, zone: &str, id: &str, name: &str, payload: &str) -> Self {
        {
            let mut zones = self.zones.lock().unwrap();
            let target = zones
                .iter_mut()
                .find(|z| z.name == zone)
                .expect("zone added before its records");
            target.records.push(ResourceRecord {
                id: id.to_string(),
                name: name.to_string(),
                ttl: 60,
                record_type: "TXT".to_string(),
                payload: payload.to_string(),
            });
        }
        self
    }

    /// Make every resolve call fail with a transport error
    pub fn failing_resolve(self) -> Self {
        self.fail_resolve.store(true, Ordering::SeqCst);
        self
    }

    /// Answer create with a "success" status but no record
    pub fn empty_create_response(self) -> Self {
        self.empty_create_response.store(true, Ordering::SeqCst);
        self
    }

    /// Delay every resolve call
    pub fn slow_resolve(self, delay: Duration) -> Self {
        *self.resolve_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commit_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ApiCall::Commit { .. }))
            .count()
    }

    /// Records currently in `zone`
    pub fn records(&self, zone: &str) -> Vec<ResourceRecord> {
        self.zones
            .lock()
            .unwrap()
            .iter()
            .filter(|z| z.name == zone)
            .flat_map(|z| z.records.clone())
            .collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn relative_name(name: &str, zone: &str) -> String {
        let dotted = format!(".{}.", zone);
        let undotted = format!(".{}", zone);
        name.strip_suffix(dotted.as_str())
            .or_else(|| name.strip_suffix(undotted.as_str()))
            .unwrap_or(name)
            .to_string()
    }
}

#[async_trait::async_trait]
impl ZoneResolver for FakeDnsApi {
    async fn resolve(&self, zone_name: &str) -> Result<String> {
        self.record(ApiCall::Resolve {
            zone: zone_name.to_string(),
        });

        let delay = *self.resolve_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_resolve.load(Ordering::SeqCst) {
            return Err(Error::transport("connection refused"));
        }

        Ok(self
            .zones
            .lock()
            .unwrap()
            .iter()
            .find(|z| z.name == zone_name)
            .map(|z| z.service.clone())
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl RecordManager for FakeDnsApi {
    async fn create(&self, service: &str, zone: &str, record: &ResourceRecord) -> Result<String> {
        self.record(ApiCall::Create {
            service: service.to_string(),
            zone: zone.to_string(),
            name: record.name.clone(),
            ttl: record.ttl,
            payload: record.payload.clone(),
        });

        if self.empty_create_response.load(Ordering::SeqCst) {
            return Err(Error::protocol("create record", "response lists no records"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        {
            let mut zones = self.zones.lock().unwrap();
            let target = zones
                .iter_mut()
                .find(|z| z.name == zone && z.service == service)
                .ok_or_else(|| Error::protocol("create record", "zone not found"))?;
            target.records.push(ResourceRecord {
                id: id.clone(),
                name: Self::relative_name(&record.name, zone),
                ..record.clone()
            });
        }

        self.commit(service, zone).await?;
        Ok(id)
    }

    async fn lookup(&self, service: &str, zone: &str, record_name: &str) -> Result<String> {
        self.record(ApiCall::Lookup {
            service: service.to_string(),
            zone: zone.to_string(),
            name: record_name.to_string(),
        });

        let zones = self.zones.lock().unwrap();
        let target = zones
            .iter()
            .find(|z| z.name == zone && z.service == service)
            .ok_or_else(|| Error::protocol("list records", "zone not found"))?;

        target
            .records
            .iter()
            .filter(|r| r.name == record_name)
            .last()
            .map(|r| r.id.clone())
            .ok_or_else(|| Error::not_found(format!("record {} not found", record_name)))
    }

    async fn delete(&self, service: &str, zone: &str, record_id: &str) -> Result<()> {
        self.record(ApiCall::Delete {
            service: service.to_string(),
            zone: zone.to_string(),
            id: record_id.to_string(),
        });

        {
            let mut zones = self.zones.lock().unwrap();
            let target = zones
                .iter_mut()
                .find(|z| z.name == zone && z.service == service)
                .ok_or_else(|| Error::protocol("delete record", "zone not found"))?;
            target.records.retain(|r| r.id != record_id);
        }

        self.commit(service, zone).await
    }

    async fn commit(&self, service: &str, zone: &str) -> Result<()> {
        self.record(ApiCall::Commit {
            service: service.to_string(),
            zone: zone.to_string(),
        });
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "nicru"
    }
}

/// Schedule driven by the test
pub struct ControlledTicks {
    rx: Mutex<Option<mpsc::UnboundedReceiver<Tick>>>,
}

impl ControlledTicks {
    pub fn new() -> (Self, mpsc::UnboundedSender<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl TickSource for ControlledTicks {
    fn ticks(&self) -> Pin<Box<dyn Stream<Item = Tick> + Send + 'static>> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .expect("ticks() can only be called once");
        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

/// Token endpoint answering from a script, one entry per call
pub struct ScriptedTokenEndpoint {
    script: Mutex<VecDeque<Result<TokenPair>>>,
    seen: Mutex<Vec<(AppCredentials, String)>>,
}

impl ScriptedTokenEndpoint {
    pub fn new(script: Vec<Result<TokenPair>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Refresh tokens sent, in call order
    pub fn refresh_tokens_sent(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }

    pub fn app_ids_sent(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(app, _)| app.app_id.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl TokenEndpoint for ScriptedTokenEndpoint {
    async fn refresh(&self, app: &AppCredentials, refresh_token: &str) -> Result<TokenPair> {
        self.seen
            .lock()
            .unwrap()
            .push((app.clone(), refresh_token.to_string()));

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::protocol("refresh token", "script exhausted")))
    }
}

/// Credential store wrapper counting patches
#[derive(Clone)]
pub struct CountingCredentialStore {
    inner: MemoryCredentialStore,
    patch_count: Arc<AtomicUsize>,
}

impl CountingCredentialStore {
    pub fn new(inner: MemoryCredentialStore) -> Self {
        Self {
            inner,
            patch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn patch_count(&self) -> usize {
        self.patch_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CredentialStore for CountingCredentialStore {
    async fn get_secret(&self) -> Result<Secret> {
        self.inner.get_secret().await
    }

    async fn patch_secret(&self, fields: BTreeMap<String, String>) -> Result<()> {
        self.patch_count.fetch_add(1, Ordering::SeqCst);
        self.inner.patch_secret(fields).await
    }
}

/// Secret seeded the way an operator seeds it
pub fn seeded_secret(refresh_token: &str) -> Secret {
    Secret::new("nicru-tokens", "cert-manager")
        .with_field(APP_ID, "app-id")
        .with_field(APP_SECRET, "app-secret")
        .with_field(ACCESS_TOKEN, "access-0")
        .with_field(REFRESH_TOKEN, refresh_token)
}

pub fn seeded_store(refresh_token: &str) -> CountingCredentialStore {
    CountingCredentialStore::new(MemoryCredentialStore::new(seeded_secret(refresh_token)))
}

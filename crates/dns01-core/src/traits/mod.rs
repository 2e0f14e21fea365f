//! Core traits for the DNS-01 solver
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`CredentialStore`]: Persisted secret with app credentials and tokens
//! - [`ZoneResolver`]: Zone name → owning service
//! - [`RecordManager`]: Record create/lookup/delete and zone commit
//! - [`TokenEndpoint`]: OAuth refresh-token grant
//! - [`TickSource`]: Schedule driving the token refresher

pub mod credential_store;
pub mod dns_api;
pub mod tick_source;
pub mod token_endpoint;

pub use credential_store::{
    ACCESS_TOKEN, APP_ID, APP_SECRET, AppCredentials, CredentialStore, REFRESH_TOKEN, Secret,
    TokenPair,
};
pub use dns_api::{RecordManager, ResourceRecord, TXT_RECORD_TYPE, Zone, ZoneResolver};
pub use tick_source::{Tick, TickSource};
pub use token_endpoint::TokenEndpoint;

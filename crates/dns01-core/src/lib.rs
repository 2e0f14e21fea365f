// # dns01-core
//
// Core library for the nic.ru DNS-01 challenge solver.
//
// ## Architecture Overview
//
// This library provides the provider-agnostic half of the system:
// - **CredentialStore**: Trait for the shared secret holding app credentials and tokens
// - **ZoneResolver / RecordManager**: Traits for the provider's zone and record endpoints
// - **TokenEndpoint**: Trait for the OAuth refresh-token grant
// - **TickSource**: Trait for the refresher's schedule
// - **TokenRefresher**: Periodic token exchange, writing results back to the store
// - **ChallengeSolver**: Present / clean-up orchestration for the host framework
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Orchestration is separate from the provider wire format
// 2. **Stateless Solver**: Every invocation re-reads the store and re-queries the provider
// 3. **Single Writer**: Only the refresher writes the token fields
// 4. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod config;
pub mod error;
pub mod credentials;
pub mod refresher;
pub mod solver;

// Re-export core types for convenience
pub use traits::{CredentialStore, RecordManager, TickSource, TokenEndpoint, ZoneResolver};
pub use refresher::{IntervalTicks, RefreshEvent, TokenRefresher};
pub use solver::{ChallengeRequest, ChallengeSolver, Solver};
pub use config::{CleanupZonePolicy, Dns01Config, ProviderConfig};
pub use error::{Error, Result};
pub use credentials::{FileCredentialStore, MemoryCredentialStore};

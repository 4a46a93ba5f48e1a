//! # CSIS Server Core
//!
//! Server side of the Coordinated Set Identification Service: lets a device
//! announce membership of a coordinated set (earbud pairs, speaker arrays),
//! arbitrate a set-wide lock between remote clients, and hand out the Set
//! Identity Resolving Key.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): lock arbitration, client registry, SIRK
//!   distribution, RSI codec. Pure, no I/O
//! - **Ports Layer** (`ports/`): the inbound API and the outbound transport,
//!   crypto, identity and timer traits
//! - **Context** (`context.rs`): lock and encryption slot shared by every
//!   instance on the device
//! - **Service Layer** (`service.rs`): wires domain logic to ports
//! - **Adapters** (`adapters/`): tokio lease timer, software crypto gateway
//!   and the event loop
//!
//! ## Guarantees
//!
//! | Property | Where |
//! |----------|-------|
//! | At most one lock holder per device | `SetContext` |
//! | Lease is cancelled before any re-arm | `SetContext::apply_lease` |
//! | Stale lease expiries are ignored | `LockManager::expire` |
//! | At most one AES request in flight | `EncryptionSlot` |
//! | Requester is not notified of its own lock change | `CoordinatedSetService` |
//! | SIRK never logged | `Sirk` `Debug` impl |
//!
//! ## Wire Byte Order
//!
//! SIRK and AES blocks travel most significant byte first; the RSI is
//! advertised least significant byte first.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod context;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::{event_channel, CsisRuntime, LocalCryptoGateway, ServiceEvent, TokioLeaseTimer};
pub use context::{SetContext, SharedSetContext};
pub use domain::{
    parse_sirk, ClientConfig, ConfigError, CsisConfig, CsisError, IdentityChanges, LeaseId,
    LockState, Prand, Rsi, RsiCodec, SetIdentity, Sirk,
};
pub use metrics::{Metrics, MetricsSnapshot};
pub use ports::inbound::CoordinatedSetApi;
pub use ports::outbound::{
    CryptoGateway, EncryptRequest, EncryptionCompletion, GattTransport, IdentityResolver,
    LeaseTimer,
};
pub use service::{CoordinatedSetService, ServiceDependencies};

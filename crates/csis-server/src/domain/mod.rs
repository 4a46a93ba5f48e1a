//! Domain layer for the CSIS server.
//!
//! Pure state and decisions: nothing here performs I/O or owns a timer.

pub mod config;
pub mod entities;
pub mod errors;
pub mod lock;
pub mod registry;
pub mod rsi;
pub mod sirk;

pub use config::{parse_sirk, validate_membership, ConfigError, CsisConfig};
pub use entities::*;
pub use errors::CsisError;
pub use lock::{LeaseChange, LeaseExpiry, LockDecision, LockEffect, LockManager, LockOutcome};
pub use registry::{CccUpdate, ClientRegistry};
pub use rsi::{Prand, Rsi, RsiCodec};
pub use sirk::{EncryptionSlot, IdentityChanges, SirkDistributor, SirkFanOut, SirkRead, SirkValue};

//! # Adapter Implementations
//!
//! Concrete adapters for the outbound ports that need a runtime, plus the
//! event loop that drives service instances.
//!
//! ```text
//!  GATT dispatch ──┐
//!                  │   ServiceEvent    ┌────────────┐
//!  LocalCrypto ────┼──────────────────►│ CsisRuntime│──► CoordinatedSetService(s)
//!                  │    (mpsc)         └────────────┘
//!  TokioLeaseTimer ┘
//! ```
//!
//! Every completion re-enters through the same channel, so all state changes
//! happen on the runtime task.

pub mod crypto;
pub mod runtime;
pub mod timer;

pub use crypto::LocalCryptoGateway;
pub use runtime::{event_channel, CsisRuntime, ServiceEvent, DEFAULT_EVENT_CAPACITY};
pub use timer::TokioLeaseTimer;

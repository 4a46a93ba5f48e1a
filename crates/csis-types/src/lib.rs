//! # CSIS Types Crate
//!
//! Value types shared by the Coordinated Set Identification Service crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identifiers, characteristic values and status
//!   codes used by more than one crate are defined here.
//! - **Wire Fidelity**: every type that crosses the GATT boundary knows its own
//!   encoding (`LockValue::to_wire`, `AttStatus::code`, ...).
//! - **No Transport Knowledge**: nothing here depends on how ATT PDUs are framed.

pub mod entities;
pub mod status;
pub mod wire;

pub use entities::*;
pub use status::AttStatus;

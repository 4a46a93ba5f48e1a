//! # CSIS Test Suite
//!
//! End-to-end tests driving one or more service instances through the real
//! runtime, lease timer and crypto gateway.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Recording transport, identity table, device fixture
//! └── integration/
//!     ├── lock_flows.rs # Lock arbitration and lease expiry
//!     ├── sirk_flows.rs # SIRK reads and change notifications
//!     └── advertising.rs# RSI generation and resolution
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p csis-tests
//!
//! # By category
//! cargo test -p csis-tests integration::lock_flows::
//!
//! # Benchmarks
//! cargo bench -p csis-tests
//! ```

#![allow(dead_code)]

pub mod integration;
pub mod support;

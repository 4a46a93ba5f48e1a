//! # CSIS Telemetry
//!
//! Log output for the CSIS server.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use csis_telemetry::{init_tracing, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_tracing(&config).expect("Failed to init tracing");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `csis-server` | Service name attached to the startup record |
//! | `CSIS_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `CSIS_CONSOLE_OUTPUT` | `true` | Write formatted records to stdout |
//! | `CSIS_JSON_LOGS` | `false` (`true` in containers) | JSON instead of pretty output |

#![warn(missing_docs)]

mod config;
mod logging;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed (usually: already set).
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    /// The log level directive could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

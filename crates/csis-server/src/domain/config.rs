//! CSIS server configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use csis_server::domain::CsisConfig;
//!
//! let config = CsisConfig::default()
//!     .with_set(2, 1)
//!     .with_sirk_hex("457d7d0921a1fd22cecd8c86dd72cccd");
//! let identity = config.identity().expect("valid config");
//! ```

use super::entities::{SetIdentity, Sirk};
use csis_types::{wire, SharingMode};
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A field is out of range
    #[error("Invalid {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// SIRK is not 32 hex digits
    #[error("Invalid SIRK: {0}")]
    InvalidSirk(String),

    /// An environment variable could not be parsed
    #[error("Invalid environment variable {var}={value}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },
}

/// Check set size and rank: size at least 1, rank within `1..=size`.
pub fn validate_membership(size: u8, rank: u8) -> Result<(), ConfigError> {
    if size == 0 {
        return Err(ConfigError::InvalidValue {
            field: "size",
            reason: "must be at least 1".to_string(),
        });
    }

    if rank == 0 || rank > size {
        return Err(ConfigError::InvalidValue {
            field: "rank",
            reason: format!("must be between 1 and size ({size})"),
        });
    }

    Ok(())
}

/// Configuration of one CSIS service instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsisConfig {
    /// Registry capacity
    pub max_connections: usize,
    /// Lease length for remote lock holders, seconds
    pub lock_timeout_secs: u16,
    /// How the SIRK is shared over GATT
    pub sharing_mode: SharingMode,
    /// Number of set members
    pub size: u8,
    /// This member's rank
    pub rank: u8,
    /// SIRK as 32 hex digits, most significant first. `None` generates one.
    pub sirk: Option<String>,
}

impl Default for CsisConfig {
    fn default() -> Self {
        Self {
            max_connections: 3,
            lock_timeout_secs: 60,
            sharing_mode: SharingMode::EncryptedOnly,
            size: 2,
            rank: 1,
            sirk: None,
        }
    }
}

impl CsisConfig {
    /// Load from `CSIS_*` environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `CSIS_MAX_CONNECTIONS`: registry capacity (default: 3)
    /// - `CSIS_LOCK_TIMEOUT_SECS`: lease length (default: 60)
    /// - `CSIS_SHARING_MODE`: `plaintext`, `encrypted` or `oob` (default: encrypted)
    /// - `CSIS_SET_SIZE`: set size (default: 2)
    /// - `CSIS_SET_RANK`: rank (default: 1)
    /// - `CSIS_SIRK`: 32 hex digits (default: random)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_connections: parse_env("CSIS_MAX_CONNECTIONS", defaults.max_connections)?,
            lock_timeout_secs: parse_env("CSIS_LOCK_TIMEOUT_SECS", defaults.lock_timeout_secs)?,
            sharing_mode: parse_env("CSIS_SHARING_MODE", defaults.sharing_mode)?,
            size: parse_env("CSIS_SET_SIZE", defaults.size)?,
            rank: parse_env("CSIS_SET_RANK", defaults.rank)?,
            sirk: env::var("CSIS_SIRK").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate ranges and the SIRK encoding.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_connections",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.lock_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lock_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }

        validate_membership(self.size, self.rank)?;

        if let Some(hex) = &self.sirk {
            parse_sirk(hex)?;
        }

        Ok(())
    }

    /// Build the set identity, generating a SIRK if none is configured.
    pub fn identity(&self) -> Result<SetIdentity, ConfigError> {
        self.validate()?;
        let sirk = match &self.sirk {
            Some(hex) => parse_sirk(hex)?,
            None => Sirk::generate(),
        };
        Ok(SetIdentity::new(sirk, self.sharing_mode, self.size, self.rank))
    }

    /// Builder-style method to set registry capacity
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Builder-style method to set the lease length
    pub fn with_lock_timeout(mut self, secs: u16) -> Self {
        self.lock_timeout_secs = secs;
        self
    }

    /// Builder-style method to set the sharing mode
    pub fn with_sharing_mode(mut self, mode: SharingMode) -> Self {
        self.sharing_mode = mode;
        self
    }

    /// Builder-style method to set size and rank
    pub fn with_set(mut self, size: u8, rank: u8) -> Self {
        self.size = size;
        self.rank = rank;
        self
    }

    /// Builder-style method to set the SIRK
    pub fn with_sirk_hex(mut self, hex: impl Into<String>) -> Self {
        self.sirk = Some(hex.into());
        self
    }
}

/// Parse 32 hex digits, most significant byte first.
pub fn parse_sirk(text: &str) -> Result<Sirk, ConfigError> {
    let bytes = hex::decode(text.trim()).map_err(|e| ConfigError::InvalidSirk(e.to_string()))?;
    let key: [u8; wire::SIRK_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
        ConfigError::InvalidSirk(format!("expected {} bytes, got {}", wire::SIRK_LEN, b.len()))
    })?;
    Ok(Sirk::from_be_bytes(key))
}

fn parse_env<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(default),
    }
}

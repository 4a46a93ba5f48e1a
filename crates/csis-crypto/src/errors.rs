//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// The crypto engine already has an operation outstanding
    #[error("Crypto engine busy")]
    EngineBusy,

    /// The crypto engine is gone (channel closed, controller reset)
    #[error("Crypto engine unavailable")]
    EngineUnavailable,

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Invalid input for cryptographic operation
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

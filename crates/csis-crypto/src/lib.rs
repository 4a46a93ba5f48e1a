//! # CSIS Crypto - Block Cipher Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | AES-128, single block, CBC with caller IV | SIRK encryption, `sih` hash |
//! | `random` | OS-seeded CSPRNG | `prand` generation |
//!
//! ## Security Properties
//!
//! - **BlockKey**: zeroized on drop, redacted in `Debug`
//! - **Single block**: no padding, no chaining state kept between calls

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod random;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use random::random_array;
pub use symmetric::{encrypt_block, Aes128Block, BlockCipher, BlockKey, BLOCK_LEN, ZERO_IV};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

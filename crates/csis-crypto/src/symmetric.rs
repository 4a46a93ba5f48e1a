//! # Symmetric Encryption
//!
//! AES-128 over exactly one 16-byte block. With a single block, CBC mode
//! reduces to `AES(key, plaintext XOR iv)`, so the IV is applied here and no
//! chaining state is kept.
//!
//! All byte arrays are most-significant byte first, as AES defines them.

use crate::CryptoError;
use aes_gcm::aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes_gcm::aes::Aes128;
use std::fmt;
use zeroize::Zeroize;

/// AES block length in bytes.
pub const BLOCK_LEN: usize = 16;

/// All-zero initialisation vector.
pub const ZERO_IV: [u8; BLOCK_LEN] = [0u8; BLOCK_LEN];

/// AES-128 key (128-bit), most-significant byte first.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct BlockKey([u8; BLOCK_LEN]);

impl BlockKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; BLOCK_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` unless the slice is 16 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; BLOCK_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: BLOCK_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(key))
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; BLOCK_LEN] {
        &self.0
    }
}

impl fmt::Debug for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlockKey(..)")
    }
}

/// Synchronous single-block cipher.
///
/// Implemented by [`Aes128Block`]; tests and hardware-backed builds may
/// substitute their own engine.
pub trait BlockCipher: Send + Sync {
    /// Encrypt one block: `E(key, plaintext XOR iv)`.
    fn encrypt_block(
        &self,
        key: &BlockKey,
        iv: &[u8; BLOCK_LEN],
        plaintext: &[u8; BLOCK_LEN],
    ) -> [u8; BLOCK_LEN];
}

/// Software AES-128 engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct Aes128Block;

impl BlockCipher for Aes128Block {
    fn encrypt_block(
        &self,
        key: &BlockKey,
        iv: &[u8; BLOCK_LEN],
        plaintext: &[u8; BLOCK_LEN],
    ) -> [u8; BLOCK_LEN] {
        encrypt_block(key, iv, plaintext)
    }
}

/// Encrypt a single block with AES-128-CBC.
pub fn encrypt_block(
    key: &BlockKey,
    iv: &[u8; BLOCK_LEN],
    plaintext: &[u8; BLOCK_LEN],
) -> [u8; BLOCK_LEN] {
    let cipher = Aes128::new(GenericArray::from_slice(key.as_bytes()));

    let mut block = GenericArray::clone_from_slice(plaintext);
    for (byte, mask) in block.iter_mut().zip(iv.iter()) {
        *byte ^= mask;
    }
    cipher.encrypt_block(&mut block);

    let mut out = [0u8; BLOCK_LEN];
    out.copy_from_slice(&block);
    out
}

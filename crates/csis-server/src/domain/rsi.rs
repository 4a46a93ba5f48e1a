//! # Resolvable Set Identifier
//!
//! `rsi = sih(SIRK, prand) || prand`, where
//! `sih(k, r) = AES-128(k, 0^104 || r) mod 2^24`.
//!
//! The key enters AES most-significant byte first, the reverse of how
//! [`Sirk`] stores it. Getting this backwards still passes a round trip
//! against ourselves but never resolves against another stack.

use super::entities::Sirk;
use csis_crypto::{random_array, Aes128Block, BlockCipher, BlockKey, BLOCK_LEN, ZERO_IV};
use csis_types::wire;
use std::fmt;
use subtle::ConstantTimeEq;

/// Length of the hash and of `prand`.
pub const RSI_PART_LEN: usize = 3;

/// Top two bits of `prand`, fixed to `0b01`.
const PRAND_MARKER: u32 = 0x40_0000;
const PRAND_MARKER_MASK: u32 = 0xC0_0000;
/// The 22 random bits.
const PRAND_RANDOM_MASK: u32 = 0x3F_FFFF;

/// 24-bit random part of an RSI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Prand(u32);

impl Prand {
    /// Validate a 24-bit value.
    ///
    /// The two most significant bits must be `01` and the remaining 22 bits
    /// may be neither all zeros nor all ones.
    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        if value > 0xFF_FFFF || value & PRAND_MARKER_MASK != PRAND_MARKER {
            return None;
        }
        match value & PRAND_RANDOM_MASK {
            0 | PRAND_RANDOM_MASK => None,
            _ => Some(Self(value)),
        }
    }

    /// Draw a fresh valid value.
    #[must_use]
    pub fn random() -> Self {
        loop {
            let [a, b, c] = random_array::<RSI_PART_LEN>();
            let bits = u32::from_be_bytes([0, a, b, c]);
            if let Some(prand) = Self::new((bits & PRAND_RANDOM_MASK) | PRAND_MARKER) {
                return prand;
            }
        }
    }

    /// Decode three bytes, most significant first.
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; RSI_PART_LEN]) -> Option<Self> {
        Self::new(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    /// Numeric value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    /// Three bytes, most significant first.
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; RSI_PART_LEN] {
        let [_, a, b, c] = self.0.to_be_bytes();
        [a, b, c]
    }
}

/// A 6-byte Resolvable Set Identifier, most significant byte first:
/// three bytes of hash followed by three bytes of `prand`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rsi([u8; wire::RSI_LEN]);

impl Rsi {
    /// Assemble from hash and `prand`.
    #[must_use]
    pub fn from_parts(hash: [u8; RSI_PART_LEN], prand: Prand) -> Self {
        let mut out = [0u8; wire::RSI_LEN];
        out[..RSI_PART_LEN].copy_from_slice(&hash);
        out[RSI_PART_LEN..].copy_from_slice(&prand.to_be_bytes());
        Self(out)
    }

    /// Wrap bytes given most significant first.
    #[must_use]
    pub fn from_bytes(bytes: [u8; wire::RSI_LEN]) -> Self {
        Self(bytes)
    }

    /// Bytes, most significant first.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; wire::RSI_LEN] {
        &self.0
    }

    /// The hash part.
    #[must_use]
    pub fn hash(&self) -> [u8; RSI_PART_LEN] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// The `prand` part as raw bytes (not validated).
    #[must_use]
    pub fn prand_bytes(&self) -> [u8; RSI_PART_LEN] {
        [self.0[3], self.0[4], self.0[5]]
    }

    /// Advertising data order (least significant byte first).
    #[must_use]
    pub fn to_advertising_bytes(&self) -> [u8; wire::RSI_LEN] {
        let mut out = self.0;
        out.reverse();
        out
    }

    /// Parse from advertising data order.
    #[must_use]
    pub fn from_advertising_bytes(mut bytes: [u8; wire::RSI_LEN]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    /// Complete AD structure: length, AD type, RSI.
    #[must_use]
    pub fn to_ad_structure(&self) -> [u8; wire::RSI_LEN + 2] {
        let mut out = [0u8; wire::RSI_LEN + 2];
        out[0] = (wire::RSI_LEN + 1) as u8;
        out[1] = wire::AD_TYPE_RSI;
        out[2..].copy_from_slice(&self.to_advertising_bytes());
        out
    }
}

impl fmt::Debug for Rsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rsi({self})")
    }
}

impl fmt::Display for Rsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Generates and resolves RSIs. Stateless; safe to share.
#[derive(Clone, Debug, Default)]
pub struct RsiCodec<C: BlockCipher = Aes128Block> {
    cipher: C,
}

impl RsiCodec<Aes128Block> {
    /// Codec over the software AES engine.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cipher(Aes128Block)
    }
}

impl<C: BlockCipher> RsiCodec<C> {
    /// Codec over a specific block cipher.
    pub fn with_cipher(cipher: C) -> Self {
        Self { cipher }
    }

    /// The `sih` hash function.
    pub fn sih(&self, sirk: &Sirk, prand: Prand) -> [u8; RSI_PART_LEN] {
        let key = BlockKey::from_bytes(sirk.to_be_bytes());

        let mut plaintext = [0u8; BLOCK_LEN];
        plaintext[BLOCK_LEN - RSI_PART_LEN..].copy_from_slice(&prand.to_be_bytes());

        let ciphertext = self.cipher.encrypt_block(&key, &ZERO_IV, &plaintext);
        [
            ciphertext[BLOCK_LEN - 3],
            ciphertext[BLOCK_LEN - 2],
            ciphertext[BLOCK_LEN - 1],
        ]
    }

    /// Generate an RSI with a fresh `prand`.
    pub fn generate(&self, sirk: &Sirk) -> Rsi {
        self.generate_with(sirk, Prand::random())
    }

    /// Generate an RSI for a given `prand`.
    pub fn generate_with(&self, sirk: &Sirk, prand: Prand) -> Rsi {
        Rsi::from_parts(self.sih(sirk, prand), prand)
    }

    /// True if `rsi` was generated from `sirk`.
    ///
    /// Compares the hash in constant time. An RSI whose `prand` is not
    /// well formed never resolves.
    pub fn resolve(&self, rsi: &Rsi, sirk: &Sirk) -> bool {
        let Some(prand) = Prand::from_be_bytes(rsi.prand_bytes()) else {
            return false;
        };
        let expected = self.sih(sirk, prand);
        expected[..].ct_eq(&rsi.hash()[..]).into()
    }
}

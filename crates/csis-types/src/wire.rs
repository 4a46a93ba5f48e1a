//! Characteristic value sizes, encodings and Bluetooth SIG assigned numbers.

/// Coordinated Set Identification Service UUID.
pub const UUID_SERVICE: u16 = 0x1846;
/// Set Identity Resolving Key characteristic UUID.
pub const UUID_SIRK: u16 = 0x2B84;
/// Coordinated Set Size characteristic UUID.
pub const UUID_SIZE: u16 = 0x2B85;
/// Set Member Lock characteristic UUID.
pub const UUID_LOCK: u16 = 0x2B86;
/// Set Member Rank characteristic UUID.
pub const UUID_RANK: u16 = 0x2B87;

/// Lock value: unlocked.
pub const LOCK_UNLOCKED: u8 = 0x00;
/// Lock value: locked.
pub const LOCK_LOCKED: u8 = 0x01;
/// Lock characteristic length.
pub const LOCK_LEN: usize = 1;

/// Size characteristic length.
pub const SIZE_LEN: usize = 1;
/// Rank characteristic length.
pub const RANK_LEN: usize = 1;

/// SIRK key length.
pub const SIRK_LEN: usize = 16;
/// SIRK characteristic length: type byte followed by the key.
pub const SIRK_VALUE_LEN: usize = SIRK_LEN + 1;
/// SIRK type byte: key is encrypted for the receiving peer.
pub const SIRK_TYPE_ENCRYPTED: u8 = 0x00;
/// SIRK type byte: key is in plaintext.
pub const SIRK_TYPE_PLAINTEXT: u8 = 0x01;

/// Resolvable Set Identifier length.
pub const RSI_LEN: usize = 6;
/// Advertising data type carrying an RSI.
pub const AD_TYPE_RSI: u8 = 0x2E;

/// Client Characteristic Configuration descriptor length.
pub const CCC_LEN: usize = 2;
/// CCC value: notifications and indications disabled.
pub const CCC_DISABLED: u8 = 0x00;
/// CCC value: notifications enabled.
pub const CCC_NOTIFY: u8 = 0x01;
/// CCC value: indications enabled (never allowed for CSIS).
pub const CCC_INDICATE: u8 = 0x02;

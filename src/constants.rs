//! Ledger wire constants

/// Largest amount a value output can carry; anything above is an output-type tag
pub const VALUE_UPPER_BOUND: u32 = 0x7fff_ffff;

/// Identity root: root = hash160(script), nothing stored after the tag
pub const IDENTITY_ROOT: u32 = 0xffff_ffff;

/// Identity head: 20-byte root stored, asset derived
pub const IDENTITY_HEAD: u32 = 0xffff_fffe;

/// SHA-256 asset family
pub const SHA256_ASSET: u32 = 0x8000_0000;
pub const SHA256_ROOT: u32 = 0x8000_0001;
pub const SHA256_HEAD: u32 = 0x8000_0002;

/// RIPEMD-160 asset family
pub const RIPEMD160_ASSET: u32 = 0x8000_0010;
pub const RIPEMD160_ROOT: u32 = 0x8000_0011;
pub const RIPEMD160_HEAD: u32 = 0x8000_0012;

/// hash160 (RIPEMD-160 over SHA-256) asset family
pub const HASH160_ASSET: u32 = 0x8000_0020;
pub const HASH160_ROOT: u32 = 0x8000_0021;
pub const HASH160_HEAD: u32 = 0x8000_0022;

/// Length of a SHA-256 digest
pub const SHA256_LENGTH: usize = 32;

/// Length of a RIPEMD-160 / hash160 digest
pub const HASH160_LENGTH: usize = 20;

/// Length of a transaction uid
pub const TRANSACTION_ID_LENGTH: usize = HASH160_LENGTH;

/// Largest data push a single script step may carry
pub const MAX_PUSH_LENGTH: usize = 75;

/// Script bodies must fit the 2-byte length prefix
pub const MAX_SCRIPT_LENGTH: usize = 0xffff;

/// Address checksum length: first 4 bytes of double SHA-256
pub const CHECKSUM_LENGTH: usize = 4;

/// Default network id (the bitcoin mainnet pubkey-hash prefix)
pub const DEFAULT_NETWORK_ID: u8 = 0;

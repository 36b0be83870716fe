//! Codec primitives: fixed-width integers, hex, hashing and Base58

use crate::constants::CHECKSUM_LENGTH;
use crate::error::ConversionError;
use crate::types::{Hash160, Sha256Hash};
use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Render `value` as exactly `width` big-endian bytes
pub fn int_to_bytes(value: u64, width: usize) -> Result<Vec<u8>, ConversionError> {
    let significant = 8 - (value.leading_zeros() as usize / 8);
    if significant > width {
        return Err(ConversionError::FieldOverflow { value, width });
    }
    let mut out = vec![0u8; width];
    let be = value.to_be_bytes();
    out[width - significant..].copy_from_slice(&be[8 - significant..]);
    Ok(out)
}

/// Render `value` as exactly `width` bytes of lowercase hex (2 * width characters)
pub fn hex_n(value: u64, width: usize) -> Result<String, ConversionError> {
    int_to_bytes(value, width).map(|bytes| bytes_to_hex(&bytes))
}

/// Big-endian bytes to integer. At most 8 bytes are meaningful.
pub fn bytes_to_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, ConversionError> {
    hex::decode(hex).map_err(|e| ConversionError::InvalidHex(format!("{hex}: {e}")))
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn sha256(data: &[u8]) -> Sha256Hash {
    Sha256::digest(data).into()
}

pub fn ripemd160(data: &[u8]) -> Hash160 {
    Ripemd160::digest(data).into()
}

/// RIPEMD160(SHA256(x))
pub fn hash160(data: &[u8]) -> Hash160 {
    ripemd160(&sha256(data))
}

/// First 4 bytes of SHA256(SHA256(payload))
pub fn pk_checksum(payload: &[u8]) -> [u8; CHECKSUM_LENGTH] {
    let mut engine = sha256d::Hash::engine();
    engine.input(payload);
    let digest = sha256d::Hash::from_engine(engine).into_inner();

    let mut checksum = [0u8; CHECKSUM_LENGTH];
    checksum.copy_from_slice(&digest[..CHECKSUM_LENGTH]);
    checksum
}

pub fn pk_hash(public_key: &[u8]) -> Hash160 {
    hash160(public_key)
}

/// network_id || hash160(public_key) || checksum
pub fn pk_hash_address(public_key: &[u8], network_id: u8) -> Vec<u8> {
    let mut address = Vec::with_capacity(1 + 20 + CHECKSUM_LENGTH);
    address.push(network_id);
    address.extend_from_slice(&pk_hash(public_key));
    let checksum = pk_checksum(&address);
    address.extend_from_slice(&checksum);
    address
}

/// Base58 over raw bytes; each leading zero byte becomes a leading '1'
pub fn encode_base58_bytes(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

pub fn decode_base58_bytes(text: &str) -> Result<Vec<u8>, ConversionError> {
    bs58::decode(text)
        .into_vec()
        .map_err(|e| ConversionError::InvalidCharacter(e.to_string()))
}

/// Base58 of a hex string
pub fn encode_base58(hex: &str) -> Result<String, ConversionError> {
    Ok(encode_base58_bytes(&hex_to_bytes(hex)?))
}

/// Base58 text back to lowercase hex
pub fn decode_base58(text: &str) -> Result<String, ConversionError> {
    decode_base58_bytes(text).map(|bytes| bytes_to_hex(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PK_HEX: &str = "0450863AD64A87AE8A2FE83C1AF1A8403CB53F53E486D8511DAD8A04887E5B23522CD470243453A299FA9E77237716103ABC11A1DF38855ED6F2EE187E9C582BA6";

    #[test]
    fn test_hex_n_pads() {
        assert_eq!(hex_n(16, 4).unwrap(), "00000010");
        assert_eq!(hex_n(0, 2).unwrap(), "0000");
        assert_eq!(hex_n(0xffff, 2).unwrap(), "ffff");
    }

    #[test]
    fn test_hex_n_overflow() {
        assert_eq!(
            hex_n(0x1_0000, 2),
            Err(ConversionError::FieldOverflow { value: 0x1_0000, width: 2 })
        );
    }

    #[test]
    fn test_bytes_to_int() {
        assert_eq!(bytes_to_int(&[0x00, 0x0a]), 10);
        assert_eq!(bytes_to_int(&[0xff, 0xff, 0xff, 0xfe]), 0xffff_fffe);
        assert_eq!(bytes_to_int(&[]), 0);
    }

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(bytes_to_hex("¡olleh".as_bytes()), "c2a16f6c6c6568");
        assert_eq!(hex_to_bytes("68656c6c6f21").unwrap(), b"hello!");
        assert!(hex_to_bytes("zz").is_err());
    }

    #[test]
    fn test_pk_hash() {
        let pk = hex_to_bytes(PK_HEX).unwrap();
        assert_eq!(
            bytes_to_hex(&pk_hash(&pk)).to_uppercase(),
            "010966776006953D5567439E5E39F86A0D273BEE"
        );
    }

    #[test]
    fn test_pk_hash_address() {
        let pk = hex_to_bytes(PK_HEX).unwrap();
        assert_eq!(
            bytes_to_hex(&pk_hash_address(&pk, 0)).to_uppercase(),
            "00010966776006953D5567439E5E39F86A0D273BEED61967F6"
        );
    }

    #[test]
    fn test_pk_hash_address_other_network() {
        let pk = hex_to_bytes(PK_HEX).unwrap();
        let address = pk_hash_address(&pk, 2);
        let mut prefix = vec![2u8];
        prefix.extend_from_slice(&hash160(&pk));
        let checksum = &sha256(&sha256(&prefix))[..4];
        assert_eq!(&address[..21], prefix.as_slice());
        assert_eq!(&address[21..], checksum);
    }

    #[test]
    fn test_encode_base58() {
        assert_eq!(
            encode_base58("00010966776006953D5567439E5E39F86A0D273BEED61967F6").unwrap(),
            "16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM"
        );
    }

    #[test]
    fn test_decode_base58() {
        assert_eq!(
            decode_base58("16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM").unwrap().to_uppercase(),
            "00010966776006953D5567439E5E39F86A0D273BEED61967F6"
        );
    }

    #[test]
    fn test_base58_leading_zeros() {
        assert_eq!(encode_base58("0000ff").unwrap(), "115Q");
        assert_eq!(decode_base58("115Q").unwrap(), "0000ff");
    }

    #[test]
    fn test_base58_invalid_character() {
        assert!(matches!(decode_base58("0OIl"), Err(ConversionError::InvalidCharacter(_))));
    }
}

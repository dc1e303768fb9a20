//! The 80-byte Bitcoin block header and its difficulty arithmetic.

use crate::bytes::{ReadView, WriteBuffer};
use crate::error::ParseError;
use crate::hash::{self, Hash32};
use num_bigint::BigUint;
use std::cmp::Ordering;

pub const HEADER_LEN: usize = 80;

/// A parsed block header (spec §3, §4.2). Immutable after construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: i32,
    pub prev_block_hash: Hash32,
    pub merkle_root: Hash32,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl Header {
    /// Parse an 80-byte header from the front of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut view = ReadView::new(data);
        let version = view.read_i32_le("header.version")?;
        let prev_block_hash = Hash32::from_bytes(view.take_array("header.prev_block_hash")?);
        let merkle_root = Hash32::from_bytes(view.take_array("header.merkle_root")?);
        let timestamp = view.read_u32_le("header.timestamp")?;
        let bits = view.read_u32_le("header.bits")?;
        let nonce = view.read_u32_le("header.nonce")?;
        Ok(Header {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
        })
    }

    /// Serialize to the canonical 80-byte wire form.
    pub fn serialize(&self) -> [u8; HEADER_LEN] {
        let mut w = WriteBuffer::with_capacity(HEADER_LEN);
        w.write_i32_le(self.version);
        w.write_bytes(self.prev_block_hash.as_bytes());
        w.write_bytes(self.merkle_root.as_bytes());
        w.write_u32_le(self.timestamp);
        w.write_u32_le(self.bits);
        w.write_u32_le(self.nonce);
        w.into_vec().try_into().expect("header is always 80 bytes")
    }

    /// `sha256d` of the serialized header.
    pub fn block_hash(&self) -> Hash32 {
        hash::sha256d(&self.serialize())
    }

    /// The header's declared difficulty target, decoded from `bits`.
    pub fn target(&self) -> NumericHash {
        NumericHash::from_compact(self.bits)
    }
}

/// A hash (or a decoded difficulty target) interpreted as a little-endian
/// 256-bit unsigned number, with total ordering for difficulty comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumericHash(BigUint);

impl NumericHash {
    pub fn from_hash(hash: &Hash32) -> Self {
        // `Hash32` stores bytes little-endian; BigUint::from_bytes_le matches.
        Self(BigUint::from_bytes_le(hash.as_bytes()))
    }

    /// Decode a compact ("nBits") target using the standard mantissa/exponent
    /// form: `target = mantissa << (8*(exp-3))` when `exp > 3`, else
    /// `mantissa >> (8*(3-exp))`.
    pub fn from_compact(bits: u32) -> Self {
        let exp = (bits >> 24) as i32;
        let mantissa = BigUint::from(bits & 0x007f_ffff);
        let negative = bits & 0x0080_0000 != 0;
        if negative || mantissa == BigUint::from(0u32) {
            return Self(BigUint::from(0u32));
        }
        let value = if exp > 3 {
            mantissa << (8 * (exp - 3))
        } else {
            mantissa >> (8 * (3 - exp))
        };
        Self(value)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::from(0u32)
    }
}

impl PartialOrd for NumericHash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumericHash {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// `true` iff `block_hash`'s numeric value is strictly below the header's
/// decoded target — the difficulty check described in spec §4.2. This is a
/// structural helper only; full PoW validation is out of this crate's scope.
pub fn meets_target(block_hash: &Hash32, bits: u32) -> bool {
    NumericHash::from_hash(block_hash) < NumericHash::from_compact(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS_HEADER_HEX: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c";

    #[test]
    fn parses_and_reserializes_genesis_header() {
        let bytes = hex::decode(GENESIS_HEADER_HEX).unwrap();
        let header = Header::parse(&bytes).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.timestamp, 1231006505);
        assert_eq!(header.bits, 0x1d00ffff);
        assert_eq!(header.nonce, 2083236893);
        assert_eq!(header.serialize().to_vec(), bytes);
    }

    #[test]
    fn genesis_block_hash_matches_known_value() {
        let bytes = hex::decode(GENESIS_HEADER_HEX).unwrap();
        let header = Header::parse(&bytes).unwrap();
        assert_eq!(
            header.block_hash().to_display_hex(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn compact_target_decodes_mantissa_and_exponent() {
        // 0x1d00ffff -> exponent 0x1d=29, mantissa 0x00ffff
        let target = NumericHash::from_compact(0x1d00ffff);
        let expected = BigUint::from(0xffffu32) << (8 * (29 - 3));
        assert_eq!(target.0, expected);
    }

    #[test]
    fn compact_target_with_small_exponent_shifts_right() {
        let target = NumericHash::from_compact(0x01003456);
        let expected = BigUint::from(0x0034u32) >> (8 * (3 - 1));
        assert_eq!(target.0, expected);
    }

    #[test]
    fn parse_fails_on_short_input() {
        assert!(Header::parse(&[0u8; 79]).is_err());
    }
}

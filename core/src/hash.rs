//! Fixed-signature hash primitives. These delegate to `bitcoin_hashes` and
//! `siphasher` (the "external crypto provider" of spec §1) but present the
//! stable signatures the rest of the crate is written against.

use bitcoin_hashes::{hash160, sha256, sha256d, Hash as _};
use siphasher::sip::SipHasher24;
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hasher as _;
use std::str::FromStr;

/// A 32-byte hash, displayed little-endian (as Bitcoin conventionally
/// reverses txid/block-hash bytes for human display) with big-endian numeric
/// comparison via [`Hash32::as_numeric_be`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash32([u8; 32]);

impl Hash32 {
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Display form: reversed (big-endian-looking) hex, matching Bitcoin's
    /// conventional txid/block-hash string representation.
    pub fn to_display_hex(&self) -> String {
        let mut reversed = self.0;
        reversed.reverse();
        hex::encode(reversed)
    }

    pub fn from_display_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = hex::decode(s)?;
        bytes.reverse();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(array))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_display_hex())
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_hex())
    }
}

impl FromStr for Hash32 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_display_hex(s)
    }
}

/// Double-SHA256, as used for block hashes, txids, and wtxids.
pub fn sha256d(data: &[u8]) -> Hash32 {
    Hash32(sha256d::Hash::hash(data).to_byte_array())
}

/// Single SHA-256, used inside the GCS filter-header chain (`sha256d` is
/// itself built from this, but the filter hash construction in spec §4.6
/// calls it out separately).
pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(data).to_byte_array()
}

/// RIPEMD160(SHA256(data)), used for P2PKH/P2SH script hashes.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// Keyed SipHash-2-4 over `data`, using the first 8 and next 8 bytes of
/// `key` (little-endian) as `k0`/`k1`, per spec §4.6.
pub fn siphash24(key: &[u8; 16], data: &[u8]) -> u64 {
    let k0 = u64::from_le_bytes(key[0..8].try_into().unwrap());
    let k1 = u64::from_le_bytes(key[8..16].try_into().unwrap());
    let mut hasher = SipHasher24::new_with_keys(k0, k1);
    hasher.write(data);
    hasher.finish()
}

/// Total ordering over a hash interpreted as a little-endian 256-bit number,
/// used for PoW/difficulty comparisons (spec §4.2's `NumericHash`).
pub fn compare_numeric_le(a: &Hash32, b: &Hash32) -> Ordering {
    // Compare most-significant byte first; the stored bytes are
    // little-endian, so iterate from the end.
    for i in (0..32).rev() {
        match a.0[i].cmp(&b.0[i]) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256d_matches_known_vector() {
        // sha256d("") = 5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456
        let h = sha256d(b"");
        assert_eq!(
            hex::encode(h.as_bytes()),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn display_hex_is_byte_reversed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xaa;
        bytes[31] = 0x01;
        let h = Hash32::from_bytes(bytes);
        assert!(h.to_display_hex().starts_with("01"));
        assert!(h.to_display_hex().ends_with("aa"));
        assert_eq!(Hash32::from_str(&h.to_display_hex()).unwrap(), h);
    }

    #[test]
    fn siphash24_is_deterministic_and_key_sensitive() {
        let key_a = [0u8; 16];
        let mut key_b = [0u8; 16];
        key_b[0] = 1;
        let a1 = siphash24(&key_a, b"foo");
        let a2 = siphash24(&key_a, b"foo");
        let b = siphash24(&key_b, b"foo");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn numeric_ordering_is_big_endian_over_le_bytes() {
        let mut low = [0u8; 32];
        low[0] = 1;
        let mut high = [0u8; 32];
        high[31] = 1;
        assert_eq!(
            compare_numeric_le(&Hash32::from_bytes(low), &Hash32::from_bytes(high)),
            Ordering::Less
        );
    }
}

//! A thin, hex-friendly wrapper around an owned byte buffer.

use std::fmt;

/// An owned byte buffer with hex encode/decode helpers. Used anywhere the
/// spec calls for an opaque blob (scriptSig bytes, witness items, addr
/// payloads) rather than a fixed-width hash.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct ByteArray(Vec<u8>);

impl ByteArray {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s)?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ByteArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteArray({})", self.to_hex())
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<&[u8]> for ByteArray {
    fn from(v: &[u8]) -> Self {
        Self(v.to_vec())
    }
}

impl AsRef<[u8]> for ByteArray {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let a = ByteArray::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(a.to_hex(), "deadbeef");
        assert_eq!(ByteArray::from_hex("deadbeef").unwrap(), a);
    }

    #[test]
    fn debug_prints_hex() {
        let a = ByteArray::new(vec![0x01, 0x02]);
        assert_eq!(format!("{:?}", a), "ByteArray(0102)");
    }
}

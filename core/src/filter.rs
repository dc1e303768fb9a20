//! GCS / BIP-158 compact block filters: construction, matching, and the
//! filter header hash chain (spec §4.6).

mod bits;

use crate::error::FilterError;
use crate::hash::{self, Hash32};
use bits::{decode_golomb_rice, encode_golomb_rice, BitReader, BitWriter};

/// Golomb-Rice parameter for BIP-158 "basic" filters.
pub const BASIC_FILTER_P: u8 = 19;
/// Golomb-Rice false-positive-rate modulus for BIP-158 "basic" filters.
pub const BASIC_FILTER_M: u64 = 784_931;

/// A decoded or freshly-built GCS filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    n: u64,
    p: u8,
    m: u64,
    data: Vec<u8>,
}

/// Derive the SipHash key BIP-158 uses for a block: the first 16 bytes of
/// the block hash, in its internal (wire, little-endian) byte order.
pub fn siphash_key_for_block(block_hash: &Hash32) -> [u8; 16] {
    let mut key = [0u8; 16];
    key.copy_from_slice(&block_hash.as_bytes()[0..16]);
    key
}

fn hash_to_range(key: &[u8; 16], element: &[u8], f: u64) -> u64 {
    let h = hash::siphash24(key, element);
    ((h as u128 * f as u128) >> 64) as u64
}

impl Filter {
    /// Build a basic (P=19, M=784931) filter over `elements`, keyed by
    /// `key` (ordinarily [`siphash_key_for_block`] of the filtered block).
    pub fn build_basic(key: &[u8; 16], elements: &[Vec<u8>]) -> Self {
        Self::build(key, elements, BASIC_FILTER_P, BASIC_FILTER_M)
    }

    pub fn build(key: &[u8; 16], elements: &[Vec<u8>], p: u8, m: u64) -> Self {
        let n = elements.len() as u64;
        let f = n * m;
        let mut values: Vec<u64> = elements
            .iter()
            .map(|e| hash_to_range(key, e, f))
            .collect();
        values.sort_unstable();

        let mut writer = BitWriter::new();
        let mut last = 0u64;
        for v in values {
            encode_golomb_rice(&mut writer, v - last, p);
            last = v;
        }

        Filter {
            n,
            p,
            m,
            data: writer.into_bytes(),
        }
    }

    /// Parse a filter from its wire form: CompactSize element count followed
    /// by the Golomb-Rice bitstream, assuming BIP-158 basic-filter
    /// parameters.
    pub fn parse(bytes: &[u8]) -> Result<Self, FilterError> {
        let (n, consumed) = crate::bytes::compact_size::decode(bytes).map_err(FilterError::Parse)?;
        Ok(Filter {
            n,
            p: BASIC_FILTER_P,
            m: BASIC_FILTER_M,
            data: bytes[consumed..].to_vec(),
        })
    }

    /// Wire serialization: CompactSize(n) followed by the bitstream.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = crate::bytes::compact_size::encode(self.n);
        out.extend_from_slice(&self.data);
        out
    }

    pub fn element_count(&self) -> u64 {
        self.n
    }

    /// `true` iff `element` is (probably) a member of the filtered set.
    pub fn contains(&self, key: &[u8; 16], element: &[u8]) -> bool {
        if self.n == 0 {
            return false;
        }
        let f = self.n * self.m;
        let target = hash_to_range(key, element, f);
        let mut reader = BitReader::new(&self.data);
        let mut acc = 0u64;
        for _ in 0..self.n {
            let delta = match decode_golomb_rice(&mut reader, self.p) {
                Ok(d) => d,
                Err(_) => return false,
            };
            acc += delta;
            if acc == target {
                return true;
            }
            if acc > target {
                return false;
            }
        }
        false
    }

    /// `true` iff any of `elements` is (probably) a member of the filtered
    /// set. A single merge-join pass over the sorted query targets and the
    /// filter's sorted encoded values, per BIP-158's `MatchAny`.
    pub fn contains_any(&self, key: &[u8; 16], elements: &[Vec<u8>]) -> bool {
        if self.n == 0 || elements.is_empty() {
            return false;
        }
        let f = self.n * self.m;
        let mut targets: Vec<u64> = elements
            .iter()
            .map(|e| hash_to_range(key, e, f))
            .collect();
        targets.sort_unstable();

        let mut reader = BitReader::new(&self.data);
        let mut acc = 0u64;
        let mut ti = 0usize;
        for _ in 0..self.n {
            let delta = match decode_golomb_rice(&mut reader, self.p) {
                Ok(d) => d,
                Err(_) => return false,
            };
            acc += delta;
            while ti < targets.len() && targets[ti] < acc {
                ti += 1;
            }
            if ti >= targets.len() {
                return false;
            }
            if targets[ti] == acc {
                return true;
            }
        }
        false
    }
}

/// `sha256d` of a filter's wire serialization.
pub fn filter_hash(filter: &Filter) -> Hash32 {
    hash::sha256d(&filter.serialize())
}

/// The filter header chain: `sha256d(filter_hash || previous_header)`,
/// per spec §4.6. The genesis filter's previous header is the zero hash.
pub fn filter_header(filter_hash: &Hash32, previous_header: &Hash32) -> Hash32 {
    let mut preimage = filter_hash.to_vec();
    preimage.extend_from_slice(previous_header.as_bytes());
    hash::sha256d(&preimage)
}

/// Verify that `computed_header` (built from `filter` and `previous_header`)
/// matches `expected_header`.
pub fn verify_filter_header(
    filter: &Filter,
    previous_header: &Hash32,
    expected_header: &Hash32,
) -> Result<(), FilterError> {
    let computed = filter_header(&filter_hash(filter), previous_header);
    if computed != *expected_header {
        return Err(FilterError::HeaderChainMismatch {
            expected: expected_header.to_display_hex(),
            computed: computed.to_display_hex(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "filter/tests.rs"]
mod tests;

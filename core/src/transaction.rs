//! The encoded transaction data model: outpoint, inputs, outputs, witnesses,
//! locktime, and the supplemented DIP-2/cashtoken tail (spec §3, §9
//! supplement).

use crate::bytes::{ByteArray, ReadView, WriteBuffer};
use crate::error::ParseError;
use crate::hash::{self, Hash32};

/// A transaction input's previous-output reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outpoint {
    pub txid: Hash32,
    pub vout: u32,
}

impl Outpoint {
    pub fn serialize(&self, w: &mut WriteBuffer) {
        w.write_bytes(self.txid.as_bytes());
        w.write_u32_le(self.vout);
    }

    /// Lexicographic ordering key for BIP-69 input sorting: txid bytes as
    /// stored (little-endian wire order) then vout ascending.
    pub fn sort_key(&self) -> ([u8; 32], u32) {
        (*self.txid.as_bytes(), self.vout)
    }
}

const CASHTOKEN_PREFIX: u8 = 0xef;
const CASHTOKEN_HAS_COMMITMENT_LENGTH: u8 = 0x10;
const CASHTOKEN_HAS_AMOUNT: u8 = 0x20;
const CASHTOKEN_HAS_NFT: u8 = 0x40;
const CASHTOKEN_RESERVED_BIT: u8 = 0x80;

/// A CashToken extension on an output (CHIP-2022-02-CashTokens), carried
/// structurally: category, capability/presence bitfield, an optional NFT
/// commitment, and an optional fungible amount (spec §9 supplement).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CashToken {
    pub category: [u8; 32],
    pub bitfield: u8,
    pub commitment: Option<ByteArray>,
    pub amount: Option<u64>,
}

impl CashToken {
    /// Parse an output's CompactSize-prefixed script body, splitting off a
    /// leading CashToken (marker byte `0xef`) if present. Returns the token
    /// (or `None`) and the remaining locking-script bytes.
    pub fn parse_prefixed(bytes: &[u8]) -> Result<(Option<CashToken>, Vec<u8>), ParseError> {
        if bytes.first() != Some(&CASHTOKEN_PREFIX) {
            return Ok((None, bytes.to_vec()));
        }

        let mut view = ReadView::new(bytes);
        view.advance(1);
        let category = view.take_array::<32>("output.cashtoken.category")?;
        let bitfield = view.read_u8("output.cashtoken.bitfield")?;
        if bitfield & CASHTOKEN_RESERVED_BIT != 0 {
            return Err(ParseError::invalid(
                "output.cashtoken.bitfield",
                "reserved bit set",
            ));
        }
        if bitfield & (CASHTOKEN_HAS_COMMITMENT_LENGTH | CASHTOKEN_HAS_AMOUNT | CASHTOKEN_HAS_NFT) == 0 {
            return Err(ParseError::invalid(
                "output.cashtoken.bitfield",
                "prefix present but no capability or amount bit set",
            ));
        }
        let commitment = if bitfield & CASHTOKEN_HAS_COMMITMENT_LENGTH != 0 {
            Some(ByteArray::new(
                view.read_compact_bytes("output.cashtoken.commitment")?.to_vec(),
            ))
        } else {
            None
        };
        let amount = if bitfield & CASHTOKEN_HAS_AMOUNT != 0 {
            Some(view.read_compact_size("output.cashtoken.amount")?)
        } else {
            None
        };

        let token = CashToken {
            category,
            bitfield,
            commitment,
            amount,
        };
        Ok((Some(token), view.rest().to_vec()))
    }

    pub fn serialize(&self, w: &mut WriteBuffer) {
        w.write_u8(CASHTOKEN_PREFIX);
        w.write_bytes(&self.category);
        w.write_u8(self.bitfield);
        if let Some(commitment) = &self.commitment {
            w.write_compact_bytes(commitment.as_slice());
        }
        if let Some(amount) = self.amount {
            w.write_compact_size(amount);
        }
    }
}

/// A single transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Output {
    pub value: u64,
    pub script_pubkey: ByteArray,
    pub cashtoken: Option<CashToken>,
}

impl Output {
    pub fn serialize(&self, w: &mut WriteBuffer) {
        w.write_u64_le(self.value);
        match &self.cashtoken {
            Some(token) => {
                let mut body = WriteBuffer::new();
                token.serialize(&mut body);
                body.write_bytes(self.script_pubkey.as_slice());
                w.write_compact_bytes(body.as_slice());
            }
            None => w.write_compact_bytes(self.script_pubkey.as_slice()),
        }
    }

    /// BIP-69 output sort key: `(value, scriptPubKey bytes)` ascending.
    /// Intentionally excludes `cashtoken` — BIP-69 predates CashTokens and
    /// this crate sorts on the fields the spec names.
    pub fn sort_key(&self) -> (u64, Vec<u8>) {
        (self.value, self.script_pubkey.as_slice().to_vec())
    }
}

/// A single transaction input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Input {
    pub outpoint: Outpoint,
    pub script_sig: ByteArray,
    pub sequence: u32,
}

impl Input {
    pub fn serialize(&self, w: &mut WriteBuffer) {
        self.outpoint.serialize(w);
        w.write_compact_bytes(self.script_sig.as_slice());
        w.write_u32_le(self.sequence);
    }
}

/// One input's witness stack: a list of items, each an opaque byte string.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Witness {
    pub items: Vec<ByteArray>,
}

impl Witness {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn serialize(&self, w: &mut WriteBuffer) {
        w.write_compact_size(self.items.len() as u64);
        for item in &self.items {
            w.write_compact_bytes(item.as_slice());
        }
    }
}

/// A fully decoded transaction in its wire representation, immutable after
/// construction (spec §3 data model).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedTransaction {
    pub version: i32,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    /// Present only for SegWit transactions; always `witnesses.len() ==
    /// inputs.len()` when non-empty.
    pub witnesses: Vec<Witness>,
    pub locktime: u32,
    /// DIP-2 (BCH) extra-bytes tail following locktime, carried opaquely.
    pub extra_bytes: Option<ByteArray>,
}

impl EncodedTransaction {
    pub fn is_segwit(&self) -> bool {
        self.witnesses.iter().any(|w| !w.is_empty())
    }

    /// The legacy (pre-SegWit) serialization used for the txid preimage:
    /// version, inputs, outputs, locktime — no marker/flag, no witnesses.
    pub fn serialize_legacy(&self) -> Vec<u8> {
        let mut w = WriteBuffer::new();
        w.write_i32_le(self.version);
        w.write_compact_size(self.inputs.len() as u64);
        for input in &self.inputs {
            input.serialize(&mut w);
        }
        w.write_compact_size(self.outputs.len() as u64);
        for output in &self.outputs {
            output.serialize(&mut w);
        }
        w.write_u32_le(self.locktime);
        if let Some(tail) = &self.extra_bytes {
            w.write_compact_bytes(tail.as_slice());
        }
        w.into_vec()
    }

    /// The full SegWit serialization (marker, flag, witnesses included),
    /// used both on the wire and for the wtxid preimage.
    pub fn serialize_segwit(&self) -> Vec<u8> {
        let mut w = WriteBuffer::new();
        w.write_i32_le(self.version);
        w.write_u8(0x00);
        w.write_u8(0x01);
        w.write_compact_size(self.inputs.len() as u64);
        for input in &self.inputs {
            input.serialize(&mut w);
        }
        w.write_compact_size(self.outputs.len() as u64);
        for output in &self.outputs {
            output.serialize(&mut w);
        }
        for witness in &self.witnesses {
            witness.serialize(&mut w);
        }
        w.write_u32_le(self.locktime);
        if let Some(tail) = &self.extra_bytes {
            w.write_compact_bytes(tail.as_slice());
        }
        w.into_vec()
    }

    /// The wire serialization: SegWit form iff any input carries a witness.
    pub fn serialize(&self) -> Vec<u8> {
        if self.is_segwit() {
            self.serialize_segwit()
        } else {
            self.serialize_legacy()
        }
    }

    pub fn txid(&self) -> Hash32 {
        hash::sha256d(&self.serialize_legacy())
    }

    /// wtxid: equal to txid when there are no witnesses, else
    /// `sha256d` of the full SegWit serialization. The coinbase's wtxid is
    /// fixed to the all-zero hash by the caller (the parser), since this
    /// type has no notion of "am I the coinbase".
    pub fn wtxid(&self) -> Hash32 {
        if self.is_segwit() {
            hash::sha256d(&self.serialize_segwit())
        } else {
            self.txid()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_legacy_tx() -> EncodedTransaction {
        EncodedTransaction {
            version: 1,
            inputs: vec![Input {
                outpoint: Outpoint {
                    txid: Hash32::ZERO,
                    vout: 0xffff_ffff,
                },
                script_sig: ByteArray::new(vec![0x51]),
                sequence: 0xffff_ffff,
            }],
            outputs: vec![Output {
                value: 5_000_000_000,
                script_pubkey: ByteArray::new(vec![0x51]),
                cashtoken: None,
            }],
            witnesses: Vec::new(),
            locktime: 0,
            extra_bytes: None,
        }
    }

    #[test]
    fn legacy_tx_is_not_segwit_and_wtxid_equals_txid() {
        let tx = sample_legacy_tx();
        assert!(!tx.is_segwit());
        assert_eq!(tx.txid(), tx.wtxid());
    }

    #[test]
    fn segwit_tx_serialization_includes_marker_flag() {
        let mut tx = sample_legacy_tx();
        tx.witnesses = vec![Witness {
            items: vec![ByteArray::new(vec![0xde, 0xad])],
        }];
        assert!(tx.is_segwit());
        let bytes = tx.serialize_segwit();
        assert_eq!(&bytes[4..6], &[0x00, 0x01]);
        assert_ne!(tx.txid(), tx.wtxid());
    }

    #[test]
    fn legacy_serialize_excludes_marker_and_witness() {
        let mut tx = sample_legacy_tx();
        tx.witnesses = vec![Witness {
            items: vec![ByteArray::new(vec![0xde, 0xad])],
        }];
        let legacy = tx.serialize_legacy();
        assert_ne!(&legacy[4..6], &[0x00, 0x01]);
    }
}

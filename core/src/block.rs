//! The block domain object: an immutable, already-validated block built from
//! a [`ParsedBlock`](crate::parser::ParsedBlock) (spec §2.7/§3).

use crate::chain::Chain;
use crate::error::ParseError;
use crate::hash::Hash32;
use crate::header::Header;
use crate::parser::{self, ParseMode, ParsedBlock};
use crate::transaction::EncodedTransaction;
use std::collections::HashMap;

/// A fully parsed and internally consistent block: header, transaction
/// order, and each transaction's typed body, keyed by txid.
#[derive(Clone, Debug)]
pub struct Block {
    header: Header,
    block_hash: Hash32,
    txids: Vec<Hash32>,
    /// `Some` only when at least one transaction carries a witness.
    wtxids: Option<Vec<Hash32>>,
    transactions: HashMap<Hash32, EncodedTransaction>,
    serialized_size: usize,
}

impl Block {
    /// Build a `Block` from an already fully-parsed [`ParsedBlock`].
    /// Requires `parsed` to have been parsed in [`ParseMode::Constructing`]
    /// (every transaction's typed body must be present).
    pub fn from_parsed(parsed: ParsedBlock) -> Result<Self, ParseError> {
        let mut txids = Vec::with_capacity(parsed.transactions.len());
        let mut wtxids = Vec::with_capacity(parsed.transactions.len());
        let mut transactions = HashMap::with_capacity(parsed.transactions.len());
        let mut any_witness = false;
        let mut serialized_size = crate::header::HEADER_LEN;
        serialized_size += crate::bytes::compact_size::canonical_len(parsed.transactions.len() as u64);

        for tx in parsed.transactions {
            let encoded = tx.encoded.ok_or_else(|| {
                ParseError::invalid(
                    "block.transactions",
                    "transaction body missing; parse in Constructing mode to build a Block",
                )
            })?;
            any_witness |= encoded.is_segwit();
            serialized_size += encoded.serialize().len();
            txids.push(tx.txid);
            wtxids.push(tx.wtxid);
            transactions.insert(tx.txid, encoded);
        }

        Ok(Block {
            header: parsed.header,
            block_hash: parsed.block_hash,
            txids,
            wtxids: any_witness.then_some(wtxids),
            transactions,
            serialized_size,
        })
    }

    /// Parse and build a `Block` directly from raw bytes in one step.
    pub fn parse(data: &[u8], expected_hash: Option<Hash32>) -> Result<Self, ParseError> {
        let parsed = parser::parse_block(data, expected_hash, ParseMode::Constructing)?;
        Self::from_parsed(parsed)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn block_hash(&self) -> Hash32 {
        self.block_hash
    }

    pub fn txids(&self) -> &[Hash32] {
        &self.txids
    }

    pub fn wtxids(&self) -> Option<&[Hash32]> {
        self.wtxids.as_deref()
    }

    pub fn transaction_count(&self) -> usize {
        self.txids.len()
    }

    pub fn transaction(&self, txid: &Hash32) -> Option<&EncodedTransaction> {
        self.transactions.get(txid)
    }

    /// The coinbase is always `txids[0]`'s transaction.
    pub fn coinbase(&self) -> &EncodedTransaction {
        self.transactions
            .get(&self.txids[0])
            .expect("coinbase txid always has a matching transaction")
    }

    /// Total wire-serialized size in bytes (header + tx_count + every
    /// transaction's own serialization).
    pub fn serialized_size(&self) -> usize {
        self.serialized_size
    }

    /// BIP-141 block weight: `(base_size * 3) + total_size` for SegWit
    /// chains, collapsing to `total_size * segwit_weight_scale` for chains
    /// whose [`ChainParams::segwit_weight_scale`](crate::chain::ChainParams)
    /// is `1`.
    pub fn weight(&self, chain: Chain) -> u64 {
        let scale = chain.params().segwit_weight_scale as u64;
        let base_size: usize = self
            .transactions
            .values()
            .map(|tx| tx.serialize_legacy().len())
            .sum::<usize>()
            + crate::header::HEADER_LEN
            + crate::bytes::compact_size::canonical_len(self.txids.len() as u64);
        (base_size as u64) * (scale.saturating_sub(1)) + self.serialized_size as u64
    }
}

#[cfg(test)]
#[path = "block/tests.rs"]
mod tests;

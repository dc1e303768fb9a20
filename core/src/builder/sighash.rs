//! Signature preimages: the legacy (pre-SegWit) `tx-copy` construction and
//! the shared BIP-143 preimage used by SegWit and BCH (with `FORKID`) inputs
//! (spec §4.7 step 5).

use crate::bytes::WriteBuffer;
use crate::hash;
use crate::transaction::EncodedTransaction;

pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;
/// BCH's `FORKID` flag, OR'd into the base sighash type and appended as the
/// high bits of the 4-byte sighash type word.
pub const SIGHASH_FORKID: u32 = 0x40;

fn base_type(hash_type: u8) -> u8 {
    hash_type & 0x1f
}

/// The legacy preimage: the transaction with every scriptSig but the signed
/// input's blanked, the signed input's scriptSig set to `script_code`, the
/// 4-byte `hash_type` appended, then `sha256d`'d by the caller.
pub fn legacy_preimage(tx: &EncodedTransaction, input_index: usize, script_code: &[u8], hash_type: u8) -> Vec<u8> {
    let mut w = WriteBuffer::new();
    w.write_i32_le(tx.version);
    w.write_compact_size(tx.inputs.len() as u64);
    for (i, input) in tx.inputs.iter().enumerate() {
        input.outpoint.serialize(&mut w);
        if i == input_index {
            w.write_compact_bytes(script_code);
        } else {
            w.write_compact_size(0);
        }
        w.write_u32_le(input.sequence);
    }
    w.write_compact_size(tx.outputs.len() as u64);
    for output in &tx.outputs {
        output.serialize(&mut w);
    }
    w.write_u32_le(tx.locktime);
    w.write_u32_le(hash_type as u32);
    w.into_vec()
}

/// BIP-143 preimage shared by native SegWit inputs and BCH's `FORKID`
/// inputs. `sighash_type` is the full 4-byte word (base type, optionally
/// `| SIGHASH_ANYONECANPAY`, optionally `| SIGHASH_FORKID` for BCH).
#[allow(clippy::too_many_arguments)]
pub fn bip143_preimage(
    tx: &EncodedTransaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash_type: u32,
) -> Vec<u8> {
    let hash_type_byte = (sighash_type & 0xff) as u8;
    let anyone_can_pay = sighash_type & (SIGHASH_ANYONECANPAY as u32) != 0;
    let base = base_type(hash_type_byte);

    let hash_prevouts = if anyone_can_pay {
        crate::hash::Hash32::ZERO
    } else {
        let mut w = WriteBuffer::new();
        for input in &tx.inputs {
            input.outpoint.serialize(&mut w);
        }
        hash::sha256d(w.as_slice())
    };

    let hash_sequence = if anyone_can_pay || base == SIGHASH_SINGLE || base == SIGHASH_NONE {
        crate::hash::Hash32::ZERO
    } else {
        let mut w = WriteBuffer::new();
        for input in &tx.inputs {
            w.write_u32_le(input.sequence);
        }
        hash::sha256d(w.as_slice())
    };

    let hash_outputs = if base == SIGHASH_SINGLE {
        if input_index < tx.outputs.len() {
            let mut w = WriteBuffer::new();
            tx.outputs[input_index].serialize(&mut w);
            hash::sha256d(w.as_slice())
        } else {
            crate::hash::Hash32::ZERO
        }
    } else if base == SIGHASH_NONE {
        crate::hash::Hash32::ZERO
    } else {
        let mut w = WriteBuffer::new();
        for output in &tx.outputs {
            output.serialize(&mut w);
        }
        hash::sha256d(w.as_slice())
    };

    let mut w = WriteBuffer::new();
    w.write_i32_le(tx.version);
    w.write_bytes(hash_prevouts.as_bytes());
    w.write_bytes(hash_sequence.as_bytes());
    tx.inputs[input_index].outpoint.serialize(&mut w);
    w.write_compact_bytes(script_code);
    w.write_u64_le(value);
    w.write_u32_le(tx.inputs[input_index].sequence);
    w.write_bytes(hash_outputs.as_bytes());
    w.write_u32_le(tx.locktime);
    w.write_u32_le(sighash_type);
    w.into_vec()
}

/// The standard P2PKH script a P2WPKH witness program's `scriptCode` is
/// built from, per BIP-143: `OP_DUP OP_HASH160 <20-byte-hash> OP_EQUALVERIFY
/// OP_CHECKSIG`.
pub fn p2pkh_script_code(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut out = Vec::with_capacity(25);
    out.push(0x76); // OP_DUP
    out.push(0xa9); // OP_HASH160
    out.push(0x14); // push 20
    out.extend_from_slice(pubkey_hash);
    out.push(0x88); // OP_EQUALVERIFY
    out.push(0xac); // OP_CHECKSIG
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash32;
    use crate::transaction::{Input, Outpoint, Output};

    fn sample_tx() -> EncodedTransaction {
        EncodedTransaction {
            version: 2,
            inputs: vec![Input {
                outpoint: Outpoint {
                    txid: Hash32::from_bytes([0x11; 32]),
                    vout: 0,
                },
                script_sig: crate::bytes::ByteArray::new(Vec::new()),
                sequence: 0xffff_ffff,
            }],
            outputs: vec![Output {
                value: 90_000,
                script_pubkey: crate::bytes::ByteArray::new(vec![0x76, 0xa9, 0x14]),
                cashtoken: None,
            }],
            witnesses: Vec::new(),
            locktime: 0,
            extra_bytes: None,
        }
    }

    #[test]
    fn legacy_preimage_embeds_the_supplied_script_code_at_the_signed_index() {
        let tx = sample_tx();
        let script_code = vec![0xaa, 0xbb];
        let preimage = legacy_preimage(&tx, 0, &script_code, SIGHASH_ALL);
        // version(4) + input_count(1) + outpoint(36) + compact(2: len) + 2 bytes + sequence(4)...
        assert!(preimage.windows(2).any(|w| w == [0xaa, 0xbb]));
        let hash_type_word = u32::from_le_bytes(preimage[preimage.len() - 4..].try_into().unwrap());
        assert_eq!(hash_type_word, SIGHASH_ALL as u32);
    }

    #[test]
    fn legacy_preimage_changes_when_sequence_changes() {
        let mut tx = sample_tx();
        let base = legacy_preimage(&tx, 0, &[], SIGHASH_ALL);
        tx.inputs[0].sequence = 0;
        let changed = legacy_preimage(&tx, 0, &[], SIGHASH_ALL);
        assert_ne!(base, changed);
    }

    #[test]
    fn bip143_preimage_changes_when_value_changes() {
        let tx = sample_tx();
        let script_code = p2pkh_script_code(&[0u8; 20]);
        let a = bip143_preimage(&tx, 0, &script_code, 100_000, SIGHASH_ALL as u32);
        let b = bip143_preimage(&tx, 0, &script_code, 200_000, SIGHASH_ALL as u32);
        assert_ne!(a, b);
    }

    #[test]
    fn bip143_preimage_zeroes_hash_prevouts_under_anyonecanpay() {
        let tx = sample_tx();
        let script_code = p2pkh_script_code(&[0u8; 20]);
        let sighash_type = SIGHASH_ALL as u32 | SIGHASH_ANYONECANPAY as u32;
        let preimage = bip143_preimage(&tx, 0, &script_code, 100_000, sighash_type);
        // hashPrevouts occupies bytes [4..36).
        assert_eq!(&preimage[4..36], Hash32::ZERO.as_bytes().as_slice());
    }

    #[test]
    fn bip143_preimage_with_forkid_sets_the_high_sighash_byte() {
        let tx = sample_tx();
        let script_code = p2pkh_script_code(&[0u8; 20]);
        let sighash_type = SIGHASH_ALL as u32 | SIGHASH_FORKID;
        let preimage = bip143_preimage(&tx, 0, &script_code, 100_000, sighash_type);
        let word = u32::from_le_bytes(preimage[preimage.len() - 4..].try_into().unwrap());
        assert_eq!(word, sighash_type);
    }

    #[test]
    fn p2pkh_script_code_has_the_standard_25_byte_shape() {
        let code = p2pkh_script_code(&[0x42; 20]);
        assert_eq!(code.len(), 25);
        assert_eq!(code[0], 0x76);
        assert_eq!(code[code.len() - 1], 0xac);
    }
}

//! The transaction builder: ingests a spend proposal, reserves UTXOs, picks
//! change, applies BIP-69 ordering, signs every input, and submits to
//! broadcast (spec §4.7).

pub mod sighash;

use crate::bytes::ByteArray;
use crate::chain::Chain;
use crate::collab::{
    Broadcaster, CryptoProvider, KeyId, KeyStore, ProposalHandle, ReservePolicy, SweepScope,
    WalletDatabase,
};
use crate::error::BuilderError;
use crate::hash::Hash32;
use crate::script::{self, Pattern};
use crate::transaction::{EncodedTransaction, Input, Output, Witness};

/// Dust-threshold heuristic constant (spec §4.7: "148 × fee_rate / 1000").
const DUST_RELAY_INPUT_BYTES: u64 = 148;

pub fn dust_threshold(fee_rate: u64) -> u64 {
    (DUST_RELAY_INPUT_BYTES * fee_rate) / 1000
}

/// `weight = base × (scale − 1) + total`, matching [`crate::block::Block::weight`]'s
/// unification of the discounted/non-discounted cases.
fn transaction_weight(tx: &EncodedTransaction, scale: u32) -> u64 {
    let base = tx.serialize_legacy().len() as u64;
    let total = tx.serialize().len() as u64;
    base * (scale as u64).saturating_sub(1) + total
}

fn fee_for_weight(weight: u64, scale: u32, fee_rate: u64) -> u64 {
    let vsize = weight.div_ceil(scale as u64).max(1);
    (vsize * fee_rate).div_ceil(1000)
}

/// Which UTXOs to add and how, per spec §4.7 step 2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpendPolicy {
    Normal { reserve_policy: ReservePolicy },
    Sweep { scope: SweepScope, allow_unconfirmed: bool },
}

/// A spend proposal: the input to [`build_and_send`] (spec §4.7).
#[derive(Clone, Debug)]
pub struct Proposal {
    pub id: String,
    pub policy: SpendPolicy,
    /// Destination outputs (address spends). For a sweep with no
    /// notifications, only the first recipient's script is used; its value
    /// is overwritten with `input_value - fee`.
    pub recipients: Vec<Output>,
    /// Payment-code notification outputs, already fully valued. Present iff
    /// this proposal notifies a counterparty rather than (or in addition to)
    /// paying a destination.
    pub notifications: Vec<Output>,
    /// Satoshis per kilo-vbyte.
    pub fee_rate: u64,
    /// `(key_id, script_pubkey)` pairs available for change, tried in order;
    /// unused ones are released on early completion.
    pub change_outputs: Vec<(KeyId, Vec<u8>)>,
}

fn fixed_output_total(outputs: &[Output]) -> u64 {
    outputs.iter().map(|o| o.value).sum()
}

/// A placeholder witness sized to roughly match what a real signature would
/// cost for a UTXO's script pattern, used only to size the scratch
/// transaction during fee estimation — never part of an actual signed
/// transaction. Non-witness patterns estimate as empty, same as today.
fn estimated_witness(script_pubkey: &[u8]) -> Witness {
    match script::classify(&script::Script::parse(script_pubkey)) {
        Pattern::P2wpkh => Witness {
            items: vec![ByteArray::new(vec![0u8; 72]), ByteArray::new(vec![0u8; 33])],
        },
        Pattern::P2wsh | Pattern::P2tr => Witness {
            items: vec![ByteArray::new(vec![0u8; 64])],
        },
        _ => Witness::default(),
    }
}

/// Build an unsigned scratch transaction for fee estimation, with
/// placeholder empty scriptSigs and per-input witness size estimates so
/// SegWit inputs aren't systematically under-weighted during coin selection.
fn scratch_transaction(utxos: &[crate::collab::Utxo], outputs: &[Output]) -> EncodedTransaction {
    EncodedTransaction {
        version: 2,
        inputs: utxos
            .iter()
            .map(|u| Input {
                outpoint: u.outpoint.clone(),
                script_sig: ByteArray::new(Vec::new()),
                sequence: 0xffff_ffff,
            })
            .collect(),
        outputs: outputs.to_vec(),
        witnesses: utxos
            .iter()
            .map(|u| estimated_witness(&u.script_pubkey))
            .collect(),
        locktime: 0,
        extra_bytes: None,
    }
}

/// Run the full build-and-send algorithm described in spec §4.7, calling
/// through the collaborator traits for everything this crate does not own
/// (key material, UTXO storage, broadcast).
pub async fn build_and_send(
    proposal: &Proposal,
    chain: Chain,
    db: &dyn WalletDatabase,
    keystore: &dyn KeyStore,
    crypto: &dyn CryptoProvider,
    broadcaster: &dyn Broadcaster,
    handle: &dyn ProposalHandle,
) -> Result<Hash32, BuilderError> {
    let scale = chain.params().segwit_weight_scale;
    let dust = dust_threshold(proposal.fee_rate);

    // Step 1: intake existing reservations.
    let mut utxos = db.get_reserved(&proposal.id).await?;

    // Step 2: branch on policy.
    let outputs_before_change = match &proposal.policy {
        SpendPolicy::Normal { reserve_policy } => {
            let mut outputs = proposal.recipients.clone();
            outputs.extend(proposal.notifications.clone());
            loop {
                let scratch = scratch_transaction(&utxos, &outputs);
                let weight = transaction_weight(&scratch, scale);
                let fee = fee_for_weight(weight, scale, proposal.fee_rate);
                let input_total: u64 = utxos.iter().map(|u| u.value).sum();
                let output_total = fixed_output_total(&outputs);
                if input_total >= output_total + fee {
                    break outputs;
                }
                match db.reserve_utxo(&proposal.id, *reserve_policy).await? {
                    Some(utxo) => utxos.push(utxo),
                    None => {
                        let needed = output_total + fee;
                        return Err(match reserve_policy {
                            ReservePolicy::ConfirmedOnly => BuilderError::InsufficientConfirmedFunds {
                                needed,
                                available: input_total,
                            },
                            ReservePolicy::AllowUnconfirmedIncoming => BuilderError::InsufficientFunds {
                                needed,
                                available: input_total,
                            },
                        });
                    }
                }
            }
        }
        SpendPolicy::Sweep { scope, allow_unconfirmed } => {
            let swept = db
                .reserve_sweep(&proposal.id, scope, *allow_unconfirmed)
                .await?;
            utxos.extend(swept);
            let input_total: u64 = utxos.iter().map(|u| u.value).sum();

            if !proposal.notifications.is_empty() {
                proposal.notifications.clone()
            } else {
                let destination = proposal
                    .recipients
                    .first()
                    .ok_or_else(|| BuilderError::OutputCreationError("sweep has no destination recipient".into()))?;
                let placeholder = vec![destination.clone()];
                let scratch = scratch_transaction(&utxos, &placeholder);
                let weight = transaction_weight(&scratch, scale);
                let fee = fee_for_weight(weight, scale, proposal.fee_rate);
                if input_total < fee + dust {
                    return Err(BuilderError::InsufficientFunds {
                        needed: fee + dust,
                        available: input_total,
                    });
                }
                vec![Output {
                    value: input_total - fee,
                    script_pubkey: destination.script_pubkey.clone(),
                    cashtoken: None,
                }]
            }
        }
    };

    if utxos.is_empty() {
        return Err(BuilderError::InputCreationError("no inputs reserved".into()));
    }

    // Step 3: finalize outputs — add/trim change.
    let input_total: u64 = utxos.iter().map(|u| u.value).sum();
    let output_total_before_change = fixed_output_total(&outputs_before_change);

    let mut change_candidates = proposal.change_outputs.clone();
    let mut outputs = outputs_before_change.clone();
    let mut used_change_keys: Vec<KeyId> = Vec::new();

    let is_sweep_without_notifications =
        matches!(proposal.policy, SpendPolicy::Sweep { .. }) && proposal.notifications.is_empty();

    if !is_sweep_without_notifications {
        if let Some((key_id, script_pubkey)) = change_candidates.first().cloned() {
            let mut with_change = outputs.clone();
            with_change.push(Output {
                value: 0,
                script_pubkey: ByteArray::new(script_pubkey.clone()),
                cashtoken: None,
            });
            let scratch = scratch_transaction(&utxos, &with_change);
            let weight = transaction_weight(&scratch, scale);
            let fee = fee_for_weight(weight, scale, proposal.fee_rate);

            let excess = input_total.saturating_sub(output_total_before_change + fee);
            if excess < dust {
                // Drop the change output; any dust is absorbed into the fee.
                change_candidates.clear();
            } else {
                outputs.push(Output {
                    value: excess,
                    script_pubkey: ByteArray::new(script_pubkey),
                    cashtoken: None,
                });
                used_change_keys.push(key_id);
            }
        }
    }

    // Step 4: BIP-69 order.
    let mut ordered_utxos = utxos.clone();
    ordered_utxos.sort_by_key(|u| u.outpoint.sort_key());
    outputs.sort_by_key(|o| o.sort_key());

    let unsigned = EncodedTransaction {
        version: 2,
        inputs: ordered_utxos
            .iter()
            .map(|u| Input {
                outpoint: u.outpoint.clone(),
                script_sig: ByteArray::new(Vec::new()),
                sequence: 0xffff_ffff,
            })
            .collect(),
        outputs,
        witnesses: Vec::new(),
        locktime: 0,
        extra_bytes: None,
    };

    // A proposal that expired while we were reserving/sizing inputs must not
    // be broadcast; release whatever we reserved and bail out.
    if handle.is_expired().await {
        release_reserved_keys(db, handle, &used_change_keys).await;
        return Err(BuilderError::ProposalExpired);
    }

    // Step 5: sign each input.
    let signed = match sign_transaction(&unsigned, &ordered_utxos, chain, keystore, crypto).await {
        Ok(tx) => tx,
        Err(e) => {
            release_reserved_keys(db, handle, &used_change_keys).await;
            return Err(e);
        }
    };

    // Step 6: serialize, broadcast, persist.
    let txid = signed.txid();
    match broadcaster.broadcast(&signed).await {
        Ok(true) => {
            db.finalize_proposal(&proposal.id, &signed).await?;
            handle.add_notification(txid).await;
            Ok(txid)
        }
        Ok(false) => {
            release_reserved_keys(db, handle, &used_change_keys).await;
            Err(BuilderError::SendFailed("broadcaster rejected the transaction".into()))
        }
        Err(e) => {
            release_reserved_keys(db, handle, &used_change_keys).await;
            Err(e)
        }
    }
}

async fn release_reserved_keys(db: &dyn WalletDatabase, handle: &dyn ProposalHandle, change_keys: &[KeyId]) {
    let mut keys = handle.outgoing_keys().await;
    keys.extend(change_keys.iter().cloned());
    if keys.is_empty() {
        return;
    }
    if let Err(e) = db.release_keys(handle.proposal_id(), &keys).await {
        tracing::warn!(error = %e, "failed to release reserved keys after a failed send");
    }
}

async fn sign_transaction(
    unsigned: &EncodedTransaction,
    utxos: &[crate::collab::Utxo],
    chain: Chain,
    keystore: &dyn KeyStore,
    crypto: &dyn CryptoProvider,
) -> Result<EncodedTransaction, BuilderError> {
    let mut inputs = unsigned.inputs.clone();
    let mut witnesses = vec![Witness::default(); inputs.len()];
    let is_bch = chain == Chain::BitcoinCash;

    for (index, utxo) in utxos.iter().enumerate() {
        let element = keystore.get(&utxo.key_id).await?;
        let pattern = script::classify(&script::Script::parse(&utxo.script_pubkey));

        let (script_sig, witness) = sign_input(
            unsigned,
            index,
            utxo,
            pattern,
            &element.public_key,
            is_bch,
            crypto,
        )
        .await?;

        inputs[index].script_sig = ByteArray::new(script_sig);
        witnesses[index] = witness;
    }

    let any_witness = witnesses.iter().any(|w| !w.is_empty());
    Ok(EncodedTransaction {
        version: unsigned.version,
        inputs,
        outputs: unsigned.outputs.clone(),
        witnesses: if any_witness { witnesses } else { Vec::new() },
        locktime: unsigned.locktime,
        extra_bytes: None,
    })
}

fn push(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 5);
    if data.len() <= 0x4b {
        out.push(data.len() as u8);
    } else if data.len() <= 0xff {
        out.push(0x4c);
        out.push(data.len() as u8);
    } else {
        out.push(0x4d);
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(data);
    out
}

async fn sign_input(
    tx: &EncodedTransaction,
    index: usize,
    utxo: &crate::collab::Utxo,
    pattern: Pattern,
    pubkey: &[u8],
    is_bch: bool,
    crypto: &dyn CryptoProvider,
) -> Result<(Vec<u8>, Witness), BuilderError> {
    let key = crate::collab::KeyMaterial {
        public_key: pubkey.to_vec(),
    };

    match pattern {
        Pattern::P2pkh => {
            if is_bch {
                let pubkey_hash = crate::hash::hash160(pubkey);
                let script_code = sighash::p2pkh_script_code(&pubkey_hash);
                let sighash_type = sighash::SIGHASH_ALL as u32 | sighash::SIGHASH_FORKID;
                let preimage =
                    sighash::bip143_preimage(tx, index, &script_code, utxo.value, sighash_type);
                let digest = crate::hash::sha256d(&preimage);
                let mut sig = crypto.sign_der(&key, digest.as_bytes(), sighash::SIGHASH_ALL | 0x40).await?;
                sig.push(sighash::SIGHASH_ALL | 0x40);
                let mut script_sig = push(&sig);
                script_sig.extend(push(pubkey));
                Ok((script_sig, Witness::default()))
            } else {
                let preimage = sighash::legacy_preimage(tx, index, &utxo.script_pubkey, sighash::SIGHASH_ALL);
                let digest = crate::hash::sha256d(&preimage);
                let mut sig = crypto.sign_der(&key, digest.as_bytes(), sighash::SIGHASH_ALL).await?;
                sig.push(sighash::SIGHASH_ALL);
                let mut script_sig = push(&sig);
                script_sig.extend(push(pubkey));
                Ok((script_sig, Witness::default()))
            }
        }
        Pattern::P2pk => {
            let preimage = sighash::legacy_preimage(tx, index, &utxo.script_pubkey, sighash::SIGHASH_ALL);
            let digest = crate::hash::sha256d(&preimage);
            let mut sig = crypto.sign_der(&key, digest.as_bytes(), sighash::SIGHASH_ALL).await?;
            sig.push(sighash::SIGHASH_ALL);
            Ok((push(&sig), Witness::default()))
        }
        Pattern::P2wpkh => {
            let pubkey_hash = crate::hash::hash160(pubkey);
            let script_code = sighash::p2pkh_script_code(&pubkey_hash);
            let preimage = sighash::bip143_preimage(tx, index, &script_code, utxo.value, sighash::SIGHASH_ALL as u32);
            let digest = crate::hash::sha256d(&preimage);
            let mut sig = crypto.sign_der(&key, digest.as_bytes(), sighash::SIGHASH_ALL).await?;
            sig.push(sighash::SIGHASH_ALL);
            Ok((
                Vec::new(),
                Witness {
                    items: vec![ByteArray::new(sig), ByteArray::new(pubkey.to_vec())],
                },
            ))
        }
        Pattern::P2ms { m, n } => {
            if m != 1 || n != 3 {
                return Err(BuilderError::UnsupportedMultisig { m, n });
            }
            let preimage = sighash::legacy_preimage(tx, index, &utxo.script_pubkey, sighash::SIGHASH_ALL);
            let digest = crate::hash::sha256d(&preimage);
            let mut sig = crypto.sign_der(&key, digest.as_bytes(), sighash::SIGHASH_ALL).await?;
            sig.push(sighash::SIGHASH_ALL);
            // OP_CHECKMULTISIG's off-by-one bug requires a leading dummy element.
            let mut script_sig = vec![0x00];
            script_sig.extend(push(&sig));
            Ok((script_sig, Witness::default()))
        }
        Pattern::P2wsh | Pattern::P2tr | Pattern::P2sh | Pattern::OpReturn | Pattern::WitnessCommitment | Pattern::NonStandard => {
            Err(BuilderError::SignatureError(format!(
                "no witness-script/taproot key material available to sign a {pattern:?} input"
            )))
        }
    }
}

#[cfg(test)]
#[path = "builder/tests.rs"]
mod tests;

use super::*;
use crate::bytes::ByteArray;
use crate::collab::{Element, KeyMaterial, Utxo};
use std::sync::Mutex;

fn p2pkh_script(pubkey_hash: [u8; 20]) -> Vec<u8> {
    sighash::p2pkh_script_code(&pubkey_hash)
}

#[test]
fn dust_threshold_matches_the_148_byte_reference_heuristic() {
    assert_eq!(dust_threshold(1000), 148);
    assert_eq!(dust_threshold(0), 0);
}

#[test]
fn transaction_weight_of_a_legacy_only_tx_has_no_witness_discount() {
    let tx = scratch_transaction(
        &[Utxo {
            outpoint: Outpoint {
                txid: Hash32::ZERO,
                vout: 0,
            },
            value: 2000,
            script_pubkey: vec![0x51],
            key_id: KeyId("k".to_string()),
            confirmed: true,
        }],
        &[Output {
            value: 1000,
            script_pubkey: ByteArray::new(vec![0x51]),
            cashtoken: None,
        }],
    );
    let weight = transaction_weight(&tx, 4);
    assert_eq!(weight, tx.serialize().len() as u64 * 4);
}

#[test]
fn transaction_weight_of_a_segwit_input_reflects_estimated_witness_bytes() {
    let legacy_tx = scratch_transaction(
        &[Utxo {
            outpoint: Outpoint {
                txid: Hash32::ZERO,
                vout: 0,
            },
            value: 2000,
            script_pubkey: vec![0x51],
            key_id: KeyId("k".to_string()),
            confirmed: true,
        }],
        &[Output {
            value: 1000,
            script_pubkey: ByteArray::new(vec![0x51]),
            cashtoken: None,
        }],
    );
    let p2wpkh_script = {
        let mut s = vec![0x00, 0x14];
        s.extend_from_slice(&[0u8; 20]);
        s
    };
    let segwit_tx = scratch_transaction(
        &[Utxo {
            outpoint: Outpoint {
                txid: Hash32::ZERO,
                vout: 0,
            },
            value: 2000,
            script_pubkey: p2wpkh_script,
            key_id: KeyId("k".to_string()),
            confirmed: true,
        }],
        &[Output {
            value: 1000,
            script_pubkey: ByteArray::new(vec![0x51]),
            cashtoken: None,
        }],
    );
    // A scratch transaction built from a P2WPKH UTXO must carry a non-empty
    // witness estimate, so its weight reflects (discounted) witness bytes
    // instead of being computed as if the input were legacy.
    assert!(segwit_tx.is_segwit());
    assert!(!legacy_tx.is_segwit());
    let legacy_weight = transaction_weight(&legacy_tx, 4);
    let segwit_weight = transaction_weight(&segwit_tx, 4);
    assert!(segwit_weight > legacy_weight);
}

struct MockDb {
    queue: Mutex<Vec<Utxo>>,
    finalized: Mutex<Option<EncodedTransaction>>,
    released: Mutex<Vec<KeyId>>,
}

#[async_trait::async_trait]
impl WalletDatabase for MockDb {
    async fn get_reserved(&self, _proposal_id: &str) -> Result<Vec<Utxo>, BuilderError> {
        Ok(Vec::new())
    }

    async fn reserve_utxo(
        &self,
        _proposal_id: &str,
        _policy: ReservePolicy,
    ) -> Result<Option<Utxo>, BuilderError> {
        Ok(self.queue.lock().unwrap().pop())
    }

    async fn reserve_outpoint(
        &self,
        _proposal_id: &str,
        _outpoint: &Outpoint,
    ) -> Result<Option<Utxo>, BuilderError> {
        unimplemented!("not exercised by the normal-spend scenario")
    }

    async fn reserve_sweep(
        &self,
        _proposal_id: &str,
        _scope: &SweepScope,
        _allow_unconfirmed: bool,
    ) -> Result<Vec<Utxo>, BuilderError> {
        unimplemented!("not exercised by the normal-spend scenario")
    }

    async fn release_keys(&self, _proposal_id: &str, keys: &[KeyId]) -> Result<(), BuilderError> {
        self.released.lock().unwrap().extend(keys.iter().cloned());
        Ok(())
    }

    async fn finalize_proposal(
        &self,
        _proposal_id: &str,
        tx: &EncodedTransaction,
    ) -> Result<(), BuilderError> {
        *self.finalized.lock().unwrap() = Some(tx.clone());
        Ok(())
    }
}

struct MockKeyStore {
    pubkey: Vec<u8>,
}

#[async_trait::async_trait]
impl KeyStore for MockKeyStore {
    async fn get(&self, key_id: &KeyId) -> Result<Element, BuilderError> {
        Ok(Element {
            key_id: key_id.clone(),
            public_key: self.pubkey.clone(),
        })
    }
}

struct MockCrypto;

#[async_trait::async_trait]
impl CryptoProvider for MockCrypto {
    async fn sign_der(
        &self,
        _key: &KeyMaterial,
        _preimage: &[u8],
        _hash_type: u8,
    ) -> Result<Vec<u8>, BuilderError> {
        Ok(vec![0xAB; 70])
    }
}

struct MockBroadcaster {
    calls: Mutex<usize>,
}

#[async_trait::async_trait]
impl Broadcaster for MockBroadcaster {
    async fn broadcast(&self, _tx: &EncodedTransaction) -> Result<bool, BuilderError> {
        *self.calls.lock().unwrap() += 1;
        Ok(true)
    }
}

struct MockHandle {
    notified: Mutex<Option<Hash32>>,
}

#[async_trait::async_trait]
impl ProposalHandle for MockHandle {
    fn proposal_id(&self) -> &str {
        "proposal-1"
    }

    async fn is_expired(&self) -> bool {
        false
    }

    async fn add_notification(&self, txid: Hash32) {
        *self.notified.lock().unwrap() = Some(txid);
    }

    async fn outgoing_keys(&self) -> Vec<KeyId> {
        Vec::new()
    }
}

#[tokio::test]
async fn p2pkh_normal_spend_produces_two_outputs_and_broadcasts_once() {
    let pubkey = vec![0x02; 33];
    let pubkey_hash = crate::hash::hash160(&pubkey);
    let spender_script = p2pkh_script(pubkey_hash);

    let destination_script = p2pkh_script([0x99; 20]);
    let change_script = p2pkh_script([0x88; 20]);

    let utxo = Utxo {
        outpoint: Outpoint {
            txid: Hash32::from_bytes([0x01; 32]),
            vout: 0,
        },
        value: 100_000,
        script_pubkey: spender_script,
        key_id: KeyId("spender-key".to_string()),
        confirmed: true,
    };

    let db = MockDb {
        queue: Mutex::new(vec![utxo]),
        finalized: Mutex::new(None),
        released: Mutex::new(Vec::new()),
    };
    let keystore = MockKeyStore { pubkey: pubkey.clone() };
    let crypto = MockCrypto;
    let broadcaster = MockBroadcaster { calls: Mutex::new(0) };
    let handle = MockHandle { notified: Mutex::new(None) };

    let proposal = Proposal {
        id: "proposal-1".to_string(),
        policy: SpendPolicy::Normal {
            reserve_policy: ReservePolicy::ConfirmedOnly,
        },
        recipients: vec![Output {
            value: 50_000,
            script_pubkey: ByteArray::new(destination_script.clone()),
            cashtoken: None,
        }],
        notifications: Vec::new(),
        fee_rate: 1_000,
        change_outputs: vec![(KeyId("change-key".to_string()), change_script)],
    };

    let txid = build_and_send(
        &proposal,
        Chain::Bitcoin,
        &db,
        &keystore,
        &crypto,
        &broadcaster,
        &handle,
    )
    .await
    .expect("scenario is fully funded and should succeed");

    assert_eq!(*broadcaster.calls.lock().unwrap(), 1);
    assert_eq!(*handle.notified.lock().unwrap(), Some(txid));

    let finalized = db.finalized.lock().unwrap().clone().expect("finalized");
    assert_eq!(finalized.txid(), txid);
    assert_eq!(finalized.outputs.len(), 2);
    assert_eq!(finalized.inputs.len(), 1);

    let script_sig = finalized.inputs[0].script_sig.as_slice();
    // <sig+sighash byte> <pubkey>: first push is 71 bytes (70-byte fake sig + 1 sighash byte).
    assert_eq!(script_sig[0], 71);
    assert_eq!(script_sig[1 + 71], 33); // second push length: the 33-byte pubkey
}

#[tokio::test]
async fn insufficient_funds_releases_no_reservations_and_does_not_broadcast() {
    let db = MockDb {
        queue: Mutex::new(Vec::new()),
        finalized: Mutex::new(None),
        released: Mutex::new(Vec::new()),
    };
    let keystore = MockKeyStore { pubkey: vec![0x02; 33] };
    let crypto = MockCrypto;
    let broadcaster = MockBroadcaster { calls: Mutex::new(0) };
    let handle = MockHandle { notified: Mutex::new(None) };

    let proposal = Proposal {
        id: "proposal-2".to_string(),
        policy: SpendPolicy::Normal {
            reserve_policy: ReservePolicy::ConfirmedOnly,
        },
        recipients: vec![Output {
            value: 50_000,
            script_pubkey: ByteArray::new(p2pkh_script([0x99; 20])),
            cashtoken: None,
        }],
        notifications: Vec::new(),
        fee_rate: 1_000,
        change_outputs: Vec::new(),
    };

    let result = build_and_send(
        &proposal,
        Chain::Bitcoin,
        &db,
        &keystore,
        &crypto,
        &broadcaster,
        &handle,
    )
    .await;

    assert!(matches!(
        result,
        Err(BuilderError::InsufficientConfirmedFunds { .. })
    ));
    assert_eq!(*broadcaster.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn unsupported_multisig_is_rejected_before_broadcasting() {
    let pubkeys: Vec<Vec<u8>> = (0..3).map(|i| vec![i as u8; 33]).collect();
    let mut script = vec![0x52]; // OP_2 (2-of-3, not the supported 1-of-3)
    for pk in &pubkeys {
        script.push(pk.len() as u8);
        script.extend_from_slice(pk);
    }
    script.push(0x53); // OP_3
    script.push(0xae); // OP_CHECKMULTISIG

    let utxo = Utxo {
        outpoint: Outpoint {
            txid: Hash32::from_bytes([0x02; 32]),
            vout: 0,
        },
        value: 100_000,
        script_pubkey: script,
        key_id: KeyId("ms-key".to_string()),
        confirmed: true,
    };

    let db = MockDb {
        queue: Mutex::new(vec![utxo]),
        finalized: Mutex::new(None),
        released: Mutex::new(Vec::new()),
    };
    let keystore = MockKeyStore { pubkey: vec![0x02; 33] };
    let crypto = MockCrypto;
    let broadcaster = MockBroadcaster { calls: Mutex::new(0) };
    let handle = MockHandle { notified: Mutex::new(None) };

    let proposal = Proposal {
        id: "proposal-3".to_string(),
        policy: SpendPolicy::Normal {
            reserve_policy: ReservePolicy::ConfirmedOnly,
        },
        recipients: vec![Output {
            value: 50_000,
            script_pubkey: ByteArray::new(p2pkh_script([0x99; 20])),
            cashtoken: None,
        }],
        notifications: Vec::new(),
        fee_rate: 1_000,
        change_outputs: Vec::new(),
    };

    let result = build_and_send(
        &proposal,
        Chain::Bitcoin,
        &db,
        &keystore,
        &crypto,
        &broadcaster,
        &handle,
    )
    .await;

    assert!(matches!(
        result,
        Err(BuilderError::UnsupportedMultisig { m: 2, n: 3 })
    ));
    assert_eq!(*broadcaster.calls.lock().unwrap(), 0);
}

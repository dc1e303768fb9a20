//! Trait interfaces for collaborators the builder calls through but this
//! crate does not implement: crypto signing, key storage, UTXO/proposal
//! persistence, and broadcast (spec §6).

use async_trait::async_trait;

use crate::error::BuilderError;
use crate::hash::Hash32;
use crate::transaction::{EncodedTransaction, Outpoint};

/// `crypto.sha256d`/`hash160`/`siphash24` are implemented directly in
/// [`crate::hash`]; this trait covers only the collaborator operation this
/// crate cannot perform itself — producing a signature over a preimage it
/// has no access to the private key for.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    async fn sign_der(
        &self,
        key: &KeyMaterial,
        preimage: &[u8],
        hash_type: u8,
    ) -> Result<Vec<u8>, BuilderError>;
}

/// Opaque handle to a private key held by the collaborator; this crate never
/// observes the key bytes, only what it needs to build scriptSigs/witnesses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyMaterial {
    pub public_key: Vec<u8>,
}

/// A reference to a key the keystore can resolve to signing material.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyId(pub String);

/// A resolved key: an opaque reference plus its public key, with signing
/// delegated back through [`CryptoProvider`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub key_id: KeyId,
    pub public_key: Vec<u8>,
}

#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, key_id: &KeyId) -> Result<Element, BuilderError>;
}

/// A spendable UTXO as returned by the wallet database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: Outpoint,
    pub value: u64,
    pub script_pubkey: Vec<u8>,
    pub key_id: KeyId,
    pub confirmed: bool,
}

/// Coin-selection policy for a reservation request, per spec §4.7 step 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReservePolicy {
    ConfirmedOnly,
    AllowUnconfirmedIncoming,
}

/// What a sweep enumerates UTXOs over, per spec §4.7 step 2's "account /
/// subaccount / key" sweep variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SweepScope {
    Account { account_id: String },
    Subaccount { account_id: String, subaccount_id: String },
    Key { key_id: KeyId },
}

#[async_trait]
pub trait WalletDatabase: Send + Sync {
    /// Fetch UTXOs already reserved for `proposal_id` (spec §4.7 step 1).
    async fn get_reserved(&self, proposal_id: &str) -> Result<Vec<Utxo>, BuilderError>;

    /// Reserve one additional UTXO under `policy` for `proposal_id`.
    async fn reserve_utxo(
        &self,
        proposal_id: &str,
        policy: ReservePolicy,
    ) -> Result<Option<Utxo>, BuilderError>;

    /// Reserve a specific, already-identified outpoint (used by sweep).
    async fn reserve_outpoint(
        &self,
        proposal_id: &str,
        outpoint: &Outpoint,
    ) -> Result<Option<Utxo>, BuilderError>;

    /// Enumerate and reserve every spendable UTXO in `scope`, preferring
    /// confirmed and falling back to unconfirmed only if `allow_unconfirmed`
    /// (spec §4.7 step 2, sweep branch).
    async fn reserve_sweep(
        &self,
        proposal_id: &str,
        scope: &SweepScope,
        allow_unconfirmed: bool,
    ) -> Result<Vec<Utxo>, BuilderError>;

    /// Release previously reserved keys (change and outgoing payment-code
    /// keys) without finalizing — called on any failure after reservation.
    async fn release_keys(&self, proposal_id: &str, keys: &[KeyId]) -> Result<(), BuilderError>;

    /// Record the finished transaction against the proposal.
    async fn finalize_proposal(
        &self,
        proposal_id: &str,
        tx: &EncodedTransaction,
    ) -> Result<(), BuilderError>;
}

#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, tx: &EncodedTransaction) -> Result<bool, BuilderError>;
}

/// The caller-supplied promise the builder resolves: add the finished
/// proto/notification, check expiry, and enumerate the proposal's own
/// outgoing keys for release on failure (spec §6, §4.7 step 6).
#[async_trait]
pub trait ProposalHandle: Send + Sync {
    fn proposal_id(&self) -> &str;

    async fn is_expired(&self) -> bool;

    async fn add_notification(&self, txid: Hash32);

    /// Keys change/outgoing-payment-code outputs derived for this proposal,
    /// released on any failure after reservation.
    async fn outgoing_keys(&self) -> Vec<KeyId>;
}

//! Crate-wide error taxonomy. One enum per concern, composed into [`CoreError`].

use thiserror::Error;

/// A field could not be parsed because too few bytes remained.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("short read while parsing {context}: needed {needed} bytes, had {available}")]
pub struct ParseShort {
    pub context: &'static str,
    pub needed: usize,
    pub available: usize,
}

/// Parsing errors: either not enough bytes (`Short`) or a field that parsed
/// but is semantically wrong (`Invalid`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Short(#[from] ParseShort),
    #[error("invalid {context}: {reason}")]
    Invalid {
        context: &'static str,
        reason: String,
    },
}

impl ParseError {
    pub fn short(context: &'static str, needed: usize, available: usize) -> Self {
        ParseShort {
            context,
            needed,
            available,
        }
        .into()
    }

    pub fn invalid(context: &'static str, reason: impl Into<String>) -> Self {
        ParseError::Invalid {
            context,
            reason: reason.into(),
        }
    }
}

/// A computed commitment (block hash, merkle root, witness commitment) did not
/// match what was expected or what was embedded in the data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("block hash mismatch: expected {expected}, computed {computed}")]
    BlockHash { expected: String, computed: String },
    #[error("merkle root mismatch: header has {header}, computed {computed}")]
    MerkleRoot { header: String, computed: String },
    #[error("witness commitment mismatch: coinbase has {embedded}, computed {computed}")]
    WitnessCommitment { embedded: String, computed: String },
    #[error("segwit transaction present but coinbase carries no witness commitment")]
    MissingWitnessCommitment,
}

/// Errors surfaced while encoding/decoding P2P wire messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("payload checksum mismatch for command {command:?}")]
    ChecksumMismatch { command: String },
    #[error("payload length {declared} exceeds frame budget {limit}")]
    PayloadTooLarge { declared: u32, limit: u32 },
    #[error("command {0:?} is not in the known dispatch table")]
    UnknownCommand(String),
}

/// Errors from the GCS / BIP-158 compact filter codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("golomb-rice stream ended mid-codeword")]
    TruncatedCodeword,
    #[error("filter header chain mismatch: expected {expected}, computed {computed}")]
    HeaderChainMismatch { expected: String, computed: String },
}

/// Outcome taxonomy for the transaction builder, mirroring spec §4.7/§7's
/// `SendResult` enum. `Sent` is the sole success variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuilderError {
    #[error("unspecified send error")]
    Unspecified,
    #[error("failed to construct change output: {0}")]
    ChangeError(String),
    #[error("failed to create input: {0}")]
    InputCreationError(String),
    #[error("failed to create output: {0}")]
    OutputCreationError(String),
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("insufficient confirmed funds: need {needed}, have {available} confirmed")]
    InsufficientConfirmedFunds { needed: u64, available: u64 },
    #[error("signature error: {0}")]
    SignatureError(String),
    #[error("serialization error: {0}")]
    SerializationError(String),
    #[error("database error: {0}")]
    DatabaseError(String),
    #[error("broadcast failed: {0}")]
    SendFailed(String),
    #[error("only 1-of-3 multisig signing is supported (requested {m}-of-{n})")]
    UnsupportedMultisig { m: u8, n: u8 },
    #[error("proposal expired before broadcast")]
    ProposalExpired,
}

/// Top-level error type a caller outside this crate is expected to match on.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Commitment(#[from] CommitmentError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Builder(#[from] BuilderError),
}

pub type ParseResult<T> = Result<T, ParseError>;
pub type CodecResult<T> = Result<T, CodecError>;
pub type FilterResult<T> = Result<T, FilterError>;
pub type BuilderResult<T> = Result<T, BuilderError>;

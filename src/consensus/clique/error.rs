//! Clique consensus errors.

use alloy_primitives::Address;

/// Result type for Clique operations.
pub type CliqueResult<T> = Result<T, CliqueError>;

/// Clique-specific error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CliqueError {
    /// Unknown block (genesis or header without a number we can verify).
    #[error("unknown block")]
    UnknownBlock,

    /// Block timestamp ahead of the local clock.
    #[error("block in the future")]
    FutureBlock,

    /// Beneficiary set on a checkpoint block.
    #[error("beneficiary in checkpoint block must be zero")]
    InvalidCheckpointBeneficiary,

    /// Vote nonce is neither all-ones nor all-zeros.
    #[error("invalid vote nonce")]
    InvalidVote,

    /// Non-drop vote nonce on a checkpoint block.
    #[error("vote nonce in checkpoint block must be zero")]
    InvalidCheckpointVote,

    /// Extra-data shorter than the vanity prefix.
    #[error("extra-data 32 byte vanity prefix missing")]
    MissingVanity,

    /// Extra-data shorter than vanity plus seal.
    #[error("extra-data 65 byte signature suffix missing")]
    MissingSignature,

    /// Signer list present on a non-checkpoint block.
    #[error("non-checkpoint block contains extra signer list")]
    ExtraSigners,

    /// Malformed signer list on a checkpoint block.
    #[error("invalid signer list on checkpoint block")]
    InvalidCheckpointSigners,

    /// Checkpoint signer list disagrees with the resolved snapshot.
    #[error("checkpoint signer list mismatch at block {number}")]
    MismatchingCheckpointSigners {
        /// Number of the offending checkpoint block.
        number: u64,
    },

    /// Non-zero mix digest.
    #[error("non-zero mix digest")]
    InvalidMixDigest,

    /// Non-empty uncle hash.
    #[error("non empty uncle hash")]
    InvalidUncleHash,

    /// Difficulty is neither the in-turn nor the out-of-turn value.
    #[error("invalid difficulty")]
    InvalidDifficulty,

    /// Difficulty does not match the sealer's turn.
    #[error("wrong difficulty for signer turn")]
    WrongDifficulty,

    /// Timestamp below the parent timestamp plus the block period.
    #[error("invalid timestamp")]
    InvalidTimestamp,

    /// Parent header unavailable or mismatching.
    #[error("unknown ancestor")]
    UnknownAncestor,

    /// Headers handed to snapshot replay are not contiguous.
    #[error("invalid voting chain")]
    InvalidVotingChain,

    /// Sealer is not in the authorised set.
    #[error("unauthorized signer {0}")]
    UnauthorizedSigner(Address),

    /// Sealer already signed inside the recency window.
    #[error("signer {0} recently signed")]
    RecentlySigned(Address),

    /// Seal signature bytes cannot be parsed.
    #[error("malformed seal signature: {0}")]
    SignatureMalformed(String),

    /// ECDSA recovery failed to produce a public key.
    #[error("public key derivation failed: {0}")]
    PublicKeyDerivation(String),

    /// Parent-relative gas rule violation.
    #[error("invalid gas usage: {0}")]
    InvalidGas(String),

    /// No local signer has been configured on this node.
    #[error("no local signer configured")]
    SignerUnavailable,

    /// Zero-period chain refusing to seal an empty block.
    #[error("sealing paused while waiting for transactions")]
    WaitingForTransactions,

    /// The local signer must wait for others before sealing again.
    #[error("signed recently, must wait for others")]
    SignedRecently,

    /// Cancellation was requested.
    #[error("operation stopped")]
    Stopped,

    /// Persistent snapshot store failure.
    #[error("snapshot store failure: {0}")]
    Store(String),
}

impl CliqueError {
    /// Whether the caller may retry later: clock drift, missing parents,
    /// seal backoff, and cancellation. Everything else is fatal for the
    /// header (or chain segment) it was reported for.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::FutureBlock
                | Self::UnknownAncestor
                | Self::WaitingForTransactions
                | Self::SignedRecently
                | Self::Stopped
        )
    }
}

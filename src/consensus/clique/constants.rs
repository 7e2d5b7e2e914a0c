//! Clique consensus constants for header `extraData` parsing, voting
//! nonces, and the snapshot/caching layer. Values follow EIP-225.

use alloy_primitives::{B64, U256};
use std::time::Duration;

/// Fixed 32-byte vanity prefix present in every header's extra-data.
pub const EXTRA_VANITY: usize = 32;
/// Fixed 65-byte ECDSA signature suffix (r, s, v).
pub const EXTRA_SEAL: usize = 65;
/// Size of each signer address (20 bytes) in a checkpoint signer list.
pub const ADDRESS_LENGTH: usize = 20;

/// Default number of blocks after which pending votes reset and the
/// checkpoint signer list is embedded.
pub const EPOCH_LENGTH: u64 = 30_000;
/// Default minimum spacing between consecutive blocks, in seconds.
pub const BLOCK_PERIOD: u64 = 15;

/// Number of blocks after which the resolver persists a snapshot.
pub const CHECKPOINT_INTERVAL: u64 = 1024;
/// Capacity of the in-memory snapshot cache.
pub const INMEMORY_SNAPSHOTS: u32 = 128;
/// Capacity of the recovered-signer cache.
pub const INMEMORY_SIGNATURES: u32 = 4096;
/// Trail length past which a bare epoch header is accepted as a replay
/// base even under the strict backlog policy.
pub const FULL_IMMUTABILITY_THRESHOLD: usize = 90_000;

/// Per-signer slice of the random delay added to out-of-turn sealing.
pub const WIGGLE_TIME: Duration = Duration::from_millis(500);

/// Nonce marking an authorisation vote.
pub const NONCE_AUTH: B64 = B64::repeat_byte(0xff);
/// Nonce marking a deauthorisation vote; also mandatory on checkpoints.
pub const NONCE_DROP: B64 = B64::ZERO;

/// Difficulty of a block sealed by the in-turn signer.
pub const DIFF_INTURN: U256 = U256::from_limbs([2, 0, 0, 0]);
/// Difficulty of a block sealed out of turn.
pub const DIFF_NOTURN: U256 = U256::from_limbs([1, 0, 0, 0]);

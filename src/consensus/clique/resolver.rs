//! Snapshot resolution: walk ancestors back to a trusted base, then
//! replay the collected trail forward through the voting rules.

use alloy_consensus::Header;
use alloy_primitives::Address;
use tracing::{debug, trace, warn};

use crate::consensus::clique::{
    constants::{
        ADDRESS_LENGTH, CHECKPOINT_INTERVAL, EXTRA_SEAL, EXTRA_VANITY,
        FULL_IMMUTABILITY_THRESHOLD,
    },
    engine::Clique,
    error::{CliqueError, CliqueResult},
    snapshot::Snapshot,
};

/// Extracts the signer list of a checkpoint header: the addresses packed
/// between the vanity prefix and the seal suffix of extra-data.
pub fn checkpoint_signers(header: &Header) -> CliqueResult<Vec<Address>> {
    let extra = &header.extra_data;
    if extra.len() < EXTRA_VANITY + EXTRA_SEAL {
        return Err(CliqueError::MissingSignature);
    }
    let packed = &extra[EXTRA_VANITY..extra.len() - EXTRA_SEAL];
    if packed.len() % ADDRESS_LENGTH != 0 {
        return Err(CliqueError::InvalidCheckpointSigners);
    }
    Ok(packed.chunks_exact(ADDRESS_LENGTH).map(Address::from_slice).collect())
}

impl Clique {
    /// Returns the authorisation snapshot valid at `header`.
    ///
    /// `parents` may carry ancestors that are not in the header store yet
    /// (a batch being verified), ordered oldest first; they are consumed
    /// from the back during the walk and checked for hash linkage.
    pub fn snapshot_at(&self, header: &Header, parents: &[Header]) -> CliqueResult<Snapshot> {
        let mut parents = parents.to_vec();
        let mut trail: Vec<Header> = Vec::new();
        let mut cursor = header.clone();

        let base = loop {
            let hash = cursor.hash_slow();

            if let Some(snap) = self.recents.lock().get(&hash) {
                trace!(target: "clique::snapshot", number = cursor.number, "snapshot cache hit");
                break snap.clone();
            }

            if cursor.number % CHECKPOINT_INTERVAL == 0 {
                if let Some(raw) = self.snapshot_store.load(&hash) {
                    match Snapshot::from_bytes(&raw) {
                        Ok(snap) => {
                            debug!(
                                target: "clique::snapshot",
                                number = cursor.number,
                                "loaded snapshot from store"
                            );
                            break snap;
                        }
                        Err(err) => {
                            warn!(
                                target: "clique::snapshot",
                                number = cursor.number,
                                %err,
                                "discarding undecodable snapshot record"
                            );
                        }
                    }
                }
            }

            if self.is_snapshot_position(&cursor, trail.len()) {
                let signers = checkpoint_signers(&cursor)?;
                if signers.is_empty() {
                    return Err(CliqueError::InvalidCheckpointSigners);
                }
                let snap = Snapshot::new(cursor.number, hash, signers);
                self.snapshot_store.store(hash, snap.to_bytes())?;
                debug!(
                    target: "clique::snapshot",
                    number = snap.block_number,
                    signers = snap.ballot.signer_count(),
                    "built snapshot from checkpoint header"
                );
                break snap;
            }

            // One more ancestor to replay later.
            let parent_hash = cursor.parent_hash;
            let number = cursor.number;
            trail.push(cursor);
            cursor = match parents.pop() {
                Some(parent) => {
                    if parent.hash_slow() != parent_hash || parent.number + 1 != number {
                        return Err(CliqueError::UnknownAncestor);
                    }
                    parent
                }
                None => self
                    .headers
                    .header_by_hash(&parent_hash)
                    .ok_or(CliqueError::UnknownAncestor)?,
            };
        };

        // Replay oldest first, storing every checkpoint-aligned snapshot
        // crossed on the way: the trail is split so each such snapshot is
        // materialised before the remainder is applied.
        trail.reverse();
        let mut snap = base;
        let mut rest = trail.as_slice();
        while !rest.is_empty() {
            let split = rest
                .iter()
                .position(|h| h.number % CHECKPOINT_INTERVAL == 0)
                .map(|at| at + 1)
                .unwrap_or(rest.len());
            let (chunk, tail) = rest.split_at(split);
            snap = snap.apply(chunk, &self.signatures, self.config.epoch)?;
            if snap.block_number % CHECKPOINT_INTERVAL == 0 {
                self.snapshot_store.store(snap.block_hash, snap.to_bytes())?;
                debug!(
                    target: "clique::snapshot",
                    number = snap.block_number,
                    "persisted checkpoint snapshot"
                );
            }
            rest = tail;
        }

        self.recents.lock().insert(snap.block_hash, snap.clone());
        Ok(snap)
    }

    /// Whether `header` may serve as a replay base constructed from its
    /// own embedded signer list.
    fn is_snapshot_position(&self, header: &Header, trail_len: usize) -> bool {
        if header.number == 0 {
            return true;
        }
        header.number % self.config.epoch == 0
            && (!self.config.require_immutable_backlog
                || trail_len > FULL_IMMUTABILITY_THRESHOLD)
    }
}

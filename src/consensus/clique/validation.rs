//! Header verification: stateless shape checks, cascading parent and
//! snapshot checks, and the seal itself.

use alloy_consensus::{constants::EMPTY_OMMER_ROOT_HASH, Header};
use alloy_primitives::{Address, B256};
use tracing::trace;

use crate::consensus::clique::{
    constants::{
        ADDRESS_LENGTH, DIFF_INTURN, DIFF_NOTURN, EXTRA_SEAL, EXTRA_VANITY, NONCE_AUTH,
        NONCE_DROP,
    },
    engine::Clique,
    error::{CliqueError, CliqueResult},
    resolver::checkpoint_signers,
    snapshot::Snapshot,
    util::{unix_now, StopSignal},
};

impl Clique {
    /// Verifies a single header against the consensus rules.
    pub fn verify_header(&self, header: &Header) -> CliqueResult<()> {
        self.verify_header_at(header, &[])
    }

    /// Verifies a batch in input order. Element `i` prefers
    /// `headers[..i]` as its parent source, so a chain segment validates
    /// without its ancestors being stored yet. One result per input; once
    /// `stop` fires the remaining slots come back as `Stopped`.
    pub fn verify_headers(
        &self,
        headers: &[Header],
        stop: &StopSignal,
    ) -> Vec<CliqueResult<()>> {
        let mut results = Vec::with_capacity(headers.len());
        for (index, header) in headers.iter().enumerate() {
            if stop.is_stopped() {
                results.push(Err(CliqueError::Stopped));
                continue;
            }
            results.push(self.verify_header_at(header, &headers[..index]));
        }
        results
    }

    fn verify_header_at(&self, header: &Header, parents: &[Header]) -> CliqueResult<()> {
        self.verify_stateless(header)?;
        self.verify_cascading(header, parents)
    }

    /// Checks that hold regardless of chain state.
    fn verify_stateless(&self, header: &Header) -> CliqueResult<()> {
        if header.number == 0 {
            return Err(CliqueError::UnknownBlock);
        }
        if header.timestamp > unix_now() {
            return Err(CliqueError::FutureBlock);
        }

        let checkpoint = self.config.is_checkpoint(header.number);
        if checkpoint && header.beneficiary != Address::ZERO {
            return Err(CliqueError::InvalidCheckpointBeneficiary);
        }
        if checkpoint && header.nonce != NONCE_DROP {
            return Err(CliqueError::InvalidCheckpointVote);
        }
        if header.nonce != NONCE_AUTH && header.nonce != NONCE_DROP {
            return Err(CliqueError::InvalidVote);
        }

        let extra_len = header.extra_data.len();
        if extra_len < EXTRA_VANITY {
            return Err(CliqueError::MissingVanity);
        }
        if extra_len < EXTRA_VANITY + EXTRA_SEAL {
            return Err(CliqueError::MissingSignature);
        }
        let signers_bytes = extra_len - EXTRA_VANITY - EXTRA_SEAL;
        if !checkpoint && signers_bytes != 0 {
            return Err(CliqueError::ExtraSigners);
        }
        if checkpoint && signers_bytes % ADDRESS_LENGTH != 0 {
            return Err(CliqueError::InvalidCheckpointSigners);
        }

        if header.mix_hash != B256::ZERO {
            return Err(CliqueError::InvalidMixDigest);
        }
        if header.ommers_hash != EMPTY_OMMER_ROOT_HASH {
            return Err(CliqueError::InvalidUncleHash);
        }
        if header.difficulty != DIFF_INTURN && header.difficulty != DIFF_NOTURN {
            return Err(CliqueError::InvalidDifficulty);
        }
        Ok(())
    }

    /// Checks that need the parent chain and the authorisation snapshot.
    fn verify_cascading(&self, header: &Header, parents: &[Header]) -> CliqueResult<()> {
        let parent = match parents.last() {
            Some(parent) => parent.clone(),
            None => self
                .headers
                .header_by_hash(&header.parent_hash)
                .ok_or(CliqueError::UnknownAncestor)?,
        };
        if parent.number + 1 != header.number || parent.hash_slow() != header.parent_hash {
            return Err(CliqueError::UnknownAncestor);
        }
        if header.timestamp < parent.timestamp + self.config.period {
            return Err(CliqueError::InvalidTimestamp);
        }
        self.parent_validator.validate(&parent, header)?;

        let ancestors = if parents.is_empty() { &[][..] } else { &parents[..parents.len() - 1] };
        let snap = self.snapshot_at(&parent, ancestors)?;

        if self.config.is_checkpoint(header.number) {
            let listed = checkpoint_signers(header)?;
            if listed != snap.signers() {
                return Err(CliqueError::MismatchingCheckpointSigners {
                    number: header.number,
                });
            }
        }

        self.verify_seal(&snap, header)
    }

    /// Recovers the sealer and checks authorisation, the recency window,
    /// and the turn-matching difficulty.
    fn verify_seal(&self, snap: &Snapshot, header: &Header) -> CliqueResult<()> {
        let signer = self.signatures.recover(header)?;
        if !snap.is_signer(&signer) {
            return Err(CliqueError::UnauthorizedSigner(signer));
        }
        if let Some(sealed_at) = snap.recent_block_of(&signer) {
            let threshold = snap.ballot.threshold() as u64;
            if header.number < sealed_at + threshold {
                return Err(CliqueError::RecentlySigned(signer));
            }
        }

        let expected =
            if snap.in_turn(header.number, &signer) { DIFF_INTURN } else { DIFF_NOTURN };
        if header.difficulty != expected {
            return Err(CliqueError::WrongDifficulty);
        }
        trace!(target: "clique::verify", number = header.number, %signer, "seal verified");
        Ok(())
    }
}

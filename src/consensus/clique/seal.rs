//! Block preparation and sealing for a locally authorised signer.

use alloy_consensus::{constants::EMPTY_TRANSACTIONS, Header};
use alloy_primitives::{Address, Bytes, B256};
use rand::{rngs::StdRng, Rng};
use std::time::Duration;
use tracing::{debug, info};

use crate::consensus::clique::{
    constants::{DIFF_INTURN, DIFF_NOTURN, EXTRA_SEAL, EXTRA_VANITY, NONCE_AUTH, NONCE_DROP, WIGGLE_TIME},
    engine::Clique,
    error::{CliqueError, CliqueResult},
    recovery::seal_hash,
    snapshot::Snapshot,
    util::{unix_now, StopSignal},
};

impl Clique {
    /// Populates the consensus fields of a header being built on top of
    /// `parent`: the vote to campaign for, the turn difficulty, the
    /// extra-data layout with a zeroed seal reservation, and the
    /// timestamp.
    pub fn prepare(&self, parent: &Header, header: &mut Header) -> CliqueResult<()> {
        let signer = self.signer.read().clone().ok_or(CliqueError::SignerUnavailable)?;
        let snap = self.snapshot_at(parent, &[])?;
        let number = parent.number + 1;
        header.number = number;

        header.beneficiary = Address::ZERO;
        header.nonce = NONCE_DROP;
        if !self.config.is_checkpoint(number) {
            // Campaign for one of the node's still-meaningful proposals,
            // picked at random for fairness between targets.
            let candidates: Vec<(Address, bool)> = self
                .proposals
                .lock()
                .iter()
                .filter(|(address, authorize)| snap.ballot.valid_vote(address, **authorize))
                .map(|(address, authorize)| (*address, *authorize))
                .collect();
            if !candidates.is_empty() {
                let pick = self.proposal_rng.lock().random_range(0..candidates.len());
                let (address, authorize) = candidates[pick];
                header.beneficiary = address;
                header.nonce = if authorize { NONCE_AUTH } else { NONCE_DROP };
                debug!(target: "clique::seal", %address, authorize, "voting on pending proposal");
            }
        }

        header.difficulty =
            if snap.in_turn(number, &signer.address) { DIFF_INTURN } else { DIFF_NOTURN };

        // vanity || signer list on checkpoints || zeroed seal reservation
        let mut extra = Vec::with_capacity(EXTRA_VANITY + EXTRA_SEAL);
        extra.extend_from_slice(&header.extra_data[..header.extra_data.len().min(EXTRA_VANITY)]);
        extra.resize(EXTRA_VANITY, 0);
        if self.config.is_checkpoint(number) {
            for address in snap.signers() {
                extra.extend_from_slice(address.as_slice());
            }
        }
        extra.extend_from_slice(&[0u8; EXTRA_SEAL]);
        header.extra_data = Bytes::from(extra);

        header.mix_hash = B256::ZERO;
        header.timestamp = (parent.timestamp + self.config.period).max(unix_now());
        Ok(())
    }

    /// Signs a prepared header once its sealing slot arrives.
    ///
    /// Refuses the genesis block, empty blocks on zero-period chains, and
    /// any slot the local signer is not entitled to. The wait honours the
    /// header timestamp plus, when out of turn, a random wiggle; `stop`
    /// cancels the wait and surfaces `Stopped`.
    pub async fn seal(&self, mut header: Header, stop: &StopSignal) -> CliqueResult<Header> {
        if header.number == 0 {
            return Err(CliqueError::UnknownBlock);
        }
        if self.config.period == 0 && header.transactions_root == EMPTY_TRANSACTIONS {
            return Err(CliqueError::WaitingForTransactions);
        }

        let signer = self.signer.read().clone().ok_or(CliqueError::SignerUnavailable)?;
        let parent = self
            .headers
            .header_by_hash(&header.parent_hash)
            .ok_or(CliqueError::UnknownAncestor)?;
        let snap = self.snapshot_at(&parent, &[])?;

        if !snap.is_signer(&signer.address) {
            return Err(CliqueError::UnauthorizedSigner(signer.address));
        }
        if let Some(sealed_at) = snap.recent_block_of(&signer.address) {
            let threshold = snap.ballot.threshold() as u64;
            if header.number < sealed_at + threshold {
                info!(target: "clique::seal", number = header.number, "signed recently, must wait for others");
                return Err(CliqueError::SignedRecently);
            }
        }

        let delay = {
            let mut rng = self.wiggle_rng.lock();
            seal_delay(&snap, &header, unix_now(), &mut rng)
        };
        debug!(
            target: "clique::seal",
            number = header.number,
            ?delay,
            out_of_turn = header.difficulty == DIFF_NOTURN,
            "waiting for sealing slot"
        );

        if stop.is_stopped() {
            return Err(CliqueError::Stopped);
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stop.cancelled() => return Err(CliqueError::Stopped),
        }

        let digest = seal_hash(&header);
        let signature = (signer.sign)(signer.address, digest)?;

        let mut extra = header.extra_data.to_vec();
        if extra.len() < EXTRA_SEAL {
            return Err(CliqueError::MissingSignature);
        }
        let start = extra.len() - EXTRA_SEAL;
        extra[start..].copy_from_slice(&signature);
        header.extra_data = Bytes::from(extra);

        info!(target: "clique::seal", number = header.number, "sealed block");
        Ok(header)
    }
}

/// Scheduled wait before sealing: the distance to the header timestamp
/// plus, when sealing out of turn, a uniform draw from
/// `[0, threshold x WIGGLE_TIME)` that desynchronises competing signers.
pub fn seal_delay(snap: &Snapshot, header: &Header, now: u64, rng: &mut StdRng) -> Duration {
    let mut delay = Duration::from_secs(header.timestamp.saturating_sub(now));
    if header.difficulty == DIFF_NOTURN {
        let wiggle = WIGGLE_TIME.as_millis() as u64 * snap.ballot.threshold() as u64;
        delay += Duration::from_millis(rng.random_range(0..wiggle));
    }
    delay
}

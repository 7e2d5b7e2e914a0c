//! Authorisation snapshots: the voting state valid at one block, the
//! header replay that advances it, and the RLP persistence record.

use alloy_consensus::Header;
use alloy_primitives::{Address, Bytes, B256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

use crate::consensus::clique::{
    ballot::{Ballot, Tally, Vote},
    constants::{NONCE_AUTH, NONCE_DROP},
    error::{CliqueError, CliqueResult},
    recovery::SignatureCache,
};

/// In-memory snapshot of the authorisation state at a specific block.
///
/// Snapshots are value types: replay never mutates an existing snapshot,
/// it produces a new one, so cached copies stay immutable to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Block number this snapshot is valid at.
    pub block_number: u64,
    /// Hash of that block.
    pub block_hash: B256,
    /// Which signer sealed each of the most recent blocks, keyed by
    /// block number. Bounds how often one signer may seal.
    pub recents: BTreeMap<u64, Address>,
    /// Voting state: authorised set plus open tallies.
    pub ballot: Ballot,
}

impl Snapshot {
    /// Creates a fresh snapshot over the given signers, as bootstrapped
    /// from genesis or a trusted checkpoint header.
    pub fn new(block_number: u64, block_hash: B256, signers: Vec<Address>) -> Self {
        Self {
            block_number,
            block_hash,
            recents: BTreeMap::new(),
            ballot: Ballot::new(signers),
        }
    }

    pub fn is_signer(&self, address: &Address) -> bool {
        self.ballot.is_authorized(address)
    }

    /// Authorised signers in ascending byte order.
    pub fn signers(&self) -> Vec<Address> {
        self.ballot.signers()
    }

    /// Round-robin turn check: the signer at index `number % len` of the
    /// ascending signer list earns the in-turn difficulty for `number`.
    pub fn in_turn(&self, number: u64, signer: &Address) -> bool {
        let signers = self.signers();
        if signers.is_empty() {
            return false;
        }
        signers[(number % signers.len() as u64) as usize] == *signer
    }

    /// The most recent block `address` sealed within the current window.
    pub fn recent_block_of(&self, address: &Address) -> Option<u64> {
        self.recents
            .iter()
            .rev()
            .find(|(_, signer)| *signer == address)
            .map(|(number, _)| *number)
    }

    /// Replays a contiguous run of headers starting right after this
    /// snapshot and returns the advanced snapshot. `self` is never
    /// touched, so no partial state survives an error.
    pub fn apply(
        &self,
        headers: &[Header],
        signatures: &SignatureCache,
        epoch: u64,
    ) -> CliqueResult<Self> {
        if headers.is_empty() {
            return Ok(self.clone());
        }
        if headers[0].number != self.block_number + 1 {
            return Err(CliqueError::InvalidVotingChain);
        }
        if headers.windows(2).any(|pair| pair[1].number != pair[0].number + 1) {
            return Err(CliqueError::InvalidVotingChain);
        }

        let mut snap = self.clone();
        for header in headers {
            let number = header.number;

            // Pending votes do not survive an epoch boundary.
            if number % epoch == 0 {
                snap.ballot.flush();
            }

            // Age the oldest slot out of the recency window.
            let limit = snap.ballot.threshold() as u64;
            if let Some(cutoff) = number.checked_sub(limit) {
                snap.recents.retain(|&n, _| n > cutoff);
            }

            let signer = signatures.recover(header)?;
            if !snap.ballot.is_authorized(&signer) {
                return Err(CliqueError::UnauthorizedSigner(signer));
            }
            if snap.recents.values().any(|recent| *recent == signer) {
                return Err(CliqueError::RecentlySigned(signer));
            }
            snap.recents.insert(number, signer);

            // The fresh header supersedes the signer's previous vote on
            // this target.
            snap.ballot.del_vote(&signer, &header.beneficiary);

            let authorize = if header.nonce == NONCE_AUTH {
                true
            } else if header.nonce == NONCE_DROP {
                false
            } else {
                return Err(CliqueError::InvalidVote);
            };
            snap.ballot.add_vote(Vote {
                signer,
                address: header.beneficiary,
                block: number,
                authorize,
            });

            // A passed removal shrinks the majority, and the recency
            // window shrinks with it; re-trim so the ejected signer
            // cannot stall the reduced schedule.
            if snap.ballot.take_last_removed() {
                let limit = snap.ballot.threshold() as u64;
                if let Some(cutoff) = number.checked_sub(limit) {
                    snap.recents.retain(|&n, _| n > cutoff);
                }
            }
        }

        let last = &headers[headers.len() - 1];
        snap.block_number = last.number;
        snap.block_hash = last.hash_slow();
        trace!(
            target: "clique::snapshot",
            from = self.block_number,
            to = snap.block_number,
            "replayed headers onto snapshot"
        );
        Ok(snap)
    }

    /// Encodes the persistent record: `(number, hash, recents, ballot)`.
    pub fn to_bytes(&self) -> Bytes {
        let stored = StoredSnapshot::from(self);
        let mut out = Vec::new();
        stored.encode(&mut out);
        out.into()
    }

    /// Decodes a persistent record produced by `to_bytes`.
    pub fn from_bytes(mut data: &[u8]) -> CliqueResult<Self> {
        let stored = StoredSnapshot::decode(&mut data)
            .map_err(|err| CliqueError::Store(format!("undecodable snapshot record: {err}")))?;
        Ok(stored.into())
    }
}

#[derive(RlpEncodable, RlpDecodable)]
struct StoredRecent {
    block: u64,
    signer: Address,
}

#[derive(RlpEncodable, RlpDecodable)]
struct StoredVote {
    signer: Address,
    address: Address,
    block: u64,
    authorize: bool,
}

#[derive(RlpEncodable, RlpDecodable)]
struct StoredTally {
    address: Address,
    authorize: bool,
    votes: Vec<StoredVote>,
}

#[derive(RlpEncodable, RlpDecodable)]
struct StoredBallot {
    signers: Vec<Address>,
    tallies: Vec<StoredTally>,
}

/// Wire form of the persistent snapshot record.
#[derive(RlpEncodable, RlpDecodable)]
struct StoredSnapshot {
    block_number: u64,
    block_hash: B256,
    recents: Vec<StoredRecent>,
    ballot: StoredBallot,
}

impl From<&Snapshot> for StoredSnapshot {
    fn from(snap: &Snapshot) -> Self {
        Self {
            block_number: snap.block_number,
            block_hash: snap.block_hash,
            recents: snap
                .recents
                .iter()
                .map(|(&block, &signer)| StoredRecent { block, signer })
                .collect(),
            ballot: StoredBallot {
                signers: snap.ballot.signers(),
                tallies: snap
                    .ballot
                    .tallies()
                    .iter()
                    .map(|(&address, tally)| StoredTally {
                        address,
                        authorize: tally.authorize,
                        votes: tally
                            .votes
                            .values()
                            .map(|vote| StoredVote {
                                signer: vote.signer,
                                address: vote.address,
                                block: vote.block,
                                authorize: vote.authorize,
                            })
                            .collect(),
                    })
                    .collect(),
            },
        }
    }
}

impl From<StoredSnapshot> for Snapshot {
    fn from(stored: StoredSnapshot) -> Self {
        let tallies = stored
            .ballot
            .tallies
            .into_iter()
            .map(|tally| {
                let votes = tally
                    .votes
                    .into_iter()
                    .map(|vote| {
                        (
                            vote.signer,
                            Vote {
                                signer: vote.signer,
                                address: vote.address,
                                block: vote.block,
                                authorize: vote.authorize,
                            },
                        )
                    })
                    .collect();
                (tally.address, Tally { authorize: tally.authorize, votes })
            })
            .collect();
        Self {
            block_number: stored.block_number,
            block_hash: stored.block_hash,
            recents: stored
                .recents
                .into_iter()
                .map(|recent| (recent.block, recent.signer))
                .collect(),
            ballot: Ballot::from_parts(stored.ballot.signers.into_iter().collect(), tallies),
        }
    }
}

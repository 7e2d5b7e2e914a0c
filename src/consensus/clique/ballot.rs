//! Per-snapshot voting state: the authorised signer set and the open
//! tallies that change it.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single authorisation vote cast by a signer through a sealed header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Signer who cast the vote.
    pub signer: Address,
    /// Account being voted on.
    pub address: Address,
    /// Block number the vote was cast at.
    pub block: u64,
    /// True to authorise, false to drop.
    pub authorize: bool,
}

/// Running tally for one proposed account. All recorded votes share the
/// tally's direction, and a signer holds at most one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Whether this is an authorisation proposal.
    pub authorize: bool,
    /// Standing votes keyed by the signer that cast them.
    pub votes: BTreeMap<Address, Vote>,
}

/// Voting state carried by every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Current authorised signers, ascending byte order.
    signers: BTreeSet<Address>,
    /// Open proposals keyed by the account under vote.
    tallies: BTreeMap<Address, Tally>,
    /// Transient: whether the most recent `add_vote` shrank the set.
    #[serde(skip)]
    last_removed: bool,
}

impl Ballot {
    /// Starts a ballot over the given authorised set.
    pub fn new(initial_signers: impl IntoIterator<Item = Address>) -> Self {
        Self {
            signers: initial_signers.into_iter().collect(),
            tallies: BTreeMap::new(),
            last_removed: false,
        }
    }

    pub(crate) fn from_parts(
        signers: BTreeSet<Address>,
        tallies: BTreeMap<Address, Tally>,
    ) -> Self {
        Self { signers, tallies, last_removed: false }
    }

    pub fn is_authorized(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }

    /// Authorised signers in ascending byte order.
    pub fn signers(&self) -> Vec<Address> {
        self.signers.iter().copied().collect()
    }

    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    /// Open tallies keyed by the account under vote.
    pub fn tallies(&self) -> &BTreeMap<Address, Tally> {
        &self.tallies
    }

    /// Votes needed to pass any proposal: a strict majority of the
    /// current signer count.
    pub fn threshold(&self) -> usize {
        self.signers.len() / 2 + 1
    }

    /// A vote is meaningful iff it would change the authorised set.
    pub fn valid_vote(&self, address: &Address, authorize: bool) -> bool {
        let is_signer = self.signers.contains(address);
        (is_signer && !authorize) || (!is_signer && authorize)
    }

    /// True iff the most recent `add_vote` caused a removal. Reading does
    /// not clear the flag; `take_last_removed` does.
    pub fn last_removed(&self) -> bool {
        self.last_removed
    }

    /// Reads and clears the removal flag.
    pub fn take_last_removed(&mut self) -> bool {
        std::mem::take(&mut self.last_removed)
    }

    /// Records a vote. Invalid votes and direction conflicts with an open
    /// tally are ignored; a vote that reaches the majority threshold is
    /// applied to the signer set and closes its tally.
    pub fn add_vote(&mut self, vote: Vote) {
        self.last_removed = false;
        if !self.valid_vote(&vote.address, vote.authorize) {
            return;
        }

        let threshold = self.threshold();
        let address = vote.address;
        let authorize = vote.authorize;

        let tally = self
            .tallies
            .entry(address)
            .or_insert_with(|| Tally { authorize, votes: BTreeMap::new() });
        if tally.authorize != authorize {
            // Direction conflict with the open tally; the vote is dropped.
            return;
        }
        tally.votes.insert(vote.signer, vote);

        if tally.votes.len() >= threshold {
            self.close_tally(address, authorize);
        }
    }

    fn close_tally(&mut self, address: Address, authorize: bool) {
        self.tallies.remove(&address);
        if authorize {
            self.signers.insert(address);
        } else {
            self.signers.remove(&address);
            self.last_removed = true;
            // The dropped signer's standing votes no longer count anywhere.
            self.tallies.retain(|_, tally| {
                tally.votes.remove(&address);
                !tally.votes.is_empty()
            });
        }
    }

    /// Removes `signer`'s pending vote on `address`, dropping the tally
    /// if it empties. Called whenever a signer seals a new block, since
    /// the fresh header supersedes the old vote.
    pub fn del_vote(&mut self, signer: &Address, address: &Address) {
        if let Some(tally) = self.tallies.get_mut(address) {
            tally.votes.remove(signer);
            if tally.votes.is_empty() {
                self.tallies.remove(address);
            }
        }
    }

    /// Drops all open tallies. Called on epoch boundaries.
    pub fn flush(&mut self) {
        self.tallies.clear();
    }
}

//! The Clique engine: configuration, shared caches, collaborator handles
//! and the local signer identity.

use alloy_consensus::Header;
use alloy_primitives::{Address, B256};
use parking_lot::{Mutex, RwLock};
use rand::{rngs::StdRng, SeedableRng};
use schnellru::{ByLength, LruMap};
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::info;

use crate::consensus::clique::{
    config::CliqueConfig,
    constants::{INMEMORY_SIGNATURES, INMEMORY_SNAPSHOTS},
    error::CliqueResult,
    provider::{HeaderReader, ParentValidator, SnapshotStore},
    recovery::SignatureCache,
    snapshot::Snapshot,
};

/// Callback that signs a 32-byte digest on behalf of a local account and
/// returns the 65-byte recoverable signature.
pub type SignFn = Arc<dyn Fn(Address, B256) -> CliqueResult<[u8; 65]> + Send + Sync>;

/// The local signer identity together with its signing callback. The two
/// always travel as one value so they cannot be observed half-updated.
#[derive(Clone)]
pub struct LocalSigner {
    pub address: Address,
    pub sign: SignFn,
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner").field("address", &self.address).finish_non_exhaustive()
    }
}

/// Clique proof-of-authority consensus engine.
pub struct Clique {
    /// Engine configuration.
    pub(crate) config: CliqueConfig,
    /// Canonical header chain access.
    pub(crate) headers: Arc<dyn HeaderReader>,
    /// Persistent snapshot records.
    pub(crate) snapshot_store: Arc<dyn SnapshotStore>,
    /// Delegated parent-relative rules (gas, base fee).
    pub(crate) parent_validator: Arc<dyn ParentValidator>,
    /// Recovered-signer cache shared by verifier and sealer.
    pub(crate) signatures: SignatureCache,
    /// Recent snapshots keyed by block hash.
    pub(crate) recents: Mutex<LruMap<B256, Snapshot, ByLength>>,
    /// Pending authorisation proposals of this node: target -> direction.
    pub(crate) proposals: Mutex<HashMap<Address, bool>>,
    /// Local signer identity and callback, updated as a pair.
    pub(crate) signer: RwLock<Option<LocalSigner>>,
    /// Randomness for picking which proposal to vote on.
    pub(crate) proposal_rng: Mutex<StdRng>,
    /// Randomness for the out-of-turn sealing wiggle.
    pub(crate) wiggle_rng: Mutex<StdRng>,
}

impl Clique {
    /// Create a new Clique consensus engine.
    pub fn new(
        config: CliqueConfig,
        headers: Arc<dyn HeaderReader>,
        snapshot_store: Arc<dyn SnapshotStore>,
        parent_validator: Arc<dyn ParentValidator>,
    ) -> Arc<Self> {
        Self::build(
            config,
            headers,
            snapshot_store,
            parent_validator,
            StdRng::from_os_rng(),
            StdRng::from_os_rng(),
        )
    }

    /// Same as `new` but with deterministic randomness, for tests and
    /// reproducible simulations. Neither seed affects validity.
    pub fn with_rng_seeds(
        config: CliqueConfig,
        headers: Arc<dyn HeaderReader>,
        snapshot_store: Arc<dyn SnapshotStore>,
        parent_validator: Arc<dyn ParentValidator>,
        proposal_seed: u64,
        wiggle_seed: u64,
    ) -> Arc<Self> {
        Self::build(
            config,
            headers,
            snapshot_store,
            parent_validator,
            StdRng::seed_from_u64(proposal_seed),
            StdRng::seed_from_u64(wiggle_seed),
        )
    }

    fn build(
        config: CliqueConfig,
        headers: Arc<dyn HeaderReader>,
        snapshot_store: Arc<dyn SnapshotStore>,
        parent_validator: Arc<dyn ParentValidator>,
        proposal_rng: StdRng,
        wiggle_rng: StdRng,
    ) -> Arc<Self> {
        info!(
            target: "clique",
            epoch = config.epoch,
            period = config.period,
            "initialized clique engine"
        );
        Arc::new(Self {
            config,
            headers,
            snapshot_store,
            parent_validator,
            signatures: SignatureCache::new(INMEMORY_SIGNATURES),
            recents: Mutex::new(LruMap::new(ByLength::new(INMEMORY_SNAPSHOTS))),
            proposals: Mutex::new(HashMap::new()),
            signer: RwLock::new(None),
            proposal_rng: Mutex::new(proposal_rng),
            wiggle_rng: Mutex::new(wiggle_rng),
        })
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &CliqueConfig {
        &self.config
    }

    /// Recover the address that sealed a header, via the shared cache.
    pub fn recover_signer(&self, header: &Header) -> CliqueResult<Address> {
        self.signatures.recover(header)
    }

    /// Installs the local signer identity and its signing callback.
    pub fn set_signer(&self, address: Address, sign: SignFn) {
        *self.signer.write() = Some(LocalSigner { address, sign });
    }

    /// Removes the local signer; the node stops sealing.
    pub fn clear_signer(&self) {
        *self.signer.write() = None;
    }

    /// The address this node seals with, if a signer is installed.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.read().as_ref().map(|signer| signer.address)
    }

    /// Queues an authorisation proposal the sealer will campaign for.
    pub fn propose(&self, address: Address, authorize: bool) {
        self.proposals.lock().insert(address, authorize);
    }

    /// Withdraws a pending proposal.
    pub fn discard(&self, address: Address) {
        self.proposals.lock().remove(&address);
    }

    /// Snapshot of the pending proposals.
    pub fn proposals(&self) -> HashMap<Address, bool> {
        self.proposals.lock().clone()
    }
}

impl fmt::Debug for Clique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clique").field("config", &self.config).finish_non_exhaustive()
    }
}

//! Collaborator interfaces the engine consumes: canonical header access,
//! persistent snapshot storage, and delegated parent-relative rules.

use alloy_consensus::Header;
use alloy_primitives::{Bytes, B256};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::consensus::clique::error::CliqueResult;

/// Read access to the canonical header chain.
pub trait HeaderReader: Send + Sync {
    /// Returns the header with the given hash, if known.
    fn header_by_hash(&self, hash: &B256) -> Option<Header>;

    /// Returns the canonical header at the given height, if known.
    fn header_by_number(&self, number: u64) -> Option<Header>;
}

/// Persistent storage of encoded snapshot records keyed by block hash.
pub trait SnapshotStore: Send + Sync {
    /// Loads the raw record stored under `hash`.
    fn load(&self, hash: &B256) -> Option<Bytes>;

    /// Stores (or replaces) the record under `hash`.
    fn store(&self, hash: B256, data: Bytes) -> CliqueResult<()>;
}

/// Parent-relative header rules supplied from outside the engine: gas
/// accounting and, where a chain enables it, base-fee arithmetic.
pub trait ParentValidator: Send + Sync {
    fn validate(&self, parent: &Header, header: &Header) -> CliqueResult<()>;
}

/// Map-backed header reader for tests and light embedders.
#[derive(Debug, Default)]
pub struct InMemoryHeaderReader {
    by_hash: RwLock<HashMap<B256, Header>>,
    by_number: RwLock<HashMap<u64, B256>>,
}

impl InMemoryHeaderReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, making it canonical for its height.
    pub fn insert(&self, header: Header) {
        let hash = header.hash_slow();
        self.by_number.write().insert(header.number, hash);
        self.by_hash.write().insert(hash, header);
    }

    /// Drops the canonical header at `number`.
    pub fn remove_number(&self, number: u64) {
        if let Some(hash) = self.by_number.write().remove(&number) {
            self.by_hash.write().remove(&hash);
        }
    }
}

impl HeaderReader for InMemoryHeaderReader {
    fn header_by_hash(&self, hash: &B256) -> Option<Header> {
        self.by_hash.read().get(hash).cloned()
    }

    fn header_by_number(&self, number: u64) -> Option<Header> {
        let hash = *self.by_number.read().get(&number)?;
        self.header_by_hash(&hash)
    }
}

/// Map-backed snapshot store.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    records: RwLock<HashMap<B256, Bytes>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self, hash: &B256) -> Option<Bytes> {
        self.records.read().get(hash).cloned()
    }

    fn store(&self, hash: B256, data: Bytes) -> CliqueResult<()> {
        self.records.write().insert(hash, data);
        Ok(())
    }
}

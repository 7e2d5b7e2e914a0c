//! Clique proof-of-authority consensus engine (EIP-225).
//!
//! The engine decides whether a proposed header conforms to the rules of
//! a permissioned chain whose block producers form a dynamically voted
//! signer set. It keeps that set consistent across reorganisations
//! through snapshots, verifies and seals headers, and lets the local
//! node campaign for producer changes by embedding votes in the headers
//! it authors. Storage, execution and networking stay behind the
//! collaborator traits in [`provider`].

pub mod ballot;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod gas;
pub mod provider;
pub mod recovery;
pub mod resolver;
pub mod seal;
pub mod snapshot;
pub mod util;
pub mod validation;

pub use ballot::{Ballot, Tally, Vote};
pub use config::CliqueConfig;
pub use constants::*;
pub use engine::{Clique, LocalSigner, SignFn};
pub use error::{CliqueError, CliqueResult};
pub use gas::GasLimitValidator;
pub use provider::{
    HeaderReader, InMemoryHeaderReader, InMemorySnapshotStore, ParentValidator, SnapshotStore,
};
pub use recovery::{seal_hash, SignatureCache};
pub use resolver::checkpoint_signers;
pub use seal::seal_delay;
pub use snapshot::Snapshot;
pub use util::StopSignal;

#[cfg(test)]
mod tests;

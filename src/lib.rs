//! Core of a Clique proof-of-authority consensus engine for
//! Ethereum-compatible chains.

pub mod consensus;

pub use consensus::clique;

//! Shared fixtures for the integration suites: deterministic keypairs,
//! sealed chain construction, and engine assembly.
#![allow(dead_code)]

use alloy_consensus::constants::EMPTY_OMMER_ROOT_HASH;
use alloy_consensus::Header;
use alloy_primitives::{keccak256, Address, Bytes, B256};
use secp256k1::{Message, Secp256k1, SecretKey};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clique_consensus::clique::{
    seal_hash, Clique, CliqueConfig, GasLimitValidator, InMemoryHeaderReader,
    InMemorySnapshotStore, SignFn, DIFF_INTURN, DIFF_NOTURN, EXTRA_SEAL, EXTRA_VANITY,
    NONCE_AUTH, NONCE_DROP,
};

pub const TEST_GAS_LIMIT: u64 = 8_000_000;

pub fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// A secp256k1 keypair with its derived signer address.
#[derive(Clone)]
pub struct TestSigner {
    secret: SecretKey,
    pub address: Address,
}

impl TestSigner {
    pub fn new(seed: u8) -> Self {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
        let public = secret.public_key(&secp).serialize_uncompressed();
        let address = Address::from_slice(&keccak256(&public[1..])[12..]);
        Self { secret, address }
    }

    pub fn sign_digest(&self, digest: B256) -> [u8; 65] {
        let secp = Secp256k1::new();
        let (rec_id, sig) = secp
            .sign_ecdsa_recoverable(&Message::from_digest(digest.0), &self.secret)
            .serialize_compact();
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig);
        out[64] = rec_id.to_i32() as u8;
        out
    }

    /// Writes this signer's seal into the trailing extra-data bytes.
    pub fn seal(&self, header: &mut Header) {
        let signature = self.sign_digest(seal_hash(header));
        let mut extra = header.extra_data.to_vec();
        let start = extra.len() - EXTRA_SEAL;
        extra[start..].copy_from_slice(&signature);
        header.extra_data = Bytes::from(extra);
    }

    pub fn sign_fn(&self) -> SignFn {
        let signer = self.clone();
        Arc::new(move |_, digest| Ok(signer.sign_digest(digest)))
    }
}

/// `count` deterministic signers, sorted ascending by address.
pub fn sorted_signers(count: u8) -> Vec<TestSigner> {
    let mut signers: Vec<TestSigner> = (1..=count).map(TestSigner::new).collect();
    signers.sort_by_key(|signer| signer.address);
    signers
}

pub fn addresses(signers: &[TestSigner]) -> Vec<Address> {
    signers.iter().map(|signer| signer.address).collect()
}

/// Extra-data for a checkpoint position: vanity, signer list, zeroed seal.
pub fn checkpoint_extra(signers: &[TestSigner]) -> Bytes {
    let mut extra = vec![0u8; EXTRA_VANITY];
    for signer in signers {
        extra.extend_from_slice(signer.address.as_slice());
    }
    extra.extend_from_slice(&[0u8; EXTRA_SEAL]);
    Bytes::from(extra)
}

/// Genesis header carrying the initial signer list.
pub fn genesis_header(signers: &[TestSigner], timestamp: u64) -> Header {
    Header {
        number: 0,
        timestamp,
        gas_limit: TEST_GAS_LIMIT,
        ommers_hash: EMPTY_OMMER_ROOT_HASH,
        extra_data: checkpoint_extra(signers),
        ..Default::default()
    }
}

/// Builds a fully verifiable chain of `len` blocks: in-turn signers,
/// matching difficulties, period-spaced past timestamps, and checkpoint
/// signer lists at epoch boundaries. Index 0 is the genesis.
pub fn build_chain(signers: &[TestSigner], len: u64, config: &CliqueConfig) -> Vec<Header> {
    let start = now().saturating_sub(config.period * len + 600);
    let mut headers = vec![genesis_header(signers, start)];

    for number in 1..=len {
        let sealer = &signers[(number % signers.len() as u64) as usize];
        let extra = if config.is_checkpoint(number) {
            checkpoint_extra(signers)
        } else {
            Bytes::from(vec![0u8; EXTRA_VANITY + EXTRA_SEAL])
        };
        let mut header = Header {
            number,
            parent_hash: headers[number as usize - 1].hash_slow(),
            timestamp: start + number * config.period,
            difficulty: DIFF_INTURN,
            gas_limit: TEST_GAS_LIMIT,
            ommers_hash: EMPTY_OMMER_ROOT_HASH,
            extra_data: extra,
            ..Default::default()
        };
        sealer.seal(&mut header);
        headers.push(header);
    }
    headers
}

/// A non-checkpoint header carrying a vote, sealed by `signer`.
pub fn vote_header(
    parent: &Header,
    signer: &TestSigner,
    target: Address,
    authorize: bool,
) -> Header {
    let mut header = Header {
        number: parent.number + 1,
        parent_hash: parent.hash_slow(),
        timestamp: parent.timestamp + 1,
        beneficiary: target,
        nonce: if authorize { NONCE_AUTH } else { NONCE_DROP },
        difficulty: DIFF_NOTURN,
        gas_limit: TEST_GAS_LIMIT,
        ommers_hash: EMPTY_OMMER_ROOT_HASH,
        extra_data: Bytes::from(vec![0u8; EXTRA_VANITY + EXTRA_SEAL]),
        ..Default::default()
    };
    signer.seal(&mut header);
    header
}

/// Engine over the given collaborators, with deterministic randomness.
pub fn engine_with(
    reader: Arc<InMemoryHeaderReader>,
    store: Arc<InMemorySnapshotStore>,
    config: CliqueConfig,
) -> Arc<Clique> {
    Clique::with_rng_seeds(config, reader, store, Arc::new(GasLimitValidator), 42, 43)
}

/// Engine with all headers inserted into a fresh in-memory reader.
pub fn engine_over_chain(
    headers: &[Header],
    config: CliqueConfig,
) -> (Arc<Clique>, Arc<InMemoryHeaderReader>, Arc<InMemorySnapshotStore>) {
    let reader = Arc::new(InMemoryHeaderReader::new());
    for header in headers {
        reader.insert(header.clone());
    }
    let store = Arc::new(InMemorySnapshotStore::new());
    let engine = engine_with(reader.clone(), store.clone(), config);
    (engine, reader, store)
}

//! Seal-hash computation and cached ECDSA signer recovery.

use alloy_consensus::Header;
use alloy_primitives::{keccak256, Address, B256};
use alloy_rlp::Encodable;
use parking_lot::Mutex;
use schnellru::{ByLength, LruMap};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, SECP256K1,
};

use crate::consensus::clique::{
    constants::EXTRA_SEAL,
    error::{CliqueError, CliqueResult},
};

/// The digest a seal signature covers: keccak256 of the header RLP with
/// the trailing 65 signature bytes stripped out of extra-data. Every
/// other field, including the rest of extra-data, is hashed as-is.
pub fn seal_hash(header: &Header) -> B256 {
    let mut stripped = header.clone();
    if stripped.extra_data.len() >= EXTRA_SEAL {
        let keep = stripped.extra_data.len() - EXTRA_SEAL;
        stripped.extra_data = stripped.extra_data.slice(..keep);
    }
    let mut buf = Vec::new();
    stripped.encode(&mut buf);
    keccak256(&buf)
}

/// LRU of recovered signer addresses keyed by seal hash.
///
/// Shared between the verifier and the sealer. Misses are idempotent, so
/// one writer at a time is all the coordination a lookup needs.
#[derive(Debug)]
pub struct SignatureCache {
    cache: Mutex<LruMap<B256, Address, ByLength>>,
}

impl SignatureCache {
    pub fn new(capacity: u32) -> Self {
        Self { cache: Mutex::new(LruMap::new(ByLength::new(capacity))) }
    }

    /// Recovers the address that sealed `header`, consulting the cache
    /// first.
    pub fn recover(&self, header: &Header) -> CliqueResult<Address> {
        let extra = &header.extra_data;
        if extra.len() < EXTRA_SEAL {
            return Err(CliqueError::MissingSignature);
        }

        let digest = seal_hash(header);
        if let Some(signer) = self.cache.lock().get(&digest) {
            return Ok(*signer);
        }

        let seal = &extra[extra.len() - EXTRA_SEAL..];
        let recovery_id = RecoveryId::from_i32(seal[EXTRA_SEAL - 1] as i32)
            .map_err(|err| CliqueError::SignatureMalformed(err.to_string()))?;
        let signature = RecoverableSignature::from_compact(&seal[..EXTRA_SEAL - 1], recovery_id)
            .map_err(|err| CliqueError::SignatureMalformed(err.to_string()))?;

        let message = Message::from_digest(digest.0);
        let public = SECP256K1
            .recover_ecdsa(&message, &signature)
            .map_err(|err| CliqueError::PublicKeyDerivation(err.to_string()))?;

        let signer =
            Address::from_slice(&keccak256(&public.serialize_uncompressed()[1..])[12..]);
        self.cache.lock().insert(digest, signer);
        Ok(signer)
    }
}

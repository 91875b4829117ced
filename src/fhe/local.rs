// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process encryption engine and decryption oracle.
//!
//! Handles are keccak256 digests of a nonce and the plaintext; the plaintext
//! table never leaves this module. Proofs are HMAC-SHA256 tags over the
//! request id and the length-prefixed cleartexts, keyed by the oracle's
//! signing key.
//!
//! When a relay channel is attached, every accepted request id is pushed to
//! it so a background task can deliver the callback asynchronously.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::keccak256;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::mpsc::UnboundedSender;

use super::{CiphertextHandle, DecryptionOracle, EncryptionEngine, FheError, FheResult};

type HmacSha256 = Hmac<Sha256>;

/// What the oracle delivers to the callback entry point.
#[derive(Debug, Clone)]
pub struct OracleCallback {
    pub request_id: u64,
    pub cleartexts: Vec<String>,
    pub proof: Vec<u8>,
}

#[derive(Default)]
struct LocalState {
    plaintexts: HashMap<CiphertextHandle, u64>,
    requests: HashMap<u64, Vec<CiphertextHandle>>,
    nonce: u64,
}

/// Development implementation of both capabilities.
pub struct LocalFhe {
    state: Mutex<LocalState>,
    signing_key: Vec<u8>,
    relay: Option<UnboundedSender<u64>>,
}

impl LocalFhe {
    pub fn new(signing_key: impl Into<Vec<u8>>) -> Self {
        Self {
            state: Mutex::new(LocalState::default()),
            signing_key: signing_key.into(),
            relay: None,
        }
    }

    /// Create with a signing key that lives only as long as the process.
    pub fn with_random_key() -> Self {
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
        Self::new(key)
    }

    /// Push every accepted request id to `relay`.
    pub fn with_relay(mut self, relay: UnboundedSender<u64>) -> Self {
        self.relay = Some(relay);
        self
    }

    fn lock(&self) -> FheResult<std::sync::MutexGuard<'_, LocalState>> {
        self.state
            .lock()
            .map_err(|_| FheError::Unavailable("local engine state poisoned".to_string()))
    }

    /// Reveal a handle's plaintext. Only the oracle side may do this.
    pub fn decrypt(&self, handle: &CiphertextHandle) -> FheResult<u64> {
        let state = self.lock()?;
        state
            .plaintexts
            .get(handle)
            .copied()
            .ok_or(FheError::UnknownHandle(*handle))
    }

    /// Produce the callback payload for a previously accepted request.
    pub fn fulfil(&self, request_id: u64) -> FheResult<OracleCallback> {
        let handles = {
            let state = self.lock()?;
            state
                .requests
                .get(&request_id)
                .cloned()
                .ok_or(FheError::UnknownRequest(request_id))?
        };

        let cleartexts = handles
            .iter()
            .map(|h| self.decrypt(h).map(|v| v.to_string()))
            .collect::<FheResult<Vec<_>>>()?;
        let proof = self.sign(request_id, &cleartexts)?;

        Ok(OracleCallback {
            request_id,
            cleartexts,
            proof,
        })
    }

    /// Sign an arbitrary answer for `request_id`.
    pub fn sign(&self, request_id: u64, cleartexts: &[String]) -> FheResult<Vec<u8>> {
        Ok(self.mac(request_id, cleartexts)?.finalize().into_bytes().to_vec())
    }

    fn mac(&self, request_id: u64, cleartexts: &[String]) -> FheResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| FheError::Unavailable(e.to_string()))?;
        mac.update(&request_id.to_be_bytes());
        for text in cleartexts {
            mac.update(&(text.len() as u64).to_be_bytes());
            mac.update(text.as_bytes());
        }
        Ok(mac)
    }
}

impl EncryptionEngine for LocalFhe {
    fn encrypt(&self, plaintext: u64) -> FheResult<CiphertextHandle> {
        let mut state = self.lock()?;
        state.nonce += 1;

        let mut preimage = Vec::with_capacity(24);
        preimage.extend_from_slice(b"fhe:");
        preimage.extend_from_slice(&state.nonce.to_be_bytes());
        preimage.extend_from_slice(&plaintext.to_be_bytes());
        let handle = CiphertextHandle::from(keccak256(&preimage));

        state.plaintexts.insert(handle, plaintext);
        Ok(handle)
    }

    fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> FheResult<CiphertextHandle> {
        let sum = self
            .decrypt(lhs)?
            .checked_add(self.decrypt(rhs)?)
            .ok_or(FheError::Overflow)?;
        self.encrypt(sum)
    }

    fn is_initialized(&self, handle: &CiphertextHandle) -> bool {
        self.lock()
            .map(|state| state.plaintexts.contains_key(handle))
            .unwrap_or(false)
    }
}

/// Largest request id handed out: 2^53 - 1, the largest integer a JSON
/// client using IEEE doubles reads back exactly.
pub const MAX_REQUEST_ID: u64 = (1 << 53) - 1;

fn random_request_id() -> u64 {
    uuid::Uuid::new_v4().as_u64_pair().0 & MAX_REQUEST_ID
}

impl DecryptionOracle for LocalFhe {
    fn request_decryption(&self, handles: &[CiphertextHandle]) -> FheResult<u64> {
        let request_id = {
            let mut state = self.lock()?;
            if let Some(unknown) = handles.iter().find(|h| !state.plaintexts.contains_key(*h)) {
                return Err(FheError::UnknownHandle(*unknown));
            }

            let mut request_id = random_request_id();
            while state.requests.contains_key(&request_id) {
                request_id = random_request_id();
            }
            state.requests.insert(request_id, handles.to_vec());
            request_id
        };

        if let Some(relay) = &self.relay {
            if relay.send(request_id).is_err() {
                tracing::warn!(request_id, "Oracle relay closed; callback must be delivered manually");
            }
        }

        Ok(request_id)
    }

    fn check_signatures(
        &self,
        request_id: u64,
        cleartexts: &[String],
        proof: &[u8],
    ) -> FheResult<()> {
        self.mac(request_id, cleartexts)?
            .verify_slice(proof)
            .map_err(|_| FheError::InvalidSignature)
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encryption Engine and Decryption Oracle Capabilities
//!
//! The service never performs homomorphic arithmetic or decryption itself.
//! It holds opaque 32-byte ciphertext handles and talks to two external
//! capabilities:
//!
//! - [`EncryptionEngine`] produces handles and combines them
//!   (`encrypt`, encrypted zero, homomorphic `add`).
//! - [`DecryptionOracle`] accepts decryption requests, answers later with
//!   cleartexts plus a proof, and verifies such proofs on demand.
//!
//! [`LocalFhe`] implements both in-process for development and tests.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::B256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub mod local;

pub use local::{LocalFhe, OracleCallback};

/// Opaque reference to an encrypted value.
///
/// Rendered as `0x`-prefixed hex; never inspected by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CiphertextHandle(B256);

impl CiphertextHandle {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    /// The all-zero handle, which no engine ever issues.
    pub const fn uninitialized() -> Self {
        Self(B256::ZERO)
    }

    pub fn is_uninitialized(&self) -> bool {
        self.0 == B256::ZERO
    }
}

impl From<B256> for CiphertextHandle {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", alloy::hex::encode(self.as_bytes()))
    }
}

/// Error parsing a handle from its hex form.
#[derive(Debug, thiserror::Error)]
#[error("invalid ciphertext handle: {0}")]
pub struct HandleParseError(String);

impl FromStr for CiphertextHandle {
    type Err = HandleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        let bytes = alloy::hex::decode(hex).map_err(|e| HandleParseError(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HandleParseError(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self::from_bytes(bytes))
    }
}

impl Serialize for CiphertextHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CiphertextHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Errors surfaced by the external capabilities.
#[derive(Debug, thiserror::Error)]
pub enum FheError {
    #[error("ciphertext handle not recognised: {0}")]
    UnknownHandle(CiphertextHandle),

    #[error("oracle does not know request {0}")]
    UnknownRequest(u64),

    #[error("decryption proof rejected")]
    InvalidSignature,

    #[error("plaintext overflow in homomorphic add")]
    Overflow,

    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

pub type FheResult<T> = Result<T, FheError>;

/// Produces and combines ciphertext handles.
pub trait EncryptionEngine: Send + Sync {
    /// Encrypt a plaintext value.
    fn encrypt(&self, plaintext: u64) -> FheResult<CiphertextHandle>;

    /// A fresh encryption of zero, used to seed running aggregates.
    fn zero(&self) -> FheResult<CiphertextHandle> {
        self.encrypt(0)
    }

    /// Homomorphic addition of two ciphertexts.
    fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> FheResult<CiphertextHandle>;

    /// Whether `handle` refers to a value this engine has produced.
    fn is_initialized(&self, handle: &CiphertextHandle) -> bool {
        !handle.is_uninitialized()
    }
}

/// External decryption service.
///
/// `request_decryption` returns immediately with an oracle-chosen request id;
/// the cleartexts arrive later through the service's callback entry point.
pub trait DecryptionOracle: Send + Sync {
    /// Submit handles for decryption. The returned id is opaque and
    /// unpredictable to the caller.
    fn request_decryption(&self, handles: &[CiphertextHandle]) -> FheResult<u64>;

    /// Verify that `proof` authorizes `cleartexts` as the answer to
    /// `request_id`.
    fn check_signatures(&self, request_id: u64, cleartexts: &[String], proof: &[u8])
        -> FheResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_hex_round_trip() {
        let handle = CiphertextHandle::from_bytes([0xab; 32]);
        let text = handle.to_string();
        assert!(text.starts_with("0xabab"));
        assert_eq!(text.len(), 66);
        assert_eq!(text.parse::<CiphertextHandle>().unwrap(), handle);
    }

    #[test]
    fn handle_parse_rejects_wrong_length() {
        assert!("0x1234".parse::<CiphertextHandle>().is_err());
        assert!("not-hex".parse::<CiphertextHandle>().is_err());
    }

    #[test]
    fn handle_serializes_as_string() {
        let handle = CiphertextHandle::from_bytes([1; 32]);
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{handle}\""));
        let back: CiphertextHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, handle);
    }

    #[test]
    fn zero_handle_is_uninitialized() {
        assert!(CiphertextHandle::uninitialized().is_uninitialized());
        assert!(!CiphertextHandle::from_bytes([1; 32]).is_uninitialized());
    }
}

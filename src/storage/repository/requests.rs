// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decryption request records and per-subject correlation slots.
//!
//! ## Storage Layout
//!
//! ```text
//! request_{request_id}        DecryptionRequest (kept after resolution)
//! __pending_{kind}_{subject}  id of the subject's live request, empty if none
//! __live_requests             ids of every unresolved request
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{load_value, store_value, Record, RecordRepository, RepoResult};
use crate::fhe::CiphertextHandle;
use crate::storage::keyed_store::{ReadView, WriteTxn};
use crate::storage::keys::{pending_slot_key, LIVE_REQUESTS};

/// The logical entity a decryption request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// A financial report, by report id
    Report(u64),
    /// An industry bucket, by the numeric id derived from its code
    Industry(u64),
}

impl Subject {
    pub fn kind(&self) -> &'static str {
        match self {
            Subject::Report(_) => "report",
            Subject::Industry(_) => "industry",
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Subject::Report(id) | Subject::Industry(id) => *id,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind(), self.id())
    }
}

/// Correlation state of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Waiting for the oracle
    Pending,
    /// Callback accepted; the mapping is consumed
    Resolved,
    /// Deadline passed before a callback arrived
    Expired,
}

/// Mapping from an oracle request id to the subject awaiting decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DecryptionRequest {
    /// Oracle-assigned, opaque
    pub request_id: u64,
    pub subject: Subject,
    /// Ciphertexts in submission order; cleartexts must match it positionally
    #[schema(value_type = Vec<String>)]
    pub handles: Vec<CiphertextHandle>,
    pub requested_at: i64,
    pub expires_at: i64,
    pub state: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
}

impl DecryptionRequest {
    pub fn is_live(&self) -> bool {
        self.state == RequestState::Pending
    }
}

impl Record for DecryptionRequest {
    const KIND: &'static str = "request";
}

pub type RequestRepository<'a> = RecordRepository<'a, DecryptionRequest>;

impl RequestRepository<'_> {
    /// Live request currently holding `subject`'s slot.
    pub fn pending_for<R: ReadView + ?Sized>(view: &R, subject: Subject) -> RepoResult<Option<u64>> {
        load_value(view, &pending_slot_key(subject.kind(), subject.id()))
    }

    /// Occupy (`Some`) or release (`None`) a subject's slot. Releasing writes
    /// an empty payload, which reads back as absent.
    pub fn set_pending_in<W: WriteTxn + ?Sized>(
        txn: &mut W,
        subject: Subject,
        request_id: Option<u64>,
    ) -> RepoResult<()> {
        let key = pending_slot_key(subject.kind(), subject.id());
        match request_id {
            Some(id) => store_value(txn, &key, &id),
            None => {
                txn.put(&key, &[])?;
                Ok(())
            }
        }
    }

    /// Ids of all unresolved requests, oldest first.
    pub fn live_ids<R: ReadView + ?Sized>(view: &R) -> RepoResult<Vec<u64>> {
        Ok(load_value(view, LIVE_REQUESTS)?.unwrap_or_default())
    }

    pub fn add_live_in<W: WriteTxn + ?Sized>(txn: &mut W, request_id: u64) -> RepoResult<()> {
        let mut ids = Self::live_ids(&*txn)?;
        if !ids.contains(&request_id) {
            ids.push(request_id);
            store_value(txn, LIVE_REQUESTS, &ids)?;
        }
        Ok(())
    }

    pub fn remove_live_in<W: WriteTxn + ?Sized>(txn: &mut W, request_id: u64) -> RepoResult<()> {
        let mut ids = Self::live_ids(&*txn)?;
        let before = ids.len();
        ids.retain(|id| *id != request_id);
        if ids.len() != before {
            store_value(txn, LIVE_REQUESTS, &ids)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStore, KeyedStore};

    #[test]
    fn pending_slot_round_trip_and_release() {
        let store = InMemoryStore::new();
        let subject = Subject::Report(4);

        let mut txn = store.begin_write().unwrap();
        RequestRepository::set_pending_in(txn.as_mut(), subject, Some(99)).unwrap();
        txn.commit().unwrap();
        assert_eq!(RequestRepository::pending_for(&store, subject).unwrap(), Some(99));
        assert_eq!(RequestRepository::pending_for(&store, Subject::Industry(4)).unwrap(), None);

        let mut txn = store.begin_write().unwrap();
        RequestRepository::set_pending_in(txn.as_mut(), subject, None).unwrap();
        txn.commit().unwrap();
        assert_eq!(RequestRepository::pending_for(&store, subject).unwrap(), None);
    }

    #[test]
    fn live_set_adds_once_and_removes() {
        let store = InMemoryStore::new();
        let mut txn = store.begin_write().unwrap();
        RequestRepository::add_live_in(txn.as_mut(), 7).unwrap();
        RequestRepository::add_live_in(txn.as_mut(), 8).unwrap();
        RequestRepository::add_live_in(txn.as_mut(), 7).unwrap();
        RequestRepository::remove_live_in(txn.as_mut(), 7).unwrap();
        txn.commit().unwrap();

        assert_eq!(RequestRepository::live_ids(&store).unwrap(), vec![8]);
    }

    #[test]
    fn subject_display_and_serde() {
        assert_eq!(Subject::Report(3).to_string(), "report #3");
        let json = serde_json::to_string(&Subject::Industry(12)).unwrap();
        assert_eq!(json, r#"{"industry":12}"#);
    }
}

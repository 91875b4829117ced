// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Industry risk buckets.
//!
//! ## Storage Layout
//!
//! ```text
//! industry_{code}               IndustryRiskBucket (indexed, creation order)
//! industry_subject_{subject}    code owning the numeric subject id
//! ```
//!
//! The reverse record is written in the same transaction that creates the
//! bucket, so resolving a decryption callback never has to scan the list of
//! known codes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{load_value, store_value, Record, RecordRepository, RepoResult};
use crate::fhe::CiphertextHandle;
use crate::storage::keyed_store::{ReadView, WriteTxn};
use crate::storage::keys::industry_subject_key;

/// Running encrypted aggregate of the risk scores seen for one industry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IndustryRiskBucket {
    pub industry_code: String,
    /// Numeric id used as the decryption subject for this bucket
    pub subject_id: u64,
    #[schema(value_type = String)]
    pub encrypted_risk_score: CiphertextHandle,
    /// Number of scores folded into the aggregate
    pub observations: u64,
    pub created_at: i64,
    pub is_revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_score: Option<String>,
}

impl IndustryRiskBucket {
    pub fn new(industry_code: &str, subject_id: u64, zero: CiphertextHandle) -> Self {
        Self {
            industry_code: industry_code.to_string(),
            subject_id,
            encrypted_risk_score: zero,
            observations: 0,
            created_at: Utc::now().timestamp(),
            is_revealed: false,
            revealed_score: None,
        }
    }
}

impl Record for IndustryRiskBucket {
    const KIND: &'static str = "industry";
}

pub type IndustryRepository<'a> = RecordRepository<'a, IndustryRiskBucket>;

impl IndustryRepository<'_> {
    /// Industry code bound to a numeric subject id.
    pub fn code_for_subject<R: ReadView + ?Sized>(
        view: &R,
        subject_id: u64,
    ) -> RepoResult<Option<String>> {
        load_value(view, &industry_subject_key(subject_id))
    }

    pub fn bind_subject_in<W: WriteTxn + ?Sized>(
        txn: &mut W,
        subject_id: u64,
        code: &str,
    ) -> RepoResult<()> {
        store_value(txn, &industry_subject_key(subject_id), &code)
    }

    /// Known industry codes in first-observed order.
    pub fn codes(&self) -> RepoResult<Vec<String>> {
        Ok(self
            .list_keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix("industry_").map(str::to_string))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStore, KeyedStore};

    #[test]
    fn reverse_mapping_resolves_code() {
        let store = InMemoryStore::new();
        let bucket = IndustryRiskBucket::new("AC", 77, CiphertextHandle::from_bytes([5; 32]));

        let mut txn = store.begin_write().unwrap();
        IndustryRepository::insert_in(txn.as_mut(), "AC", &bucket).unwrap();
        IndustryRepository::bind_subject_in(txn.as_mut(), 77, "AC").unwrap();
        txn.commit().unwrap();

        assert_eq!(
            IndustryRepository::code_for_subject(&store, 77).unwrap().as_deref(),
            Some("AC")
        );
        assert_eq!(IndustryRepository::code_for_subject(&store, 78).unwrap(), None);
        assert_eq!(IndustryRepository::new(&store).codes().unwrap(), vec!["AC"]);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Immutable analysis results. Several may reference one report.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Record, RecordRepository, RepoResult};
use crate::fhe::CiphertextHandle;

/// One risk analysis of a revealed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    pub id: u64,
    pub report_id: u64,
    #[schema(value_type = String)]
    pub encrypted_risk_score: CiphertextHandle,
    /// Name of the scoring method that produced the score
    pub method: String,
    pub timestamp: i64,
}

impl Record for AnalysisResult {
    const KIND: &'static str = "analysis";
}

pub type AnalysisRepository<'a> = RecordRepository<'a, AnalysisResult>;

impl AnalysisRepository<'_> {
    /// All analyses of one report, oldest first.
    pub fn list_for_report(&self, report_id: u64) -> RepoResult<Vec<AnalysisResult>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|a| a.report_id == report_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    #[test]
    fn list_for_report_filters_by_report() {
        let store = InMemoryStore::new();
        let repo = AnalysisRepository::new(&store);
        for report_id in [1, 2, 1] {
            repo.append(|id| AnalysisResult {
                id,
                report_id,
                encrypted_risk_score: CiphertextHandle::from_bytes([id as u8; 32]),
                method: "test".to_string(),
                timestamp: 0,
            })
            .unwrap();
        }

        let ids: Vec<u64> = repo.list_for_report(1).unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(repo.list_for_report(3).unwrap().is_empty());
    }
}

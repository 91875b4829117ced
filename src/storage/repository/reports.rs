// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Financial reports and their decrypted companions.
//!
//! ## Storage Layout
//!
//! ```text
//! report_{id}       FinancialReport (indexed under __index_report)
//! decrypted_{id}    DecryptedReport, written together with report_{id}
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Record, RecordRepository};
use crate::fhe::CiphertextHandle;

/// Decryption lifecycle of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Submitted, no decryption requested yet
    Pending,
    /// Waiting for the oracle callback
    DecryptionRequested,
    /// Cleartexts delivered and verified
    Revealed,
}

/// Risk classification, assigned only after reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskClassification {
    #[default]
    Unset,
    Analyzed,
    Flagged,
}

/// An encrypted financial report as submitted by a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FinancialReport {
    /// Sequential identifier, starting at 1
    pub id: u64,
    #[schema(value_type = String)]
    pub encrypted_revenue: CiphertextHandle,
    #[schema(value_type = String)]
    pub encrypted_expenses: CiphertextHandle,
    #[schema(value_type = String)]
    pub encrypted_tax_data: CiphertextHandle,
    /// Public, non-secret company identifier
    pub company_identifier: String,
    /// Industry classification derived from the identifier
    pub industry_code: String,
    /// Submission time, unix seconds
    pub timestamp: i64,
    pub status: ReportStatus,
    #[serde(default)]
    pub risk: RiskClassification,
}

impl FinancialReport {
    /// The report's ciphertexts in decryption order: revenue, expenses, tax.
    pub fn ciphertexts(&self) -> Vec<CiphertextHandle> {
        vec![
            self.encrypted_revenue,
            self.encrypted_expenses,
            self.encrypted_tax_data,
        ]
    }

    pub fn is_classified(&self) -> bool {
        self.risk != RiskClassification::Unset
    }
}

impl Record for FinancialReport {
    const KIND: &'static str = "report";
}

/// Plaintext companion of a report, empty until the oracle reveals it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DecryptedReport {
    pub report_id: u64,
    pub revenue: String,
    pub expenses: String,
    pub tax_data: String,
    /// Flips false → true exactly once
    pub is_revealed: bool,
}

impl DecryptedReport {
    pub fn empty(report_id: u64) -> Self {
        Self {
            report_id,
            revenue: String::new(),
            expenses: String::new(),
            tax_data: String::new(),
            is_revealed: false,
        }
    }
}

impl Record for DecryptedReport {
    const KIND: &'static str = "decrypted";
}

pub type ReportRepository<'a> = RecordRepository<'a, FinancialReport>;
pub type DecryptedReportRepository<'a> = RecordRepository<'a, DecryptedReport>;

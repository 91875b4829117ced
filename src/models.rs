// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API that are not stored entities.
//! Stored entities ([`FinancialReport`](crate::storage::FinancialReport),
//! [`AnalysisResult`](crate::storage::AnalysisResult), ...) are returned as-is.
//!
//! Ciphertext handles travel as `0x`-prefixed 32-byte hex strings; oracle
//! proofs as `0x`-prefixed hex of arbitrary length.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::fhe::CiphertextHandle;

// =============================================================================
// Ciphertexts
// =============================================================================

/// Plaintext to encrypt through the engine.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EncryptRequest {
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EncryptResponse {
    #[schema(value_type = String)]
    pub handle: CiphertextHandle,
}

// =============================================================================
// Reports
// =============================================================================

/// A new encrypted financial report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitReportRequest {
    #[schema(value_type = String)]
    pub encrypted_revenue: CiphertextHandle,
    #[schema(value_type = String)]
    pub encrypted_expenses: CiphertextHandle,
    #[schema(value_type = String)]
    pub encrypted_tax_data: CiphertextHandle,
    /// Public company identifier; its first two characters pick the industry
    pub company_identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportKeysResponse {
    pub keys: Vec<String>,
}

/// A plaintext score for re-analysing a revealed report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordAnalysisRequest {
    /// 0 to 100
    pub risk_score: u32,
    #[serde(default)]
    pub method: Option<String>,
}

// =============================================================================
// Oracle
// =============================================================================

/// Callback delivered by the decryption oracle.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OracleCallbackRequest {
    /// Oracle request id. The local oracle keeps ids at or below 2^53 - 1 so
    /// they survive JSON clients that parse numbers as doubles.
    pub request_id: u64,
    /// Cleartexts in the order the ciphertexts were submitted
    pub cleartexts: Vec<String>,
    /// Hex-encoded decryption proof
    pub proof: String,
}

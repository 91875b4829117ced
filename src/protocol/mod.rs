// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential risk analysis protocol.
//!
//! - [`correlator`] - request-id ↔ subject correlation for oracle callbacks
//! - [`aggregator`] - per-industry encrypted score buckets
//! - [`scoring`] - plaintext risk scoring and classification
//! - [`workflow`] - the report lifecycle tying them together

pub mod aggregator;
pub mod correlator;
pub mod error;
pub mod scoring;
pub mod workflow;

pub use aggregator::{classify, industry_subject_id, BucketRef, IndustryAggregator};
pub use correlator::{DecryptionCorrelator, Resolution};
pub use error::{AnalysisError, ProtocolResult};
pub use scoring::{ExpenseTaxRatioScorer, RevealedFigures, RiskScore, RiskScorer, FLAG_THRESHOLD};
pub use workflow::{
    AnalysisOutcome, AnalysisWorkflow, CallbackOutcome, EncryptedFields, ReportView,
    WorkflowPolicy,
};

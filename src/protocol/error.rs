// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy of the analysis protocol.

use crate::fhe::FheError;
use crate::storage::{RepoError, ReportStatus, StoreError, Subject};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    // ---- not found ----
    #[error("report {0} not found")]
    ReportNotFound(u64),

    #[error("analysis {0} not found")]
    AnalysisNotFound(u64),

    #[error("unknown decryption request {0}")]
    UnknownRequest(u64),

    #[error("unknown industry {0}")]
    UnknownIndustry(String),

    // ---- lifecycle ----
    #[error("report {report_id} is {actual:?}, expected {expected:?}")]
    InvalidState {
        report_id: u64,
        expected: ReportStatus,
        actual: ReportStatus,
    },

    #[error("report {0} has not been revealed")]
    NotRevealed(u64),

    #[error("request {request_id} belongs to {subject}, not to a {expected}")]
    SubjectMismatch {
        request_id: u64,
        subject: Subject,
        expected: &'static str,
    },

    // ---- duplicate completion guards ----
    #[error("{0} is already revealed")]
    AlreadyRevealed(Subject),

    #[error("{subject} already has live decryption request {request_id}")]
    AlreadyPending { subject: Subject, request_id: u64 },

    #[error("decryption request {0} was already resolved")]
    AlreadyResolved(u64),

    #[error("decryption request {0} expired before its callback arrived")]
    RequestExpired(u64),

    // ---- callback validation ----
    #[error("decryption proof rejected for request {0}")]
    InvalidProof(u64),

    #[error("request {request_id} expects {expected} cleartexts, got {actual}")]
    ArityMismatch {
        request_id: u64,
        expected: usize,
        actual: usize,
    },

    #[error("cleartext {field} is not a number: {value:?}")]
    MalformedCleartext { field: &'static str, value: String },

    #[error("industry {code} hashes to subject {subject_id} already bound to {existing}")]
    SubjectCollision {
        code: String,
        subject_id: u64,
        existing: String,
    },

    // ---- infrastructure ----
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("encryption capability error: {0}")]
    Fhe(#[from] FheError),
}

impl From<StoreError> for AnalysisError {
    fn from(e: StoreError) -> Self {
        AnalysisError::Repo(RepoError::Store(e))
    }
}

pub type ProtocolResult<T> = Result<T, AnalysisError>;

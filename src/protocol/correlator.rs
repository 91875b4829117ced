// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Decryption Request/Callback Correlation
//!
//! Maps oracle request ids back to the subject (report or industry bucket)
//! awaiting decryption. Per subject the state machine is
//!
//! ```text
//! NoRequest ──request──▶ Requested ──resolve──▶ Resolved
//!                            │
//!                            └──expire──▶ NoRequest (retryable)
//! ```
//!
//! Every transition runs inside the caller's write transaction. Because the
//! store serializes writers, two callbacks racing on one request id resolve
//! exactly once; the loser reads the `Resolved` state and gets
//! [`AnalysisError::AlreadyResolved`].

use std::sync::Arc;

use chrono::Duration;

use super::error::{AnalysisError, ProtocolResult};
use crate::fhe::{CiphertextHandle, DecryptionOracle, FheError};
use crate::storage::repository::industries::IndustryRepository;
use crate::storage::repository::reports::DecryptedReportRepository;
use crate::storage::repository::requests::RequestRepository;
use crate::storage::{DecryptionRequest, ReadView, RequestState, Subject, WriteTxn};

/// A verified callback, matched to its subject.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub request: DecryptionRequest,
    /// Cleartexts in the order the ciphertexts were submitted
    pub cleartexts: Vec<String>,
}

pub struct DecryptionCorrelator {
    oracle: Arc<dyn DecryptionOracle>,
    request_ttl: Duration,
}

impl DecryptionCorrelator {
    pub fn new(oracle: Arc<dyn DecryptionOracle>, request_ttl: Duration) -> Self {
        Self {
            oracle,
            request_ttl,
        }
    }

    /// Register a decryption request for `subject` with the oracle.
    ///
    /// Rejects subjects that are already revealed or already waiting on a
    /// live request.
    pub fn request_in<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        subject: Subject,
        handles: Vec<CiphertextHandle>,
        now: i64,
    ) -> ProtocolResult<DecryptionRequest> {
        if is_revealed(&*txn, subject)? {
            return Err(AnalysisError::AlreadyRevealed(subject));
        }
        if let Some(request_id) = RequestRepository::pending_for(&*txn, subject)? {
            return Err(AnalysisError::AlreadyPending {
                subject,
                request_id,
            });
        }

        let request_id = self.oracle.request_decryption(&handles)?;

        let key = RequestRepository::key(request_id);
        if RequestRepository::load(&*txn, &key)?.is_some() {
            return Err(FheError::Unavailable(format!(
                "oracle reissued request id {request_id}"
            ))
            .into());
        }

        let request = DecryptionRequest {
            request_id,
            subject,
            handles,
            requested_at: now,
            expires_at: now + self.request_ttl.num_seconds(),
            state: RequestState::Pending,
            resolved_at: None,
        };
        RequestRepository::put_in(txn, &key, &request)?;
        RequestRepository::set_pending_in(txn, subject, Some(request_id))?;
        RequestRepository::add_live_in(txn, request_id)?;

        tracing::info!(
            request_id,
            subject = %subject,
            ciphertexts = request.handles.len(),
            "Decryption requested"
        );
        Ok(request)
    }

    /// Look up a request by id. The mapping outlives resolution.
    pub fn lookup<R: ReadView + ?Sized>(
        &self,
        view: &R,
        request_id: u64,
    ) -> ProtocolResult<DecryptionRequest> {
        RequestRepository::load(view, &RequestRepository::key(request_id))?
            .ok_or(AnalysisError::UnknownRequest(request_id))
    }

    /// Check a callback against a request without writing anything:
    /// request still live, proof valid, one cleartext per ciphertext.
    pub fn verify(
        &self,
        request: &DecryptionRequest,
        cleartexts: &[String],
        proof: &[u8],
    ) -> ProtocolResult<()> {
        let request_id = request.request_id;
        match request.state {
            RequestState::Pending => {}
            RequestState::Resolved => return Err(AnalysisError::AlreadyResolved(request_id)),
            RequestState::Expired => return Err(AnalysisError::RequestExpired(request_id)),
        }

        self.oracle
            .check_signatures(request_id, cleartexts, proof)
            .map_err(|e| match e {
                FheError::InvalidSignature => AnalysisError::InvalidProof(request_id),
                other => AnalysisError::Fhe(other),
            })?;

        if cleartexts.len() != request.handles.len() {
            return Err(AnalysisError::ArityMismatch {
                request_id,
                expected: request.handles.len(),
                actual: cleartexts.len(),
            });
        }
        Ok(())
    }

    /// Accept an oracle callback.
    ///
    /// The proof is checked before anything is written; on any error the
    /// caller drops the transaction and no state changes.
    pub fn resolve_in<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        request_id: u64,
        cleartexts: &[String],
        proof: &[u8],
        now: i64,
    ) -> ProtocolResult<Resolution> {
        let mut request = self.lookup(&*txn, request_id)?;
        self.verify(&request, cleartexts, proof)?;

        mark_revealed(txn, request.subject)?;

        request.state = RequestState::Resolved;
        request.resolved_at = Some(now);
        RequestRepository::put_in(txn, &RequestRepository::key(request_id), &request)?;
        RequestRepository::set_pending_in(txn, request.subject, None)?;
        RequestRepository::remove_live_in(txn, request_id)?;

        tracing::info!(request_id, subject = %request.subject, "Decryption resolved");
        Ok(Resolution {
            request,
            cleartexts: cleartexts.to_vec(),
        })
    }

    /// Expire every live request whose deadline is at or before `now`,
    /// releasing its subject for a new request.
    pub fn expire_in<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        now: i64,
    ) -> ProtocolResult<Vec<DecryptionRequest>> {
        let mut expired = Vec::new();

        for request_id in RequestRepository::live_ids(&*txn)? {
            let key = RequestRepository::key(request_id);
            let Some(mut request) = RequestRepository::load(&*txn, &key)? else {
                tracing::warn!(request_id, "Live request record missing, dropping from live set");
                RequestRepository::remove_live_in(txn, request_id)?;
                continue;
            };
            if !request.is_live() || request.expires_at > now {
                continue;
            }

            request.state = RequestState::Expired;
            RequestRepository::put_in(txn, &key, &request)?;
            RequestRepository::set_pending_in(txn, request.subject, None)?;
            RequestRepository::remove_live_in(txn, request_id)?;

            tracing::warn!(request_id, subject = %request.subject, "Decryption request expired");
            expired.push(request);
        }

        Ok(expired)
    }
}

/// Whether the subject's plaintext has already been revealed.
fn is_revealed<R: ReadView + ?Sized>(view: &R, subject: Subject) -> ProtocolResult<bool> {
    match subject {
        Subject::Report(report_id) => {
            let decrypted = DecryptedReportRepository::load(view, &DecryptedReportRepository::key(report_id))?
                .ok_or(AnalysisError::ReportNotFound(report_id))?;
            Ok(decrypted.is_revealed)
        }
        Subject::Industry(subject_id) => {
            let code = IndustryRepository::code_for_subject(view, subject_id)?
                .ok_or_else(|| AnalysisError::UnknownIndustry(subject_id.to_string()))?;
            let bucket = IndustryRepository::load(view, &IndustryRepository::key(&code))?
                .ok_or(AnalysisError::UnknownIndustry(code))?;
            Ok(bucket.is_revealed)
        }
    }
}

/// Flip the subject's reveal flag. Never reverses.
fn mark_revealed<W: WriteTxn + ?Sized>(txn: &mut W, subject: Subject) -> ProtocolResult<()> {
    match subject {
        Subject::Report(report_id) => {
            let key = DecryptedReportRepository::key(report_id);
            let mut decrypted = DecryptedReportRepository::load(&*txn, &key)?
                .ok_or(AnalysisError::ReportNotFound(report_id))?;
            if decrypted.is_revealed {
                return Err(AnalysisError::AlreadyRevealed(subject));
            }
            decrypted.is_revealed = true;
            DecryptedReportRepository::put_in(txn, &key, &decrypted)?;
        }
        Subject::Industry(subject_id) => {
            let code = IndustryRepository::code_for_subject(&*txn, subject_id)?
                .ok_or_else(|| AnalysisError::UnknownIndustry(subject_id.to_string()))?;
            let key = IndustryRepository::key(&code);
            let mut bucket = IndustryRepository::load(&*txn, &key)?
                .ok_or(AnalysisError::UnknownIndustry(code))?;
            if bucket.is_revealed {
                return Err(AnalysisError::AlreadyRevealed(subject));
            }
            bucket.is_revealed = true;
            IndustryRepository::put_in(txn, &key, &bucket)?;
        }
    }
    Ok(())
}

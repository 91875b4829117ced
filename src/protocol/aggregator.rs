// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-industry encrypted risk aggregation.
//!
//! Buckets are created lazily the first time an industry is observed and are
//! never deleted. Each bucket carries a numeric subject id (the first eight
//! bytes of `keccak256(code)`) so it can take part in decryption correlation.

use std::sync::Arc;

use alloy::primitives::keccak256;

use super::correlator::DecryptionCorrelator;
use super::error::{AnalysisError, ProtocolResult};
use crate::fhe::{CiphertextHandle, EncryptionEngine};
use crate::storage::repository::industries::IndustryRepository;
use crate::storage::{DecryptionRequest, IndustryRiskBucket, ReadView, Subject, WriteTxn};

/// Fallback code for identifiers too short to classify.
pub const OTHER_INDUSTRY: &str = "OTHER";

/// Derive the industry code from a public company identifier.
pub fn classify(company_identifier: &str) -> String {
    let mut chars = company_identifier.chars();
    match (chars.next(), chars.next()) {
        (Some(a), Some(b)) => [a, b].iter().collect(),
        _ => OTHER_INDUSTRY.to_string(),
    }
}

/// Numeric decryption subject of an industry code.
pub fn industry_subject_id(code: &str) -> u64 {
    let digest = keccak256(code.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Reference to an industry bucket returned by [`IndustryAggregator::observe_in`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRef {
    pub industry_code: String,
    pub subject_id: u64,
    /// True only for the call that created the bucket
    pub created: bool,
}

pub struct IndustryAggregator {
    engine: Arc<dyn EncryptionEngine>,
}

impl IndustryAggregator {
    pub fn new(engine: Arc<dyn EncryptionEngine>) -> Self {
        Self { engine }
    }

    /// Ensure a bucket exists for `code`, creating it at encrypted zero.
    pub fn observe_in<W: WriteTxn + ?Sized>(&self, txn: &mut W, code: &str) -> ProtocolResult<BucketRef> {
        let subject_id = industry_subject_id(code);
        if let Some(bucket) = IndustryRepository::load(&*txn, &IndustryRepository::key(code))? {
            return Ok(BucketRef {
                industry_code: bucket.industry_code,
                subject_id: bucket.subject_id,
                created: false,
            });
        }

        if let Some(existing) = IndustryRepository::code_for_subject(&*txn, subject_id)? {
            if existing != code {
                return Err(AnalysisError::SubjectCollision {
                    code: code.to_string(),
                    subject_id,
                    existing,
                });
            }
        }

        let bucket = IndustryRiskBucket::new(code, subject_id, self.engine.zero()?);
        IndustryRepository::insert_in(txn, code, &bucket)?;
        IndustryRepository::bind_subject_in(txn, subject_id, code)?;

        tracing::info!(industry = %code, subject_id, "Industry bucket created");
        Ok(BucketRef {
            industry_code: code.to_string(),
            subject_id,
            created: true,
        })
    }

    /// Fold an encrypted score into the industry's running total.
    pub fn accumulate_in<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        code: &str,
        score: &CiphertextHandle,
    ) -> ProtocolResult<IndustryRiskBucket> {
        let key = IndustryRepository::key(code);
        let mut bucket = IndustryRepository::load(&*txn, &key)?
            .ok_or_else(|| AnalysisError::UnknownIndustry(code.to_string()))?;

        bucket.encrypted_risk_score = if self.engine.is_initialized(&bucket.encrypted_risk_score) {
            self.engine.add(&bucket.encrypted_risk_score, score)?
        } else {
            tracing::warn!(industry = %code, "Bucket aggregate uninitialized, restarting from this score");
            *score
        };
        bucket.observations += 1;

        IndustryRepository::put_in(txn, &key, &bucket)?;
        Ok(bucket)
    }

    /// Ask the oracle to reveal an industry's aggregate.
    pub fn request_bucket_decryption_in<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        correlator: &DecryptionCorrelator,
        code: &str,
        now: i64,
    ) -> ProtocolResult<DecryptionRequest> {
        let bucket = IndustryRepository::load(&*txn, &IndustryRepository::key(code))?
            .ok_or_else(|| AnalysisError::UnknownIndustry(code.to_string()))?;
        correlator.request_in(
            txn,
            Subject::Industry(bucket.subject_id),
            vec![bucket.encrypted_risk_score],
            now,
        )
    }

    /// Store the revealed aggregate of a resolved industry request.
    pub fn reveal_in<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        subject_id: u64,
        score: &str,
    ) -> ProtocolResult<IndustryRiskBucket> {
        let code = IndustryRepository::code_for_subject(&*txn, subject_id)?
            .ok_or_else(|| AnalysisError::UnknownIndustry(subject_id.to_string()))?;
        let key = IndustryRepository::key(&code);
        let mut bucket = IndustryRepository::load(&*txn, &key)?
            .ok_or(AnalysisError::UnknownIndustry(code))?;

        bucket.revealed_score = Some(score.to_string());
        IndustryRepository::put_in(txn, &key, &bucket)?;
        Ok(bucket)
    }

    pub fn bucket<R: ReadView + ?Sized>(&self, view: &R, code: &str) -> ProtocolResult<IndustryRiskBucket> {
        IndustryRepository::load(view, &IndustryRepository::key(code))?
            .ok_or_else(|| AnalysisError::UnknownIndustry(code.to_string()))
    }
}

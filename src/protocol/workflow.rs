// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Analysis Workflow
//!
//! Orchestrates the report lifecycle:
//!
//! ```text
//! submit ──▶ Pending ──request_analysis──▶ DecryptionRequested ──callback──▶ Revealed
//!               ▲                                   │
//!               └────────────── expiry ─────────────┘
//! ```
//!
//! Every mutating operation runs in a single store write transaction: the
//! state change, any analysis record, the industry aggregate and the audit
//! events commit together or not at all. Rejected invalid proofs are the one
//! exception; their security audit event is written on its own after the
//! rejected transaction is discarded.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::aggregator::{classify, BucketRef, IndustryAggregator};
use super::correlator::DecryptionCorrelator;
use super::error::{AnalysisError, ProtocolResult};
use super::scoring::{RevealedFigures, RiskScore, RiskScorer, FLAG_THRESHOLD};
use crate::fhe::{CiphertextHandle, DecryptionOracle, EncryptionEngine};
use crate::storage::repository::analysis::AnalysisRepository;
use crate::storage::repository::industries::IndustryRepository;
use crate::storage::repository::reports::{DecryptedReportRepository, ReportRepository};
use crate::storage::{
    AnalysisResult, AuditEntry, AuditEvent, AuditEventType, AuditRepository, DecryptedReport,
    DecryptionRequest, FinancialReport, IndustryRiskBucket, KeyedStore, ReportStatus,
    RiskClassification, Subject, WriteTxn,
};

/// Tunable workflow parameters.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowPolicy {
    /// Scores strictly above this flag the report
    pub flag_threshold: u32,
    /// How long a decryption request may wait for its callback
    pub request_ttl: Duration,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            flag_threshold: FLAG_THRESHOLD,
            request_ttl: Duration::hours(1),
        }
    }
}

/// The three encrypted fields of a new report.
#[derive(Debug, Clone, Copy)]
pub struct EncryptedFields {
    pub revenue: CiphertextHandle,
    pub expenses: CiphertextHandle,
    pub tax_data: CiphertextHandle,
}

/// Result of revealing or analysing a report.
///
/// A report whose figures the scorer cannot read is revealed without an
/// analysis; `analysis_id` and `method` are then absent and `risk` stays
/// `Unset` until [`AnalysisWorkflow::record_analysis`] classifies it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisOutcome {
    pub report_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<u64>,
    pub risk: RiskClassification,
    pub industry_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// What an oracle callback resolved to.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "subject", rename_all = "snake_case")]
pub enum CallbackOutcome {
    Report(AnalysisOutcome),
    Industry(IndustryRiskBucket),
}

/// A report with its plaintext companion, present only once revealed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportView {
    pub report: FinancialReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decrypted: Option<DecryptedReport>,
}

pub struct AnalysisWorkflow {
    store: Arc<dyn KeyedStore>,
    engine: Arc<dyn EncryptionEngine>,
    scorer: Arc<dyn RiskScorer>,
    correlator: DecryptionCorrelator,
    aggregator: IndustryAggregator,
    policy: WorkflowPolicy,
}

impl AnalysisWorkflow {
    pub fn new(
        store: Arc<dyn KeyedStore>,
        engine: Arc<dyn EncryptionEngine>,
        oracle: Arc<dyn DecryptionOracle>,
        scorer: Arc<dyn RiskScorer>,
        policy: WorkflowPolicy,
    ) -> Self {
        Self {
            correlator: DecryptionCorrelator::new(oracle, policy.request_ttl),
            aggregator: IndustryAggregator::new(engine.clone()),
            store,
            engine,
            scorer,
            policy,
        }
    }

    pub fn store(&self) -> &dyn KeyedStore {
        &*self.store
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    // =========================================================================
    // Report lifecycle
    // =========================================================================

    /// Store a new encrypted report in `Pending` state.
    pub fn submit(
        &self,
        fields: EncryptedFields,
        company_identifier: &str,
    ) -> ProtocolResult<FinancialReport> {
        let now = Utc::now().timestamp();
        let industry_code = classify(company_identifier);

        let mut txn = self.store.begin_write()?;
        let (_, report) = ReportRepository::append_in(txn.as_mut(), |id| FinancialReport {
            id,
            encrypted_revenue: fields.revenue,
            encrypted_expenses: fields.expenses,
            encrypted_tax_data: fields.tax_data,
            company_identifier: company_identifier.to_string(),
            industry_code,
            timestamp: now,
            status: ReportStatus::Pending,
            risk: RiskClassification::Unset,
        })?;
        DecryptedReportRepository::put_in(
            txn.as_mut(),
            &DecryptedReportRepository::key(report.id),
            &DecryptedReport::empty(report.id),
        )?;
        AuditRepository::log_in(
            txn.as_mut(),
            AuditEntry::new(AuditEventType::ReportSubmitted)
                .with_resource("report", report.id)
                .with_details(json!({
                    "company_identifier": report.company_identifier,
                    "industry_code": report.industry_code,
                })),
        )?;
        txn.commit()?;

        tracing::info!(
            report_id = report.id,
            company = %report.company_identifier,
            industry = %report.industry_code,
            "Report submitted"
        );
        Ok(report)
    }

    /// Ask the oracle to reveal a pending report's three ciphertexts.
    pub fn request_analysis(&self, report_id: u64) -> ProtocolResult<DecryptionRequest> {
        let now = Utc::now().timestamp();
        let mut txn = self.store.begin_write()?;

        let key = ReportRepository::key(report_id);
        let mut report = ReportRepository::load(&*txn, &key)?
            .ok_or(AnalysisError::ReportNotFound(report_id))?;
        expect_status(&report, ReportStatus::Pending)?;

        let request = self.correlator.request_in(
            txn.as_mut(),
            Subject::Report(report_id),
            report.ciphertexts(),
            now,
        )?;

        report.status = ReportStatus::DecryptionRequested;
        ReportRepository::put_in(txn.as_mut(), &key, &report)?;
        AuditRepository::log_in(
            txn.as_mut(),
            AuditEntry::new(AuditEventType::DecryptionRequested)
                .with_resource("report", report_id)
                .with_details(json!({
                    "request_id": request.request_id,
                    "expires_at": request.expires_at,
                })),
        )?;
        txn.commit()?;

        Ok(request)
    }

    /// Resolve a report's decryption and record its first analysis.
    ///
    /// Stores the decrypted fields, reveals the report, records an
    /// [`AnalysisResult`] with the encrypted score, folds the score into the
    /// industry aggregate and classifies the report.
    pub fn complete_analysis(
        &self,
        request_id: u64,
        cleartexts: &[String],
        proof: &[u8],
        score: RiskScore,
    ) -> ProtocolResult<AnalysisOutcome> {
        self.reveal_report(request_id, cleartexts, proof, Some(score))
    }

    /// Resolve a report's decryption, storing the decrypted strings. Without a
    /// score the report is revealed unclassified and no analysis is recorded.
    fn reveal_report(
        &self,
        request_id: u64,
        cleartexts: &[String],
        proof: &[u8],
        score: Option<RiskScore>,
    ) -> ProtocolResult<AnalysisOutcome> {
        let now = Utc::now().timestamp();
        let mut txn = self.store.begin_write()?;

        let request = self.correlator.lookup(&*txn, request_id)?;
        let Subject::Report(report_id) = request.subject else {
            return Err(AnalysisError::SubjectMismatch {
                request_id,
                subject: request.subject,
                expected: "report",
            });
        };

        let resolution = match self
            .correlator
            .resolve_in(txn.as_mut(), request_id, cleartexts, proof, now)
        {
            Ok(resolution) => resolution,
            Err(e) => {
                drop(txn);
                self.note_rejected_callback(&request, &e);
                return Err(e);
            }
        };

        let key = ReportRepository::key(report_id);
        let mut report = ReportRepository::load(&*txn, &key)?
            .ok_or(AnalysisError::ReportNotFound(report_id))?;
        expect_status(&report, ReportStatus::DecryptionRequested)?;

        let [revenue, expenses, tax_data] = resolution.cleartexts.as_slice() else {
            return Err(AnalysisError::ArityMismatch {
                request_id,
                expected: 3,
                actual: resolution.cleartexts.len(),
            });
        };
        DecryptedReportRepository::put_in(
            txn.as_mut(),
            &DecryptedReportRepository::key(report_id),
            &DecryptedReport {
                report_id,
                revenue: revenue.clone(),
                expenses: expenses.clone(),
                tax_data: tax_data.clone(),
                is_revealed: true,
            },
        )?;

        report.status = ReportStatus::Revealed;
        report.risk = score
            .as_ref()
            .map_or(RiskClassification::Unset, |s| s.classify(self.policy.flag_threshold));
        ReportRepository::put_in(txn.as_mut(), &key, &report)?;

        AuditRepository::log_in(
            txn.as_mut(),
            AuditEntry::new(AuditEventType::DecryptionResolved)
                .with_resource("report", report_id)
                .with_details(json!({ "request_id": request_id, "scored": score.is_some() })),
        )?;
        let analysis = match &score {
            Some(score) => Some(self.analyse_in(txn.as_mut(), &report, score, true, now)?),
            None => None,
        };
        txn.commit()?;

        match &analysis {
            Some(analysis) => tracing::info!(
                report_id,
                request_id,
                analysis_id = analysis.id,
                risk = ?report.risk,
                "Report revealed and analyzed"
            ),
            None => tracing::warn!(report_id, request_id, "Report revealed without a risk score"),
        }
        Ok(AnalysisOutcome {
            report_id,
            analysis_id: analysis.as_ref().map(|a| a.id),
            risk: report.risk,
            industry_code: report.industry_code,
            method: analysis.map(|a| a.method),
        })
    }

    /// Oracle callback entry point.
    ///
    /// Report subjects are scored with the configured [`RiskScorer`] and
    /// completed through [`complete_analysis`](Self::complete_analysis).
    /// Figures the scorer cannot read are still revealed, unclassified.
    /// Industry subjects store the revealed aggregate.
    pub fn handle_callback(
        &self,
        request_id: u64,
        cleartexts: &[String],
        proof: &[u8],
    ) -> ProtocolResult<CallbackOutcome> {
        let request = self.correlator.lookup(&*self.store, request_id)?;
        if let Err(e) = self.correlator.verify(&request, cleartexts, proof) {
            self.note_rejected_callback(&request, &e);
            return Err(e);
        }

        match request.subject {
            Subject::Report(report_id) => {
                let scored = RevealedFigures::parse(cleartexts).and_then(|f| self.scorer.score(&f));
                let score = match scored {
                    Ok(score) => Some(score),
                    Err(e @ AnalysisError::MalformedCleartext { .. }) => {
                        tracing::warn!(
                            report_id,
                            request_id,
                            error = %e,
                            "Revealed figures cannot be scored; revealing unclassified"
                        );
                        None
                    }
                    Err(e) => return Err(e),
                };
                self.reveal_report(request_id, cleartexts, proof, score)
                    .map(CallbackOutcome::Report)
            }
            Subject::Industry(_) => self
                .complete_bucket_reveal(request_id, cleartexts, proof)
                .map(CallbackOutcome::Industry),
        }
    }

    /// Analyse an already revealed report. A report revealed unclassified
    /// takes its classification from this score; otherwise the
    /// classification set at reveal is kept.
    pub fn record_analysis(&self, report_id: u64, score: RiskScore) -> ProtocolResult<AnalysisOutcome> {
        let now = Utc::now().timestamp();
        let mut txn = self.store.begin_write()?;

        let key = ReportRepository::key(report_id);
        let mut report = ReportRepository::load(&*txn, &key)?
            .ok_or(AnalysisError::ReportNotFound(report_id))?;
        if report.status != ReportStatus::Revealed {
            return Err(AnalysisError::NotRevealed(report_id));
        }

        let classifies = !report.is_classified();
        if classifies {
            report.risk = score.classify(self.policy.flag_threshold);
            ReportRepository::put_in(txn.as_mut(), &key, &report)?;
        }
        let analysis = self.analyse_in(txn.as_mut(), &report, &score, classifies, now)?;
        txn.commit()?;

        tracing::info!(report_id, analysis_id = analysis.id, method = %analysis.method, "Analysis recorded");
        Ok(AnalysisOutcome {
            report_id,
            analysis_id: Some(analysis.id),
            risk: report.risk,
            industry_code: report.industry_code,
            method: Some(analysis.method),
        })
    }

    /// Escalate a revealed report to `Flagged`. Flagging twice is a no-op.
    pub fn flag_report(&self, report_id: u64) -> ProtocolResult<FinancialReport> {
        let mut txn = self.store.begin_write()?;

        let key = ReportRepository::key(report_id);
        let mut report = ReportRepository::load(&*txn, &key)?
            .ok_or(AnalysisError::ReportNotFound(report_id))?;
        if report.status != ReportStatus::Revealed {
            return Err(AnalysisError::NotRevealed(report_id));
        }
        if report.risk == RiskClassification::Flagged {
            return Ok(report);
        }

        let previous = report.risk;
        report.risk = RiskClassification::Flagged;
        ReportRepository::put_in(txn.as_mut(), &key, &report)?;
        AuditRepository::log_in(
            txn.as_mut(),
            AuditEntry::new(AuditEventType::ReportFlagged)
                .with_resource("report", report_id)
                .with_details(json!({ "source": "manual", "previous": previous })),
        )?;
        txn.commit()?;

        tracing::warn!(report_id, "Report flagged manually");
        Ok(report)
    }

    /// Expire decryption requests whose deadline is at or before `now`.
    /// Reports waiting on an expired request return to `Pending`.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> ProtocolResult<Vec<DecryptionRequest>> {
        let mut txn = self.store.begin_write()?;
        let expired = self.correlator.expire_in(txn.as_mut(), now.timestamp())?;
        if expired.is_empty() {
            return Ok(expired);
        }

        for request in &expired {
            if let Subject::Report(report_id) = request.subject {
                let key = ReportRepository::key(report_id);
                match ReportRepository::load(&*txn, &key)? {
                    Some(mut report) if report.status == ReportStatus::DecryptionRequested => {
                        report.status = ReportStatus::Pending;
                        ReportRepository::put_in(txn.as_mut(), &key, &report)?;
                    }
                    Some(_) => {}
                    None => tracing::warn!(report_id, "Expired request refers to a missing report"),
                }
            }
            AuditRepository::log_in(
                txn.as_mut(),
                AuditEntry::new(AuditEventType::DecryptionExpired)
                    .with_resource(request.subject.kind(), request.subject.id())
                    .with_details(json!({
                        "request_id": request.request_id,
                        "expires_at": request.expires_at,
                    })),
            )?;
        }
        txn.commit()?;

        Ok(expired)
    }

    // =========================================================================
    // Industry aggregates
    // =========================================================================

    /// Ask the oracle to reveal an industry's aggregate score.
    pub fn request_bucket_decryption(&self, industry_code: &str) -> ProtocolResult<DecryptionRequest> {
        let now = Utc::now().timestamp();
        let mut txn = self.store.begin_write()?;

        let request = self.aggregator.request_bucket_decryption_in(
            txn.as_mut(),
            &self.correlator,
            industry_code,
            now,
        )?;
        AuditRepository::log_in(
            txn.as_mut(),
            AuditEntry::new(AuditEventType::DecryptionRequested)
                .with_resource("industry", industry_code)
                .with_details(json!({
                    "request_id": request.request_id,
                    "expires_at": request.expires_at,
                })),
        )?;
        txn.commit()?;

        Ok(request)
    }

    fn complete_bucket_reveal(
        &self,
        request_id: u64,
        cleartexts: &[String],
        proof: &[u8],
    ) -> ProtocolResult<IndustryRiskBucket> {
        let now = Utc::now().timestamp();
        let mut txn = self.store.begin_write()?;

        let request = self.correlator.lookup(&*txn, request_id)?;
        let resolution = match self
            .correlator
            .resolve_in(txn.as_mut(), request_id, cleartexts, proof, now)
        {
            Ok(resolution) => resolution,
            Err(e) => {
                drop(txn);
                self.note_rejected_callback(&request, &e);
                return Err(e);
            }
        };
        let Subject::Industry(subject_id) = resolution.request.subject else {
            return Err(AnalysisError::SubjectMismatch {
                request_id,
                subject: resolution.request.subject,
                expected: "industry",
            });
        };

        let score = resolution.cleartexts.first().map(String::as_str).unwrap_or_default();
        let bucket = self.aggregator.reveal_in(txn.as_mut(), subject_id, score)?;
        AuditRepository::log_in(
            txn.as_mut(),
            AuditEntry::new(AuditEventType::IndustryRevealed)
                .with_resource("industry", &bucket.industry_code)
                .with_details(json!({
                    "request_id": request_id,
                    "observations": bucket.observations,
                })),
        )?;
        txn.commit()?;

        tracing::info!(industry = %bucket.industry_code, request_id, "Industry aggregate revealed");
        Ok(bucket)
    }

    // =========================================================================
    // Read surface
    // =========================================================================

    /// Every report key in submission order.
    pub fn report_keys(&self) -> ProtocolResult<Vec<String>> {
        Ok(ReportRepository::new(self.store()).list_keys()?)
    }

    pub fn list_reports(&self) -> ProtocolResult<Vec<FinancialReport>> {
        Ok(ReportRepository::new(self.store()).list_all()?)
    }

    pub fn report(&self, report_id: u64) -> ProtocolResult<FinancialReport> {
        ReportRepository::new(self.store())
            .get_id(report_id)?
            .ok_or(AnalysisError::ReportNotFound(report_id))
    }

    /// A report and, once revealed, its decrypted fields.
    pub fn report_view(&self, report_id: u64) -> ProtocolResult<ReportView> {
        let report = self.report(report_id)?;
        let decrypted = DecryptedReportRepository::new(self.store())
            .get_id(report_id)?
            .filter(|d| d.is_revealed);
        Ok(ReportView { report, decrypted })
    }

    pub fn analysis(&self, analysis_id: u64) -> ProtocolResult<AnalysisResult> {
        AnalysisRepository::new(self.store())
            .get_id(analysis_id)?
            .ok_or(AnalysisError::AnalysisNotFound(analysis_id))
    }

    pub fn analyses_for_report(&self, report_id: u64) -> ProtocolResult<Vec<AnalysisResult>> {
        self.report(report_id)?;
        Ok(AnalysisRepository::new(self.store()).list_for_report(report_id)?)
    }

    pub fn bucket(&self, industry_code: &str) -> ProtocolResult<IndustryRiskBucket> {
        self.aggregator.bucket(self.store(), industry_code)
    }

    pub fn list_buckets(&self) -> ProtocolResult<Vec<IndustryRiskBucket>> {
        Ok(IndustryRepository::new(self.store()).list_all()?)
    }

    pub fn request(&self, request_id: u64) -> ProtocolResult<DecryptionRequest> {
        self.correlator.lookup(self.store(), request_id)
    }

    pub fn recent_audit(&self, limit: usize) -> ProtocolResult<Vec<AuditEvent>> {
        Ok(AuditRepository::new(self.store()).recent(limit)?)
    }

    /// Audit trail of one resource, newest first.
    pub fn audit_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        limit: usize,
    ) -> ProtocolResult<Vec<AuditEvent>> {
        let mut events = AuditRepository::new(self.store()).search_by_resource(resource_type, resource_id)?;
        events.reverse();
        events.truncate(limit);
        Ok(events)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Record an analysis. `classified` marks the analysis that set the
    /// report's classification; a resulting flag is audited.
    fn analyse_in<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        report: &FinancialReport,
        score: &RiskScore,
        classified: bool,
        now: i64,
    ) -> ProtocolResult<AnalysisResult> {
        let (analysis, _) = self.append_analysis_in(txn, report, score, now)?;
        if classified && report.risk == RiskClassification::Flagged {
            AuditRepository::log_in(
                txn,
                AuditEntry::new(AuditEventType::ReportFlagged)
                    .with_resource("report", report.id)
                    .with_details(json!({ "source": "analysis", "analysis_id": analysis.id })),
            )?;
        }
        Ok(analysis)
    }

    /// Encrypt the score, record an immutable analysis and fold the score into
    /// the report's industry bucket.
    fn append_analysis_in<W: WriteTxn + ?Sized>(
        &self,
        txn: &mut W,
        report: &FinancialReport,
        score: &RiskScore,
        now: i64,
    ) -> ProtocolResult<(AnalysisResult, BucketRef)> {
        let encrypted = self.engine.encrypt(u64::from(score.value))?;

        let (_, analysis) = AnalysisRepository::append_in(txn, |id| AnalysisResult {
            id,
            report_id: report.id,
            encrypted_risk_score: encrypted,
            method: score.method.clone(),
            timestamp: now,
        })?;

        let bucket = self.aggregator.observe_in(txn, &report.industry_code)?;
        if bucket.created {
            AuditRepository::log_in(
                txn,
                AuditEntry::new(AuditEventType::IndustryBucketCreated)
                    .with_resource("industry", &bucket.industry_code)
                    .with_details(json!({ "subject_id": bucket.subject_id })),
            )?;
        }
        self.aggregator
            .accumulate_in(txn, &report.industry_code, &encrypted)?;

        AuditRepository::log_in(
            txn,
            AuditEntry::new(AuditEventType::AnalysisRecorded)
                .with_resource("report", report.id)
                .with_details(json!({
                    "analysis_id": analysis.id,
                    "method": analysis.method,
                    "industry_code": report.industry_code,
                })),
        )?;
        Ok((analysis, bucket))
    }

    /// Security-relevant rejections get an audit event of their own.
    fn note_rejected_callback(&self, request: &DecryptionRequest, error: &AnalysisError) {
        if !matches!(error, AnalysisError::InvalidProof(_)) {
            tracing::debug!(request_id = request.request_id, error = %error, "Callback rejected");
            return;
        }

        tracing::warn!(
            request_id = request.request_id,
            subject = %request.subject,
            "Decryption callback carried an invalid proof"
        );
        let entry = AuditEntry::new(AuditEventType::InvalidProof)
            .with_resource("request", request.request_id)
            .with_details(json!({ "subject": request.subject }))
            .failed(error.to_string());
        if let Err(e) = AuditRepository::new(self.store()).log(entry) {
            tracing::error!(error = %e, "Failed to record invalid proof audit event");
        }
    }
}

fn expect_status(report: &FinancialReport, expected: ReportStatus) -> ProtocolResult<()> {
    if report.status == expected {
        Ok(())
    } else {
        Err(AnalysisError::InvalidState {
            report_id: report.id,
            expected,
            actual: report.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::LocalFhe;
    use crate::protocol::scoring::ExpenseTaxRatioScorer;
    use crate::storage::{InMemoryStore, RequestState};

    struct Harness {
        fhe: Arc<LocalFhe>,
        workflow: AnalysisWorkflow,
    }

    fn harness() -> Harness {
        let fhe = Arc::new(LocalFhe::new(b"workflow-test".to_vec()));
        let workflow = AnalysisWorkflow::new(
            Arc::new(InMemoryStore::new()),
            fhe.clone(),
            fhe.clone(),
            Arc::new(ExpenseTaxRatioScorer),
            WorkflowPolicy::default(),
        );
        Harness { fhe, workflow }
    }

    impl Harness {
        fn submit(&self, company: &str, revenue: u64, expenses: u64, tax: u64) -> FinancialReport {
            let fields = EncryptedFields {
                revenue: self.fhe.encrypt(revenue).unwrap(),
                expenses: self.fhe.encrypt(expenses).unwrap(),
                tax_data: self.fhe.encrypt(tax).unwrap(),
            };
            self.workflow.submit(fields, company).unwrap()
        }

        fn callback(&self, request_id: u64) -> ProtocolResult<CallbackOutcome> {
            let cb = self.fhe.fulfil(request_id).unwrap();
            self.workflow.handle_callback(cb.request_id, &cb.cleartexts, &cb.proof)
        }

        fn complete_with_score(&self, report_id: u64, score: u32) -> AnalysisOutcome {
            let request = self.workflow.request_analysis(report_id).unwrap();
            let cb = self.fhe.fulfil(request.request_id).unwrap();
            self.workflow
                .complete_analysis(request.request_id, &cb.cleartexts, &cb.proof, RiskScore::new(score, "fixed"))
                .unwrap()
        }

        fn audit_types(&self) -> Vec<AuditEventType> {
            self.workflow
                .recent_audit(usize::MAX)
                .unwrap()
                .into_iter()
                .map(|e| e.event_type)
                .collect()
        }
    }

    #[test]
    fn submit_creates_pending_unclassified_report() {
        let h = harness();
        let report = h.submit("ACME-CORP", 1000, 500, 200);

        assert_eq!(report.id, 1);
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.risk, RiskClassification::Unset);
        assert_eq!(report.industry_code, "AC");

        let view = h.workflow.report_view(1).unwrap();
        assert!(view.decrypted.is_none());
        assert_eq!(h.audit_types(), vec![AuditEventType::ReportSubmitted]);
    }

    #[test]
    fn every_submitted_report_is_indexed_in_order() {
        let h = harness();
        for company in ["AAA", "BBB", "CCC"] {
            h.submit(company, 1, 1, 1);
        }
        assert_eq!(
            h.workflow.report_keys().unwrap(),
            vec!["report_1", "report_2", "report_3"]
        );
        assert_eq!(h.workflow.list_reports().unwrap().len(), 3);
    }

    #[test]
    fn high_score_flags_and_low_score_analyzes() {
        let h = harness();
        let risky = h.submit("ACME-CORP", 1000, 900, 0);
        let safe = h.submit("ACME-LABS", 1000, 400, 150);

        let flagged = h.complete_with_score(risky.id, 85);
        let analyzed = h.complete_with_score(safe.id, 40);

        assert_eq!(flagged.risk, RiskClassification::Flagged);
        assert_eq!(analyzed.risk, RiskClassification::Analyzed);

        let view = h.workflow.report_view(risky.id).unwrap();
        assert_eq!(view.report.status, ReportStatus::Revealed);
        let decrypted = view.decrypted.unwrap();
        assert_eq!(
            (decrypted.revenue.as_str(), decrypted.expenses.as_str(), decrypted.tax_data.as_str()),
            ("1000", "900", "0")
        );

        let bucket = h.workflow.bucket("AC").unwrap();
        assert_eq!(bucket.observations, 2);
        assert_eq!(h.fhe.decrypt(&bucket.encrypted_risk_score).unwrap(), 125);
    }

    #[test]
    fn callback_scores_with_configured_scorer() {
        let h = harness();
        let report = h.submit("ACME-CORP", 1000, 500, 200);
        let request = h.workflow.request_analysis(report.id).unwrap();

        let CallbackOutcome::Report(outcome) = h.callback(request.request_id).unwrap() else {
            panic!("expected report outcome");
        };
        assert_eq!(outcome.risk, RiskClassification::Analyzed);
        assert_eq!(outcome.method.as_deref(), Some("expense-tax-ratio/v1"));

        let analysis = h.workflow.analysis(outcome.analysis_id.unwrap()).unwrap();
        assert_eq!(h.fhe.decrypt(&analysis.encrypted_risk_score).unwrap(), 35);
    }

    #[test]
    fn unscorable_figures_reveal_unclassified() {
        let h = harness();
        let report = h.submit("ACME-CORP", 1000, 500, 200);
        let request = h.workflow.request_analysis(report.id).unwrap();

        let figures = vec!["1000.50".to_string(), "500".to_string(), "200".to_string()];
        let proof = h.fhe.sign(request.request_id, &figures).unwrap();
        let CallbackOutcome::Report(outcome) =
            h.workflow.handle_callback(request.request_id, &figures, &proof).unwrap()
        else {
            panic!("expected report outcome");
        };
        assert_eq!(outcome.risk, RiskClassification::Unset);
        assert!(outcome.analysis_id.is_none());
        assert!(outcome.method.is_none());

        let view = h.workflow.report_view(report.id).unwrap();
        assert_eq!(view.report.status, ReportStatus::Revealed);
        assert_eq!(view.decrypted.unwrap().revenue, "1000.50");
        assert_eq!(
            h.workflow.request(request.request_id).unwrap().state,
            RequestState::Resolved
        );
        assert!(h.workflow.analyses_for_report(report.id).unwrap().is_empty());
        assert!(h.workflow.list_buckets().unwrap().is_empty());

        // A later analysis classifies the report
        let outcome = h.workflow.record_analysis(report.id, RiskScore::new(90, "manual")).unwrap();
        assert_eq!(outcome.risk, RiskClassification::Flagged);
        assert_eq!(h.workflow.report(report.id).unwrap().risk, RiskClassification::Flagged);
        assert_eq!(h.audit_types()[0], AuditEventType::ReportFlagged);

        let again = h.workflow.record_analysis(report.id, RiskScore::new(10, "manual")).unwrap();
        assert_eq!(again.risk, RiskClassification::Flagged);
    }

    #[test]
    fn stale_callback_is_rejected_without_side_effects() {
        let h = harness();
        let report = h.submit("ACME-CORP", 1000, 500, 200);
        let request = h.workflow.request_analysis(report.id).unwrap();
        h.callback(request.request_id).unwrap();

        let again = h.callback(request.request_id);
        assert!(matches!(again, Err(AnalysisError::AlreadyResolved(_))));
        assert_eq!(h.workflow.analyses_for_report(report.id).unwrap().len(), 1);
        assert_eq!(h.workflow.bucket("AC").unwrap().observations, 1);
    }

    #[test]
    fn invalid_proof_leaves_state_unchanged_and_is_audited() {
        let h = harness();
        let report = h.submit("ACME-CORP", 1000, 500, 200);
        let request = h.workflow.request_analysis(report.id).unwrap();
        let forged = vec!["1".to_string(), "1".to_string(), "1".to_string()];

        let result = h.workflow.complete_analysis(
            request.request_id,
            &forged,
            b"forged",
            RiskScore::new(10, "fixed"),
        );
        assert!(matches!(result, Err(AnalysisError::InvalidProof(_))));

        let view = h.workflow.report_view(report.id).unwrap();
        assert_eq!(view.report.status, ReportStatus::DecryptionRequested);
        assert_eq!(view.report.risk, RiskClassification::Unset);
        assert!(view.decrypted.is_none());
        assert!(h.workflow.list_buckets().unwrap().is_empty());
        assert_eq!(h.audit_types()[0], AuditEventType::InvalidProof);
        let trail = h
            .workflow
            .audit_for_resource("request", &request.request_id.to_string(), 10)
            .unwrap();
        assert_eq!(trail.len(), 1);
        assert!(!trail[0].success);

        // The genuine callback still goes through
        assert!(h.callback(request.request_id).is_ok());
    }

    #[test]
    fn lifecycle_order_is_enforced() {
        let h = harness();
        let report = h.submit("ACME-CORP", 1000, 500, 200);

        assert!(matches!(
            h.workflow.record_analysis(report.id, RiskScore::new(1, "m")),
            Err(AnalysisError::NotRevealed(_))
        ));
        assert!(matches!(h.workflow.flag_report(report.id), Err(AnalysisError::NotRevealed(_))));
        assert!(matches!(
            h.workflow.request_analysis(99),
            Err(AnalysisError::ReportNotFound(99))
        ));

        h.workflow.request_analysis(report.id).unwrap();
        assert!(matches!(
            h.workflow.request_analysis(report.id),
            Err(AnalysisError::InvalidState {
                expected: ReportStatus::Pending,
                actual: ReportStatus::DecryptionRequested,
                ..
            })
        ));
    }

    #[test]
    fn expiry_returns_report_to_pending() {
        let h = harness();
        let report = h.submit("ACME-CORP", 1000, 500, 200);
        let request = h.workflow.request_analysis(report.id).unwrap();

        assert!(h.workflow.expire_stale(Utc::now()).unwrap().is_empty());
        let later = Utc::now() + h.workflow.policy().request_ttl + Duration::seconds(1);
        let expired = h.workflow.expire_stale(later).unwrap();
        assert_eq!(expired.len(), 1);

        assert_eq!(h.workflow.report(report.id).unwrap().status, ReportStatus::Pending);
        assert_eq!(
            h.workflow.request(request.request_id).unwrap().state,
            RequestState::Expired
        );
        assert!(matches!(
            h.callback(request.request_id),
            Err(AnalysisError::RequestExpired(_))
        ));

        let retry = h.workflow.request_analysis(report.id).unwrap();
        assert!(h.callback(retry.request_id).is_ok());
    }

    #[test]
    fn reanalysis_keeps_classification() {
        let h = harness();
        let report = h.submit("ACME-CORP", 1000, 500, 200);
        h.complete_with_score(report.id, 40);

        let outcome = h.workflow.record_analysis(report.id, RiskScore::new(95, "manual")).unwrap();
        assert_eq!(outcome.risk, RiskClassification::Analyzed);
        assert_eq!(h.workflow.analyses_for_report(report.id).unwrap().len(), 2);
        assert_eq!(h.workflow.bucket("AC").unwrap().observations, 2);

        let flagged = h.workflow.flag_report(report.id).unwrap();
        assert_eq!(flagged.risk, RiskClassification::Flagged);
        assert_eq!(h.workflow.report(report.id).unwrap().risk, RiskClassification::Flagged);
    }

    #[test]
    fn industry_aggregate_reveals_once() {
        let h = harness();
        let a = h.submit("ACME-CORP", 1, 1, 1);
        let b = h.submit("ACME-LABS", 1, 1, 1);
        h.complete_with_score(a.id, 85);
        h.complete_with_score(b.id, 40);

        let request = h.workflow.request_bucket_decryption("AC").unwrap();
        assert!(matches!(request.subject, Subject::Industry(_)));

        let CallbackOutcome::Industry(bucket) = h.callback(request.request_id).unwrap() else {
            panic!("expected industry outcome");
        };
        assert!(bucket.is_revealed);
        assert_eq!(bucket.revealed_score.as_deref(), Some("125"));

        assert!(matches!(
            h.workflow.request_bucket_decryption("AC"),
            Err(AnalysisError::AlreadyRevealed(Subject::Industry(_)))
        ));
        assert!(matches!(
            h.workflow.request_bucket_decryption("ZZ"),
            Err(AnalysisError::UnknownIndustry(_))
        ));
    }

    #[test]
    fn industry_request_cannot_complete_a_report() {
        let h = harness();
        let report = h.submit("ACME-CORP", 1, 1, 1);
        h.complete_with_score(report.id, 10);

        let request = h.workflow.request_bucket_decryption("AC").unwrap();
        let cb = h.fhe.fulfil(request.request_id).unwrap();
        let result = h.workflow.complete_analysis(
            request.request_id,
            &cb.cleartexts,
            &cb.proof,
            RiskScore::new(1, "m"),
        );
        assert!(matches!(result, Err(AnalysisError::SubjectMismatch { expected: "report", .. })));
    }

    #[test]
    fn missing_records_surface_as_not_found() {
        let h = harness();
        assert!(matches!(h.workflow.report_view(1), Err(AnalysisError::ReportNotFound(1))));
        assert!(matches!(h.workflow.analysis(1), Err(AnalysisError::AnalysisNotFound(1))));
        assert!(matches!(h.workflow.request(5), Err(AnalysisError::UnknownRequest(5))));
        assert!(matches!(h.workflow.bucket("AC"), Err(AnalysisError::UnknownIndustry(_))));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Decryption Request Expiry Sweeper
//!
//! Background task that periodically expires decryption requests whose
//! callback never arrived. Each sweep releases the subject's request slot and
//! returns waiting reports to `Pending`, so analysis can be requested again.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::protocol::AnalysisWorkflow;

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub struct ExpirySweeper {
    workflow: Arc<AnalysisWorkflow>,
    sweep_interval: Duration,
}

impl ExpirySweeper {
    pub fn new(workflow: Arc<AnalysisWorkflow>) -> Self {
        Self {
            workflow,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Expiry sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Expiry sweeper shutting down");
                return;
            }

            self.sweep();

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Expiry sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Expire every overdue request once. Returns how many expired.
    pub fn sweep(&self) -> usize {
        match self.workflow.expire_stale(Utc::now()) {
            Ok(expired) => {
                if !expired.is_empty() {
                    info!(count = expired.len(), "Expiry sweeper: expired stale requests");
                }
                expired.len()
            }
            Err(e) => {
                warn!(error = %e, "Expiry sweeper: sweep failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::{EncryptionEngine, LocalFhe};
    use crate::protocol::{EncryptedFields, ExpenseTaxRatioScorer, WorkflowPolicy};
    use crate::storage::{InMemoryStore, ReportStatus};

    fn workflow(ttl: chrono::Duration) -> (Arc<AnalysisWorkflow>, Arc<LocalFhe>) {
        let fhe = Arc::new(LocalFhe::new(b"sweeper".to_vec()));
        let workflow = AnalysisWorkflow::new(
            Arc::new(InMemoryStore::new()),
            fhe.clone(),
            fhe.clone(),
            Arc::new(ExpenseTaxRatioScorer),
            WorkflowPolicy {
                request_ttl: ttl,
                ..WorkflowPolicy::default()
            },
        );
        (Arc::new(workflow), fhe)
    }

    fn pending_report(workflow: &AnalysisWorkflow, fhe: &LocalFhe) -> u64 {
        let fields = EncryptedFields {
            revenue: fhe.encrypt(1).unwrap(),
            expenses: fhe.encrypt(1).unwrap(),
            tax_data: fhe.encrypt(1).unwrap(),
        };
        let report = workflow.submit(fields, "ACME").unwrap();
        workflow.request_analysis(report.id).unwrap();
        report.id
    }

    #[test]
    fn sweep_expires_overdue_requests() {
        let (workflow, fhe) = workflow(chrono::Duration::seconds(-1));
        let report_id = pending_report(&workflow, &fhe);

        let sweeper = ExpirySweeper::new(workflow.clone());
        assert_eq!(sweeper.sweep(), 1);
        assert_eq!(sweeper.sweep(), 0);
        assert_eq!(workflow.report(report_id).unwrap().status, ReportStatus::Pending);
    }

    #[test]
    fn sweep_leaves_fresh_requests_alone() {
        let (workflow, fhe) = workflow(chrono::Duration::hours(1));
        let report_id = pending_report(&workflow, &fhe);

        assert_eq!(ExpirySweeper::new(workflow.clone()).sweep(), 0);
        assert_eq!(
            workflow.report(report_id).unwrap().status,
            ReportStatus::DecryptionRequested
        );
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let (workflow, _) = workflow(chrono::Duration::hours(1));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            ExpirySweeper::new(workflow)
                .with_interval(Duration::from_millis(10))
                .run(shutdown.clone()),
        );

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper stops")
            .unwrap();
    }
}

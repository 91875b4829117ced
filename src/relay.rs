// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Oracle Relay
//!
//! Stands in for the network hop between the decryption oracle and the
//! callback endpoint when running with [`LocalFhe`]. Request ids accepted by
//! the oracle arrive on a channel; after the configured latency the relay
//! asks the oracle for the signed answer and feeds it to
//! [`AnalysisWorkflow::handle_callback`].
//!
//! The oracle learns a request id before the transaction that records it has
//! committed, so a callback may briefly find the id unknown. Such callbacks
//! are retried a few times before being dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::fhe::LocalFhe;
use crate::protocol::{AnalysisError, AnalysisWorkflow, CallbackOutcome};

const MAX_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct OracleRelay {
    fhe: Arc<LocalFhe>,
    workflow: Arc<AnalysisWorkflow>,
    latency: Duration,
}

impl OracleRelay {
    pub fn new(fhe: Arc<LocalFhe>, workflow: Arc<AnalysisWorkflow>, latency: Duration) -> Self {
        Self {
            fhe,
            workflow,
            latency,
        }
    }

    /// Deliver callbacks until the channel closes or shutdown is requested.
    pub async fn run(self, mut requests: UnboundedReceiver<u64>, shutdown: CancellationToken) {
        info!(latency_ms = self.latency.as_millis() as u64, "Oracle relay starting");
        let relay = Arc::new(self);

        loop {
            tokio::select! {
                received = requests.recv() => match received {
                    Some(request_id) => {
                        let relay = relay.clone();
                        tokio::spawn(async move { relay.deliver(request_id).await });
                    }
                    None => {
                        info!("Oracle relay channel closed");
                        return;
                    }
                },
                _ = shutdown.cancelled() => {
                    info!("Oracle relay shutting down");
                    return;
                }
            }
        }
    }

    async fn deliver(&self, request_id: u64) {
        tokio::time::sleep(self.latency).await;

        let callback = match self.fhe.fulfil(request_id) {
            Ok(callback) => callback,
            Err(e) => {
                warn!(request_id, error = %e, "Oracle relay: cannot fulfil request");
                return;
            }
        };

        for attempt in 1..=MAX_ATTEMPTS {
            match self
                .workflow
                .handle_callback(request_id, &callback.cleartexts, &callback.proof)
            {
                Ok(CallbackOutcome::Report(outcome)) => {
                    info!(
                        request_id,
                        report_id = outcome.report_id,
                        risk = ?outcome.risk,
                        "Oracle relay: report callback delivered"
                    );
                    return;
                }
                Ok(CallbackOutcome::Industry(bucket)) => {
                    info!(
                        request_id,
                        industry = %bucket.industry_code,
                        "Oracle relay: industry callback delivered"
                    );
                    return;
                }
                Err(AnalysisError::UnknownRequest(_)) if attempt < MAX_ATTEMPTS => {
                    debug!(request_id, attempt, "Oracle relay: request not committed yet, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    warn!(request_id, error = %e, "Oracle relay: callback rejected");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhe::EncryptionEngine;
    use crate::protocol::{EncryptedFields, ExpenseTaxRatioScorer, WorkflowPolicy};
    use crate::storage::{InMemoryStore, ReportStatus};

    #[tokio::test]
    async fn relay_delivers_report_callback() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let fhe = Arc::new(LocalFhe::new(b"relay".to_vec()).with_relay(tx));
        let workflow = Arc::new(AnalysisWorkflow::new(
            Arc::new(InMemoryStore::new()),
            fhe.clone(),
            fhe.clone(),
            Arc::new(ExpenseTaxRatioScorer),
            WorkflowPolicy::default(),
        ));

        let shutdown = CancellationToken::new();
        let relay = OracleRelay::new(fhe.clone(), workflow.clone(), Duration::ZERO);
        let task = tokio::spawn(relay.run(rx, shutdown.clone()));

        let fields = EncryptedFields {
            revenue: fhe.encrypt(1000).unwrap(),
            expenses: fhe.encrypt(500).unwrap(),
            tax_data: fhe.encrypt(200).unwrap(),
        };
        let report = workflow.submit(fields, "ACME-CORP").unwrap();
        workflow.request_analysis(report.id).unwrap();

        let mut revealed = false;
        for _ in 0..100 {
            if workflow.report(report.id).unwrap().status == ReportStatus::Revealed {
                revealed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(revealed, "relay should reveal the report");

        shutdown.cancel();
        task.await.unwrap();
    }
}

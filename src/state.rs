// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::fhe::{EncryptionEngine, LocalFhe};
use crate::protocol::{AnalysisWorkflow, ExpenseTaxRatioScorer, WorkflowPolicy};
use crate::storage::{InMemoryStore, KeyedStore};

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<AnalysisWorkflow>,
    pub engine: Arc<dyn EncryptionEngine>,
    /// Set when records live on disk; checked by readiness probes.
    pub data_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(workflow: Arc<AnalysisWorkflow>, engine: Arc<dyn EncryptionEngine>) -> Self {
        Self {
            workflow,
            engine,
            data_dir: None,
        }
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = Some(data_dir);
        self
    }

    /// Wire the workflow against the in-process engine and oracle.
    pub fn local(store: Arc<dyn KeyedStore>, fhe: Arc<LocalFhe>, policy: WorkflowPolicy) -> Self {
        let workflow = AnalysisWorkflow::new(
            store,
            fhe.clone(),
            fhe.clone(),
            Arc::new(ExpenseTaxRatioScorer),
            policy,
        );
        Self::new(Arc::new(workflow), fhe)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::local(
            Arc::new(InMemoryStore::new()),
            Arc::new(LocalFhe::with_random_key()),
            WorkflowPolicy::default(),
        )
    }
}

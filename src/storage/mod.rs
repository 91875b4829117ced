// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Confidential Record Store
//!
//! Generic key → payload persistence with per-kind namespace indexes.
//!
//! ## Layers
//!
//! - [`KeyedStore`] - opaque string keys, byte payloads, scoped write
//!   transactions. Backed by redb in production and a `HashMap` in tests.
//! - [`RecordRepository`] - typed JSON records, id counters and the ordered
//!   index of every key in a namespace.
//! - [`AuditRepository`] - append-only audit trail on top of the repository.
//!
//! Payloads are ciphertext handles and public metadata only; plaintext
//! financial figures exist in the store solely after the oracle has revealed
//! them.

pub mod audit;
pub mod keyed_store;
pub mod keys;
pub mod memory;
pub mod redb_store;
pub mod repository;

pub use audit::{AuditEntry, AuditEvent, AuditEventType, AuditRepository};
pub use keyed_store::{KeyedStore, ReadView, StoreError, StoreResult, WriteTxn};
pub use memory::InMemoryStore;
pub use redb_store::RedbStore;
pub use repository::{
    AnalysisResult, DecryptedReport, DecryptionRequest, FinancialReport, IndustryRiskBucket,
    Record, RecordRepository, RepoError, RepoResult, ReportStatus, RequestState,
    RiskClassification, Subject,
};

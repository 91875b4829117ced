// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for lifecycle and security events.
//!
//! Events are ordinary records (`audit_{id}`) appended through the repository
//! layer, so an event can commit in the same transaction as the state change
//! it describes.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::keyed_store::{KeyedStore, WriteTxn};
use super::repository::{Record, RecordRepository, RepoResult};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Report events
    ReportSubmitted,
    ReportFlagged,

    // Correlation events
    DecryptionRequested,
    DecryptionResolved,
    DecryptionExpired,
    InvalidProof,

    // Analysis events
    AnalysisRecorded,

    // Industry events
    IndustryBucketCreated,
    IndustryRevealed,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Sequential event id.
    pub id: u64,
    /// When the event occurred, unix seconds.
    pub timestamp: i64,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Resource type (report, request, industry).
    pub resource_type: Option<String>,
    /// Resource affected.
    pub resource_id: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl Record for AuditEvent {
    const KIND: &'static str = "audit";
}

/// Event under construction; the id is assigned when it is logged.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    event_type: AuditEventType,
    resource_type: Option<String>,
    resource_id: Option<String>,
    details: Option<serde_json::Value>,
    error: Option<String>,
}

impl AuditEntry {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_type,
            resource_type: None,
            resource_id: None,
            details: None,
            error: None,
        }
    }

    /// Set the resource.
    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl ToString,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    fn into_event(self, id: u64) -> AuditEvent {
        AuditEvent {
            id,
            timestamp: Utc::now().timestamp(),
            event_type: self.event_type,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            details: self.details,
            success: self.error.is_none(),
            error: self.error,
        }
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    records: RecordRepository<'a, AuditEvent>,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(store: &'a dyn KeyedStore) -> Self {
        Self {
            records: RecordRepository::new(store),
        }
    }

    /// Log an event in its own transaction.
    pub fn log(&self, entry: AuditEntry) -> RepoResult<AuditEvent> {
        self.records
            .append(|id| entry.into_event(id))
            .map(|(_, event)| event)
    }

    /// Log an event as part of a larger transaction.
    pub fn log_in<W: WriteTxn + ?Sized>(txn: &mut W, entry: AuditEntry) -> RepoResult<AuditEvent> {
        RecordRepository::<AuditEvent>::append_in(txn, |id| entry.into_event(id))
            .map(|(_, event)| event)
    }

    /// The most recent `limit` events, newest first.
    pub fn recent(&self, limit: usize) -> RepoResult<Vec<AuditEvent>> {
        let keys = self.records.list_keys()?;
        let mut events = Vec::with_capacity(limit.min(keys.len()));
        for key in keys.iter().rev().take(limit) {
            match self.records.get(key) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "Skipping undecodable audit event"),
            }
        }
        Ok(events)
    }

    /// Search events by resource.
    pub fn search_by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> RepoResult<Vec<AuditEvent>> {
        Ok(self
            .records
            .list_all()?
            .into_iter()
            .filter(|e| {
                e.resource_type.as_deref() == Some(resource_type)
                    && e.resource_id.as_deref() == Some(resource_id)
            })
            .collect())
    }
}

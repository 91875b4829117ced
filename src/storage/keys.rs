// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key layout for the record store.
//!
//! ```text
//! report_{id}                  FinancialReport
//! decrypted_{id}               DecryptedReport (1:1 with report_{id})
//! analysis_{id}                AnalysisResult
//! request_{request_id}         DecryptionRequest
//! industry_{code}              IndustryRiskBucket
//! industry_subject_{subject}   industry code owning a numeric subject id
//! audit_{id}                   AuditEvent
//!
//! __index_{kind}               ordered keys of every record of {kind}
//! __counter_{kind}             last id allocated for {kind}
//! __pending_{kind}_{subject}   live request id for a subject
//! __live_requests              ids of every unresolved request
//! ```
//!
//! Reserved keys start with `__`, which no entity key does.

use std::fmt::Display;

/// Prefix shared by every reserved (non-entity) key.
pub const RESERVED_PREFIX: &str = "__";

/// Key listing every unresolved decryption request.
pub const LIVE_REQUESTS: &str = "__live_requests";

/// Key of one entity record: `{kind}_{id}`.
pub fn record_key(kind: &str, id: impl Display) -> String {
    format!("{kind}_{id}")
}

/// Key of a namespace index.
pub fn index_key(kind: &str) -> String {
    format!("{RESERVED_PREFIX}index_{kind}")
}

/// Key of a namespace id counter.
pub fn counter_key(kind: &str) -> String {
    format!("{RESERVED_PREFIX}counter_{kind}")
}

/// Key holding the live request id for one subject.
pub fn pending_slot_key(subject_kind: &str, subject_id: u64) -> String {
    format!("{RESERVED_PREFIX}pending_{subject_kind}_{subject_id}")
}

/// Key of the reverse industry mapping `subject id → code`.
pub fn industry_subject_key(subject_id: u64) -> String {
    format!("industry_subject_{subject_id}")
}

/// Whether a key belongs to the reserved namespace.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_keys_are_kind_underscore_id() {
        assert_eq!(record_key("report", 7), "report_7");
        assert_eq!(record_key("industry", "AC"), "industry_AC");
    }

    #[test]
    fn reserved_keys_never_collide_with_entities() {
        assert_eq!(index_key("report"), "__index_report");
        assert_eq!(counter_key("analysis"), "__counter_analysis");
        assert_eq!(pending_slot_key("report", 3), "__pending_report_3");
        assert!(is_reserved(&index_key("report")));
        assert!(is_reserved(LIVE_REQUESTS));
        assert!(!is_reserved(&record_key("report", 1)));
    }

    #[test]
    fn industry_reverse_key() {
        assert_eq!(industry_subject_key(42), "industry_subject_42");
    }
}

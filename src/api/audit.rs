// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{error::ApiError, state::AppState, storage::AuditEvent};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Number of events to return, newest first (default 50, max 500)
    pub limit: Option<usize>,
    /// Restrict to one resource kind (`report`, `industry`, `request`); requires `resource_id`
    pub resource_type: Option<String>,
    /// Restrict to one resource identifier; requires `resource_type`
    pub resource_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/audit",
    params(AuditQuery),
    tag = "Audit",
    responses(
        (status = 200, body = [AuditEvent]),
        (status = 400, description = "Only one of resource_type and resource_id given")
    )
)]
pub async fn list_audit_events(
    State(state): State<AppState>,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEvent>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let events = match (params.resource_type.as_deref(), params.resource_id.as_deref()) {
        (Some(kind), Some(id)) => state.workflow.audit_for_resource(kind, id, limit)?,
        (None, None) => state.workflow.recent_audit(limit)?,
        _ => {
            return Err(ApiError::bad_request(
                "resource_type and resource_id must be given together",
            ))
        }
    };
    Ok(Json(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    use crate::fhe::EncryptionEngine;
    use crate::protocol::EncryptedFields;

    fn submit(state: &AppState, company: &str) {
        let fields = EncryptedFields {
            revenue: state.engine.encrypt(1).unwrap(),
            expenses: state.engine.encrypt(1).unwrap(),
            tax_data: state.engine.encrypt(1).unwrap(),
        };
        state.workflow.submit(fields, company).unwrap();
    }

    #[tokio::test]
    async fn filters_by_resource() {
        let state = AppState::default();
        submit(&state, "ACME-CORP");
        submit(&state, "BETA-LTD");
        state.workflow.request_analysis(2).unwrap();

        let Json(all) = list_audit_events(State(state.clone()), Query(AuditQuery::default()))
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let query = AuditQuery {
            resource_type: Some("report".to_string()),
            resource_id: Some("2".to_string()),
            ..AuditQuery::default()
        };
        let Json(events) = list_audit_events(State(state), Query(query)).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.resource_id.as_deref() == Some("2")));
    }

    #[tokio::test]
    async fn half_a_resource_filter_is_rejected() {
        let query = AuditQuery {
            resource_type: Some("report".to_string()),
            ..AuditQuery::default()
        };
        let err = list_audit_events(State(AppState::default()), Query(query))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::ApiError,
    models::{RecordAnalysisRequest, ReportKeysResponse, SubmitReportRequest},
    protocol::{AnalysisOutcome, EncryptedFields, ReportView, RiskScore},
    state::AppState,
    storage::{AnalysisResult, DecryptionRequest, FinancialReport},
};

/// Method name recorded for scores supplied through the API without one.
const MANUAL_METHOD: &str = "manual";

#[utoipa::path(
    get,
    path = "/v1/reports",
    tag = "Reports",
    responses((status = 200, body = [FinancialReport]))
)]
pub async fn list_reports(
    State(state): State<AppState>,
) -> Result<Json<Vec<FinancialReport>>, ApiError> {
    Ok(Json(state.workflow.list_reports()?))
}

#[utoipa::path(
    post,
    path = "/v1/reports",
    request_body = SubmitReportRequest,
    tag = "Reports",
    responses(
        (status = 201, body = FinancialReport),
        (status = 400, description = "Missing company identifier")
    )
)]
pub async fn submit_report(
    State(state): State<AppState>,
    Json(request): Json<SubmitReportRequest>,
) -> Result<(StatusCode, Json<FinancialReport>), ApiError> {
    let company = request.company_identifier.trim();
    if company.is_empty() {
        return Err(ApiError::bad_request("company_identifier must not be empty"));
    }

    let fields = EncryptedFields {
        revenue: request.encrypted_revenue,
        expenses: request.encrypted_expenses,
        tax_data: request.encrypted_tax_data,
    };
    let report = state.workflow.submit(fields, company)?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/v1/reports/keys",
    tag = "Reports",
    responses((status = 200, body = ReportKeysResponse))
)]
pub async fn report_keys(State(state): State<AppState>) -> Result<Json<ReportKeysResponse>, ApiError> {
    Ok(Json(ReportKeysResponse {
        keys: state.workflow.report_keys()?,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/reports/{report_id}",
    params(("report_id" = u64, Path, description = "Report identifier")),
    tag = "Reports",
    responses(
        (status = 200, body = ReportView),
        (status = 404, description = "Report not found")
    )
)]
pub async fn get_report(
    Path(report_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<ReportView>, ApiError> {
    Ok(Json(state.workflow.report_view(report_id)?))
}

/// Request decryption of a pending report. The analysis completes when the
/// oracle calls back.
#[utoipa::path(
    post,
    path = "/v1/reports/{report_id}/analysis",
    params(("report_id" = u64, Path, description = "Report identifier")),
    tag = "Reports",
    responses(
        (status = 202, body = DecryptionRequest),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Report is not pending")
    )
)]
pub async fn request_analysis(
    Path(report_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<DecryptionRequest>), ApiError> {
    let request = state.workflow.request_analysis(report_id)?;
    Ok((StatusCode::ACCEPTED, Json(request)))
}

#[utoipa::path(
    post,
    path = "/v1/reports/{report_id}/flag",
    params(("report_id" = u64, Path, description = "Report identifier")),
    tag = "Reports",
    responses(
        (status = 200, body = FinancialReport),
        (status = 409, description = "Report not revealed yet")
    )
)]
pub async fn flag_report(
    Path(report_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<FinancialReport>, ApiError> {
    Ok(Json(state.workflow.flag_report(report_id)?))
}

#[utoipa::path(
    get,
    path = "/v1/reports/{report_id}/analyses",
    params(("report_id" = u64, Path, description = "Report identifier")),
    tag = "Reports",
    responses(
        (status = 200, body = [AnalysisResult]),
        (status = 404, description = "Report not found")
    )
)]
pub async fn list_report_analyses(
    Path(report_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AnalysisResult>>, ApiError> {
    Ok(Json(state.workflow.analyses_for_report(report_id)?))
}

/// Record another analysis of a revealed report.
#[utoipa::path(
    post,
    path = "/v1/reports/{report_id}/analyses",
    params(("report_id" = u64, Path, description = "Report identifier")),
    request_body = RecordAnalysisRequest,
    tag = "Reports",
    responses(
        (status = 201, body = AnalysisOutcome),
        (status = 400, description = "Score out of range"),
        (status = 409, description = "Report not revealed yet")
    )
)]
pub async fn record_analysis(
    Path(report_id): Path<u64>,
    State(state): State<AppState>,
    Json(request): Json<RecordAnalysisRequest>,
) -> Result<(StatusCode, Json<AnalysisOutcome>), ApiError> {
    if request.risk_score > crate::protocol::scoring::MAX_SCORE {
        return Err(ApiError::bad_request("risk_score must be between 0 and 100"));
    }
    let method = request.method.unwrap_or_else(|| MANUAL_METHOD.to_string());
    let outcome = state
        .workflow
        .record_analysis(report_id, RiskScore::new(request.risk_score, method))?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

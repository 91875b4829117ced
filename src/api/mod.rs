// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        EncryptRequest, EncryptResponse, OracleCallbackRequest, RecordAnalysisRequest,
        ReportKeysResponse, SubmitReportRequest,
    },
    protocol::{AnalysisOutcome, CallbackOutcome, ReportView},
    state::AppState,
    storage::{
        AnalysisResult, AuditEvent, AuditEventType, DecryptedReport, DecryptionRequest,
        FinancialReport, IndustryRiskBucket, ReportStatus, RequestState, RiskClassification,
        Subject,
    },
};

pub mod analyses;
pub mod audit;
pub mod ciphertexts;
pub mod health;
pub mod industries;
pub mod oracle;
pub mod reports;

pub fn router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state.clone());

    let v1_routes = Router::new()
        .route("/ciphertexts", post(ciphertexts::encrypt))
        .route(
            "/reports",
            get(reports::list_reports).post(reports::submit_report),
        )
        .route("/reports/keys", get(reports::report_keys))
        .route("/reports/{report_id}", get(reports::get_report))
        .route(
            "/reports/{report_id}/analysis",
            post(reports::request_analysis),
        )
        .route("/reports/{report_id}/flag", post(reports::flag_report))
        .route(
            "/reports/{report_id}/analyses",
            get(reports::list_report_analyses).post(reports::record_analysis),
        )
        .route("/analyses/{analysis_id}", get(analyses::get_analysis))
        .route("/industries", get(industries::list_industries))
        .route("/industries/{code}", get(industries::get_industry))
        .route(
            "/industries/{code}/decryption",
            post(industries::request_industry_decryption),
        )
        .route("/oracle/callback", post(oracle::callback))
        .route("/oracle/requests/{request_id}", get(oracle::get_request))
        .route("/audit", get(audit::list_audit_events))
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        ciphertexts::encrypt,
        reports::list_reports,
        reports::submit_report,
        reports::report_keys,
        reports::get_report,
        reports::request_analysis,
        reports::flag_report,
        reports::list_report_analyses,
        reports::record_analysis,
        analyses::get_analysis,
        industries::list_industries,
        industries::get_industry,
        industries::request_industry_decryption,
        oracle::callback,
        oracle::get_request,
        audit::list_audit_events
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            EncryptRequest,
            EncryptResponse,
            SubmitReportRequest,
            ReportKeysResponse,
            RecordAnalysisRequest,
            OracleCallbackRequest,
            FinancialReport,
            DecryptedReport,
            ReportStatus,
            RiskClassification,
            ReportView,
            AnalysisResult,
            AnalysisOutcome,
            CallbackOutcome,
            DecryptionRequest,
            RequestState,
            Subject,
            IndustryRiskBucket,
            AuditEvent,
            AuditEventType
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Ciphertexts", description = "Encryption through the engine capability"),
        (name = "Reports", description = "Encrypted financial reports and their analysis"),
        (name = "Analyses", description = "Immutable analysis results"),
        (name = "Industries", description = "Encrypted per-industry risk aggregates"),
        (name = "Oracle", description = "Decryption oracle callbacks and request lookup"),
        (name = "Audit", description = "Lifecycle and security audit trail")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::default());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn liveness_route_responds() {
        let response = router(AppState::default())
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn encrypt_then_submit_over_http() {
        let app = router(AppState::default());

        let response = app
            .clone()
            .oneshot(
                Request::post("/v1/ciphertexts")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"value":1000}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let encrypted: EncryptResponse = serde_json::from_slice(&bytes).unwrap();

        let submission = serde_json::json!({
            "encrypted_revenue": encrypted.handle,
            "encrypted_expenses": encrypted.handle,
            "encrypted_tax_data": encrypted.handle,
            "company_identifier": "ACME-CORP",
        });
        let response = app
            .clone()
            .oneshot(
                Request::post("/v1/reports")
                    .header("content-type", "application/json")
                    .body(Body::from(submission.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(Request::get("/v1/reports/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let view: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(view["report"]["status"], "pending");
        assert_eq!(view["report"]["industry_code"], "AC");
        assert!(view.get("decrypted").is_none());
    }

    #[tokio::test]
    async fn unknown_report_renders_json_error() {
        let response = router(AppState::default())
            .oneshot(Request::get("/v1/reports/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"error":"report 42 not found"}"#);
    }
}

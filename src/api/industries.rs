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
    state::AppState,
    storage::{DecryptionRequest, IndustryRiskBucket},
};

#[utoipa::path(
    get,
    path = "/v1/industries",
    tag = "Industries",
    responses((status = 200, body = [IndustryRiskBucket]))
)]
pub async fn list_industries(
    State(state): State<AppState>,
) -> Result<Json<Vec<IndustryRiskBucket>>, ApiError> {
    Ok(Json(state.workflow.list_buckets()?))
}

#[utoipa::path(
    get,
    path = "/v1/industries/{code}",
    params(("code" = String, Path, description = "Industry code")),
    tag = "Industries",
    responses(
        (status = 200, body = IndustryRiskBucket),
        (status = 404, description = "Industry not observed yet")
    )
)]
pub async fn get_industry(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<IndustryRiskBucket>, ApiError> {
    Ok(Json(state.workflow.bucket(&code)?))
}

/// Ask the oracle to reveal the industry's aggregate risk score.
#[utoipa::path(
    post,
    path = "/v1/industries/{code}/decryption",
    params(("code" = String, Path, description = "Industry code")),
    tag = "Industries",
    responses(
        (status = 202, body = DecryptionRequest),
        (status = 404, description = "Industry not observed yet"),
        (status = 409, description = "Already revealed or pending")
    )
)]
pub async fn request_industry_decryption(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<DecryptionRequest>), ApiError> {
    let request = state.workflow.request_bucket_decryption(&code)?;
    Ok((StatusCode::ACCEPTED, Json(request)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_industry_is_not_found() {
        let state = AppState::default();
        let err = get_industry(Path("ZZ".to_string()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = request_industry_decryption(Path("ZZ".to_string()), State(state.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let Json(buckets) = list_industries(State(state)).await.unwrap();
        assert!(buckets.is_empty());
    }
}

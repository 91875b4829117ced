// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::ApiError, state::AppState, storage::AnalysisResult};

#[utoipa::path(
    get,
    path = "/v1/analyses/{analysis_id}",
    params(("analysis_id" = u64, Path, description = "Analysis identifier")),
    tag = "Analyses",
    responses(
        (status = 200, body = AnalysisResult),
        (status = 404, description = "Analysis not found")
    )
)]
pub async fn get_analysis(
    Path(analysis_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<AnalysisResult>, ApiError> {
    Ok(Json(state.workflow.analysis(analysis_id)?))
}

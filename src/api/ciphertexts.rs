// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::ApiError,
    models::{EncryptRequest, EncryptResponse},
    state::AppState,
};

/// Encrypt a value through the configured engine. Clients use the returned
/// handle when submitting reports.
#[utoipa::path(
    post,
    path = "/v1/ciphertexts",
    request_body = EncryptRequest,
    tag = "Ciphertexts",
    responses((status = 201, body = EncryptResponse))
)]
pub async fn encrypt(
    State(state): State<AppState>,
    Json(request): Json<EncryptRequest>,
) -> Result<(StatusCode, Json<EncryptResponse>), ApiError> {
    let handle = state.engine.encrypt(request.value).map_err(|e| {
        tracing::error!(error = %e, "Encryption failed");
        ApiError::internal("encryption failed")
    })?;
    Ok((StatusCode::CREATED, Json(EncryptResponse { handle })))
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decryption oracle callback endpoint.
//!
//! The oracle answers asynchronously by posting the cleartexts and a proof
//! here. Unknown, repeated or expired request ids are rejected; an invalid
//! proof is rejected with 401 and recorded as a security event.

use alloy::hex;
use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::ApiError,
    models::OracleCallbackRequest,
    protocol::CallbackOutcome,
    state::AppState,
    storage::DecryptionRequest,
};

#[utoipa::path(
    post,
    path = "/v1/oracle/callback",
    request_body = OracleCallbackRequest,
    tag = "Oracle",
    responses(
        (status = 200, body = CallbackOutcome),
        (status = 400, description = "Proof is not valid hex"),
        (status = 401, description = "Proof rejected"),
        (status = 404, description = "Unknown request id"),
        (status = 409, description = "Request already resolved or expired"),
        (status = 422, description = "Cleartexts do not match the request")
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    Json(request): Json<OracleCallbackRequest>,
) -> Result<Json<CallbackOutcome>, ApiError> {
    let proof = hex::decode(&request.proof)
        .map_err(|e| ApiError::bad_request(format!("proof is not valid hex: {e}")))?;
    let outcome = state
        .workflow
        .handle_callback(request.request_id, &request.cleartexts, &proof)?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/v1/oracle/requests/{request_id}",
    params(("request_id" = u64, Path, description = "Oracle request identifier")),
    tag = "Oracle",
    responses(
        (status = 200, body = DecryptionRequest),
        (status = 404, description = "Unknown request id")
    )
)]
pub async fn get_request(
    Path(request_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<DecryptionRequest>, ApiError> {
    Ok(Json(state.workflow.request(request_id)?))
}

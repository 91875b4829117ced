// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::fhe::FheError;
use crate::protocol::AnalysisError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        use AnalysisError::*;
        match &e {
            ReportNotFound(_) | AnalysisNotFound(_) | UnknownRequest(_) | UnknownIndustry(_) => {
                Self::not_found(e.to_string())
            }
            InvalidState { .. }
            | NotRevealed(_)
            | AlreadyRevealed(_)
            | AlreadyPending { .. }
            | AlreadyResolved(_)
            | RequestExpired(_) => Self::conflict(e.to_string()),
            SubjectMismatch { .. } | ArityMismatch { .. } | MalformedCleartext { .. } => {
                Self::unprocessable(e.to_string())
            }
            InvalidProof(_) => Self::unauthorized(e.to_string()),
            Fhe(FheError::UnknownHandle(_)) => Self::unprocessable(e.to_string()),
            SubjectCollision { .. } | Repo(_) | Fhe(_) => {
                tracing::error!(error = %e, "Request failed on an internal error");
                Self::internal("internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

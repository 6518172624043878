// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Shared-secret authentication failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No service key supplied
    MissingKey,
    /// Service key does not match
    InvalidKey,
    /// The relay has no service key configured
    NotConfigured,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingKey => "missing_key",
            AuthError::InvalidKey => "invalid_key",
            AuthError::NotConfigured => "not_configured",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingKey | AuthError::InvalidKey => StatusCode::UNAUTHORIZED,
            AuthError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingKey => write!(f, "Service key is required"),
            AuthError::InvalidKey => write!(f, "Service key is invalid"),
            AuthError::NotConfigured => {
                write!(f, "Service key is not configured on this relay")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::ServiceKey,
    error::ApiError,
    models::{PushRequestBody, StatusResponse},
    push::PushTask,
    state::AppState,
};

/// APNs device tokens are hex strings.
fn validate_device_token(token: &str) -> Result<(), ApiError> {
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApiError::bad_request("device_token must be a non-empty hex string"));
    }
    Ok(())
}

/// Queue a push notification for asynchronous delivery.
///
/// Acceptance means the task is queued, not delivered.
#[utoipa::path(
    post,
    path = "/push",
    request_body = PushRequestBody,
    tag = "Push",
    params(("x-api-key" = String, Header, description = "Shared service key")),
    responses(
        (status = 202, body = StatusResponse),
        (status = 400, description = "Malformed device token"),
        (status = 401, description = "Missing or invalid service key"),
        (status = 503, description = "Push disabled, queue full or dispatcher stopped")
    )
)]
pub async fn enqueue_push(
    _key: ServiceKey,
    State(state): State<AppState>,
    Json(body): Json<PushRequestBody>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    let dispatcher = state
        .push
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Push notifications are not configured"))?;

    validate_device_token(&body.device_token)?;
    dispatcher.enqueue(PushTask::from(body))?;

    Ok((StatusCode::ACCEPTED, Json(StatusResponse::queued())))
}

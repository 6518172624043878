// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Exchange endpoints: put/get of the request and response halves, delete
//! and topic lookup. No authentication; knowing the exchange id is enough.
//!
//! Exchange ids share the first path segment with the fixed routes, and the
//! fixed routes win: ids `sse`, `push`, `health`, `docs` and `api-doc` are
//! not reachable through `/{request_id}/...`.

use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::ApiError,
    exchange::RequestPayload,
    models::{ExchangeIds, PutRequestBody, PutResponseBody, ResponseData, StatusResponse, TopicQuery},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/{request_id}/request",
    params(("request_id" = String, Path, description = "Exchange identifier")),
    request_body = PutRequestBody,
    tag = "Exchange",
    responses((status = 200, body = StatusResponse))
)]
pub async fn put_request(
    Path(request_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<PutRequestBody>,
) -> Json<StatusResponse> {
    let request = RequestPayload {
        data: body.data,
        request_type: body.request_type,
        encrypted: body.encrypted,
    };
    state.exchanges.put_request(
        &request_id,
        request,
        body.topic_id.as_deref(),
        body.ttl.map(Duration::from_secs),
    );
    Json(StatusResponse::ok())
}

#[utoipa::path(
    get,
    path = "/{request_id}/request",
    params(("request_id" = String, Path, description = "Exchange identifier")),
    tag = "Exchange",
    responses(
        (status = 200, body = RequestPayload),
        (status = 404, description = "No request stored under this id")
    )
)]
pub async fn get_request(
    Path(request_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RequestPayload>, ApiError> {
    state
        .exchanges
        .get_request(&request_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Request not found"))
}

#[utoipa::path(
    post,
    path = "/{request_id}/response",
    params(("request_id" = String, Path, description = "Exchange identifier")),
    request_body = PutResponseBody,
    tag = "Exchange",
    responses((status = 200, body = StatusResponse))
)]
pub async fn put_response(
    Path(request_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<PutResponseBody>,
) -> Json<StatusResponse> {
    state.exchanges.put_response(&request_id, body.data);
    Json(StatusResponse::ok())
}

#[utoipa::path(
    get,
    path = "/{request_id}/response",
    params(("request_id" = String, Path, description = "Exchange identifier")),
    tag = "Exchange",
    responses((status = 200, body = ResponseData))
)]
pub async fn get_response(
    Path(request_id): Path<String>,
    State(state): State<AppState>,
) -> Json<ResponseData> {
    Json(ResponseData {
        data: state.exchanges.get_response(&request_id),
    })
}

#[utoipa::path(
    delete,
    path = "/{request_id}",
    params(("request_id" = String, Path, description = "Exchange identifier")),
    tag = "Exchange",
    responses((status = 200, body = StatusResponse))
)]
pub async fn delete_exchange(
    Path(request_id): Path<String>,
    State(state): State<AppState>,
) -> Json<StatusResponse> {
    state.exchanges.delete(&request_id);
    Json(StatusResponse::ok())
}

#[utoipa::path(
    get,
    path = "/",
    params(TopicQuery),
    tag = "Exchange",
    responses((status = 200, body = ExchangeIds))
)]
pub async fn resolve_topics(
    State(state): State<AppState>,
    Query(query): Query<TopicQuery>,
) -> Json<ExchangeIds> {
    Json(ExchangeIds {
        ids: state.exchanges.resolve_by_topics(&query.topics()),
    })
}

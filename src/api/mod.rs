// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::Request,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    exchange::RequestPayload,
    models::{
        ExchangeIds, PublishNotificationBody, PushRequestBody, PutRequestBody, PutResponseBody,
        ResponseData, StatusResponse,
    },
    notifications::Notification,
    state::AppState,
};

pub mod exchange;
pub mod health;
pub mod live;
pub mod notifications;
pub mod push;

pub fn router(state: AppState) -> Router {
    let relay_routes = Router::new()
        .route("/", get(exchange::resolve_topics))
        .route(
            "/{request_id}/request",
            get(exchange::get_request).post(exchange::put_request),
        )
        .route(
            "/{request_id}/response",
            get(exchange::get_response).post(exchange::put_response),
        )
        .route("/{request_id}", delete(exchange::delete_exchange))
        .route("/{request_id}/ws", get(live::live_socket))
        .route("/sse", post(notifications::publish_notification))
        .route("/sse/{user_id}", get(notifications::subscribe_notifications))
        .route("/push", post(push::enqueue_push))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(relay_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        exchange::put_request,
        exchange::get_request,
        exchange::put_response,
        exchange::get_response,
        exchange::delete_exchange,
        exchange::resolve_topics,
        live::live_socket,
        notifications::subscribe_notifications,
        notifications::publish_notification,
        push::enqueue_push,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            StatusResponse,
            PutRequestBody,
            PutResponseBody,
            ResponseData,
            ExchangeIds,
            RequestPayload,
            Notification,
            PublishNotificationBody,
            PushRequestBody,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthCounts,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Exchange", description = "Request/response handoff between wallet clients"),
        (name = "Notifications", description = "Server-sent notification streams"),
        (name = "Push", description = "APNs push notification queue"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

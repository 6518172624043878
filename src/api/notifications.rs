// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::{
    auth::{verify_service_key, AuthError},
    models::{PublishNotificationBody, StatusResponse},
    notifications::{notification_stream, Notification},
    state::AppState,
};

const NOTIFICATION_EVENT: &str = "notification";

fn to_event(notification: Notification) -> Event {
    Event::default()
        .event(NOTIFICATION_EVENT)
        .json_data(&notification)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode notification");
            Event::default().comment("encoding error")
        })
}

/// Server-sent event stream of notifications for `user_id`.
///
/// Subscribes on connect. A newer stream for the same user takes over the
/// mailbox and ends this one; the backlog is dropped when the current stream
/// disconnects.
#[utoipa::path(
    get,
    path = "/sse/{user_id}",
    params(("user_id" = String, Path, description = "Recipient account id")),
    tag = "Notifications",
    responses((status = 200, description = "text/event-stream of `notification` events", body = Notification))
)]
pub async fn subscribe_notifications(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = notification_stream(
        state.mailbox.clone(),
        user_id,
        state.sse_poll_interval,
        state.shutdown.clone(),
    )
    .map(|notification| Ok(to_event(notification)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Publish a notification to one user or, without `near_account_id`, to
/// every subscribed user.
#[utoipa::path(
    post,
    path = "/sse",
    request_body = PublishNotificationBody,
    tag = "Notifications",
    responses(
        (status = 200, body = StatusResponse),
        (status = 401, description = "Missing or invalid service key"),
        (status = 503, description = "No service key configured")
    )
)]
pub async fn publish_notification(
    State(state): State<AppState>,
    Json(body): Json<PublishNotificationBody>,
) -> Result<Json<StatusResponse>, AuthError> {
    verify_service_key(state.api_key.as_deref(), Some(&body.key))?;

    let delivered = state
        .mailbox
        .publish(Notification::new(body.data, body.near_account_id));
    debug!(delivered, "Notification published");
    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use std::time::Duration;

    fn publish_body(key: &str, recipient: Option<&str>) -> PublishNotificationBody {
        PublishNotificationBody {
            data: "hello".to_string(),
            near_account_id: recipient.map(str::to_string),
            key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn publish_requires_matching_key() {
        let state = AppState::default().with_api_key("s3cret");
        state.mailbox.subscribe("alice");

        let err = publish_notification(State(state.clone()), Json(publish_body("wrong", Some("alice"))))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidKey);
        assert!(state.mailbox.drain("alice").is_empty());

        let Json(ack) = publish_notification(State(state.clone()), Json(publish_body("s3cret", Some("alice"))))
            .await
            .unwrap();
        assert_eq!(ack, StatusResponse::ok());
        assert_eq!(state.mailbox.drain("alice").len(), 1);
    }

    #[tokio::test]
    async fn publish_without_configured_key_is_refused() {
        let err = publish_notification(State(AppState::default()), Json(publish_body("any", None)))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NotConfigured);
    }

    #[tokio::test]
    async fn stream_delivers_published_events_and_unsubscribes_on_drop() {
        let mut state = AppState::default().with_api_key("s3cret");
        state.sse_poll_interval = Duration::from_millis(10);

        let response = subscribe_notifications(Path("alice".to_string()), State(state.clone()))
            .await
            .into_response();
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );
        assert!(state.mailbox.is_subscribed("alice"));

        publish_notification(State(state.clone()), Json(publish_body("s3cret", Some("alice"))))
            .await
            .unwrap();

        let mut body = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let frame = String::from_utf8(frame.to_vec()).unwrap();
        assert!(frame.contains("event: notification"));
        assert!(frame.contains("\"data\":\"hello\""));

        drop(body);
        assert!(!state.mailbox.is_subscribed("alice"));
    }
}

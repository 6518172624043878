// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Live channel for one exchange id over WebSocket.
//!
//! The socket is attached to the connection registry on upgrade and every
//! store mutation of the id is pushed to it as a JSON text frame tagged by
//! `type` (`request`, `response`, `deleted`) with the value under `data`.
//! Inbound frames other than `Close` are ignored. A newer connection for the
//! same id replaces this one; on exit the socket releases only its own
//! registration.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{exchange::LiveEvent, state::AppState};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[utoipa::path(
    get,
    path = "/{request_id}/ws",
    params(("request_id" = String, Path, description = "Exchange identifier")),
    tag = "Exchange",
    responses((status = 101, description = "Switching to the live WebSocket channel"))
)]
pub async fn live_socket(
    ws: WebSocketUpgrade,
    Path(request_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, request_id, state))
}

async fn handle_socket(socket: WebSocket, request_id: String, state: AppState) {
    let (ws_tx, ws_rx) = socket.split();
    run_connection(ws_tx, ws_rx, request_id, state).await;
}

/// Serve one live connection until the peer closes, the transport fails,
/// the connection is replaced or the server shuts down.
async fn run_connection<S, R, E>(sink: S, mut inbound: R, request_id: String, state: AppState)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
{
    let (tx, rx) = mpsc::channel(state.live_channel_capacity.max(1));
    let token = state.live.attach(&request_id, tx);
    info!(exchange_id = %request_id, connection = %token, "Live connection opened");

    let reader = async {
        while let Some(Ok(msg)) = inbound.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    };

    tokio::select! {
        _ = write_events(sink, rx) => {}
        _ = reader => {}
        _ = state.shutdown.cancelled() => {}
    }

    state.live.release(&request_id, token);
    info!(exchange_id = %request_id, connection = %token, "Live connection closed");
}

/// Forward registry events to the socket, with a periodic ping.
///
/// Returns when the registry drops the sender or the socket stops
/// accepting frames.
async fn write_events<S>(mut sink: S, mut rx: mpsc::Receiver<LiveEvent>)
where
    S: Sink<Message> + Unpin,
{
    let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    debug!("Live sender dropped");
                    break;
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode live event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::RequestPayload;
    use futures::channel::mpsc as frames;
    use std::convert::Infallible;
    use tokio::task::JoinHandle;

    type Inbound = frames::UnboundedSender<Result<Message, Infallible>>;
    type Outbound = frames::UnboundedReceiver<Message>;

    fn connect(state: &AppState, id: &str) -> (Inbound, Outbound, JoinHandle<()>) {
        let (sink, outbound) = frames::unbounded::<Message>();
        let (inbound, stream) = frames::unbounded::<Result<Message, Infallible>>();
        let task = tokio::spawn(run_connection(sink, stream, id.to_string(), state.clone()));
        (inbound, outbound, task)
    }

    async fn wait_until_attached(state: &AppState, id: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !state.live.is_attached(id) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    async fn finish(task: JoinHandle<()>) {
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    fn text(msg: Message) -> serde_json::Value {
        match msg {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn events_are_written_as_tagged_json_in_order() {
        let (sink, mut written) = frames::unbounded::<Message>();
        let (tx, rx) = mpsc::channel(8);

        tx.send(LiveEvent::Request(RequestPayload::new("payload")))
            .await
            .unwrap();
        tx.send(LiveEvent::Response("signed".to_string()))
            .await
            .unwrap();
        tx.send(LiveEvent::Deleted).await.unwrap();
        drop(tx);

        write_events(sink, rx).await;

        let first = text(written.next().await.unwrap());
        assert_eq!(first["type"], "request");
        assert_eq!(first["data"]["data"], "payload");
        assert_eq!(first["data"]["type"], "login");

        let second = text(written.next().await.unwrap());
        assert_eq!(second, serde_json::json!({ "type": "response", "data": "signed" }));

        let third = text(written.next().await.unwrap());
        assert_eq!(third, serde_json::json!({ "type": "deleted" }));
    }

    #[tokio::test]
    async fn writer_stops_when_socket_is_gone() {
        let (sink, written) = frames::unbounded::<Message>();
        drop(written);
        let (tx, rx) = mpsc::channel(8);
        tx.send(LiveEvent::Deleted).await.unwrap();

        // Returns even though the sender is still alive.
        write_events(sink, rx).await;
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn store_mutations_reach_the_socket_and_close_releases() {
        let state = AppState::default();
        let (inbound, mut outbound, task) = connect(&state, "ex-1");
        wait_until_attached(&state, "ex-1").await;

        state.exchanges.put_response("ex-1", "signed".to_string());
        let frame = text(outbound.next().await.unwrap());
        assert_eq!(frame, serde_json::json!({ "type": "response", "data": "signed" }));

        inbound.unbounded_send(Ok(Message::Close(None))).unwrap();
        finish(task).await;
        assert!(!state.live.is_attached("ex-1"));
    }

    #[tokio::test]
    async fn transport_end_releases() {
        let state = AppState::default();
        let (inbound, _outbound, task) = connect(&state, "ex-1");
        wait_until_attached(&state, "ex-1").await;

        drop(inbound);
        finish(task).await;
        assert!(state.live.is_empty());
    }

    #[tokio::test]
    async fn shutdown_releases() {
        let state = AppState::default();
        let (_inbound, _outbound, task) = connect(&state, "ex-1");
        wait_until_attached(&state, "ex-1").await;

        state.shutdown.cancel();
        finish(task).await;
        assert!(!state.live.is_attached("ex-1"));
    }

    #[tokio::test]
    async fn replaced_connection_ends_without_detaching_newer_one() {
        let state = AppState::default();
        let (_old_in, _old_out, old_task) = connect(&state, "ex-1");
        wait_until_attached(&state, "ex-1").await;

        let (new_in, mut new_out, new_task) = connect(&state, "ex-1");
        // The old writer sees its sender dropped once replaced.
        finish(old_task).await;
        assert!(state.live.is_attached("ex-1"));

        state.exchanges.put_response("ex-1", "late".to_string());
        let frame = text(new_out.next().await.unwrap());
        assert_eq!(frame["data"], "late");

        drop(new_in);
        finish(new_task).await;
        assert!(!state.live.is_attached("ex-1"));
    }
}

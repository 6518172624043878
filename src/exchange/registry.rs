// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Live connection registry.
//!
//! Tracks which exchange ids currently have an open WebSocket attached and
//! forwards store mutations to them. Sends are fire-and-forget: the registry
//! never waits on the remote peer, and a missing, full or closed channel only
//! drops the message.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::store::RequestPayload;

/// A store mutation forwarded to the live connection of an exchange.
///
/// Encoded as `{"type": "request" | "response" | "deleted", "data": ...}`;
/// `deleted` carries no `data`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LiveEvent {
    Request(RequestPayload),
    Response(String),
    Deleted,
}

/// Outbound half of a live connection.
pub type LiveSender = mpsc::Sender<LiveEvent>;

/// Identifies one particular attachment of an id.
///
/// Returned by [`ConnectionRegistry::attach`] so that a socket task whose
/// connection was replaced can release its own registration without
/// detaching the newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionToken(Uuid);

impl std::fmt::Display for ConnectionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct LiveConnection {
    token: ConnectionToken,
    tx: LiveSender,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, LiveConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn connections(&self) -> MutexGuard<'_, HashMap<String, LiveConnection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Associate `id` with a live channel, replacing any previous one.
    pub fn attach(&self, id: &str, tx: LiveSender) -> ConnectionToken {
        let token = ConnectionToken(Uuid::new_v4());
        let previous = self
            .connections()
            .insert(id.to_string(), LiveConnection { token, tx });

        if let Some(previous) = previous {
            info!(
                exchange_id = %id,
                replaced = %previous.token,
                token = %token,
                "Live connection replaced"
            );
        } else {
            debug!(exchange_id = %id, token = %token, "Live connection attached");
        }
        token
    }

    /// Remove whatever connection is attached to `id`.
    pub fn detach(&self, id: &str) -> bool {
        let removed = self.connections().remove(id).is_some();
        if removed {
            debug!(exchange_id = %id, "Live connection detached");
        }
        removed
    }

    /// Remove the attachment of `id` only if it is still the one identified
    /// by `token`.
    pub fn release(&self, id: &str, token: ConnectionToken) -> bool {
        let mut connections = self.connections();
        match connections.get(id) {
            Some(current) if current.token == token => {
                connections.remove(id);
                debug!(exchange_id = %id, token = %token, "Live connection released");
                true
            }
            _ => false,
        }
    }

    /// Best-effort emit to the connection attached to `id`.
    ///
    /// Returns whether the event was buffered for the socket writer. An
    /// absent id is not an error.
    pub fn push_to_id(&self, id: &str, event: LiveEvent) -> bool {
        let connections = self.connections();
        let Some(connection) = connections.get(id) else {
            return false;
        };

        match connection.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    exchange_id = %id,
                    event = ?event,
                    "Live channel full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(exchange_id = %id, "Live channel closed, dropping event");
                false
            }
        }
    }

    pub fn is_attached(&self, id: &str) -> bool {
        self.connections().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

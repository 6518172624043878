// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory exchange store.
//!
//! The rendezvous point for two wallet clients that share no channel: one
//! side puts a request, the other puts a response, both keyed by an opaque
//! exchange id. A topic id may be attached to a request so the creator can
//! rediscover its current exchange id after reconnecting.
//!
//! Every mutation is forwarded to the live connection of the id (if any)
//! while the table lock is held, so a live client observes mutations in the
//! order they were applied. The lock is never held across I/O; forwarding is
//! a non-blocking channel send.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;
use utoipa::ToSchema;

use super::registry::{ConnectionRegistry, LiveEvent};

/// Request side of an exchange, returned verbatim to the fulfilling client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RequestPayload {
    /// Opaque payload.
    pub data: String,
    /// Kind of wallet action requested.
    #[serde(rename = "type")]
    pub request_type: String,
    /// Whether `data` is end-to-end encrypted by the clients.
    pub encrypted: bool,
}

impl RequestPayload {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            request_type: "login".to_string(),
            encrypted: false,
        }
    }
}

#[derive(Debug, Default)]
struct Exchange {
    /// `None` when the response arrived before the request.
    request: Option<RequestPayload>,
    topic_id: Option<String>,
    response: Option<String>,
    expires_at: Option<Instant>,
}

impl Exchange {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Tables {
    exchanges: HashMap<String, Exchange>,
    /// topic id → exchange id. Mirrors `Exchange::topic_id`.
    topics: HashMap<String, String>,
}

impl Tables {
    /// Point `topic` at `id`, unlinking whatever either side was linked to.
    fn link_topic(&mut self, id: &str, topic: &str) {
        let previous_topic = self
            .exchanges
            .get(id)
            .and_then(|exchange| exchange.topic_id.clone());
        if let Some(previous_topic) = previous_topic {
            if previous_topic != topic {
                self.topics.remove(&previous_topic);
            }
        }

        if let Some(previous_owner) = self.topics.insert(topic.to_string(), id.to_string()) {
            if previous_owner != id {
                if let Some(exchange) = self.exchanges.get_mut(&previous_owner) {
                    exchange.topic_id = None;
                }
            }
        }

        self.exchanges.entry(id.to_string()).or_default().topic_id = Some(topic.to_string());
    }

    fn remove(&mut self, id: &str) -> Option<Exchange> {
        let exchange = self.exchanges.remove(id)?;
        if let Some(topic) = &exchange.topic_id {
            if self.topics.get(topic).is_some_and(|owner| owner == id) {
                self.topics.remove(topic);
            }
        }
        Some(exchange)
    }
}

pub struct ExchangeStore {
    tables: Mutex<Tables>,
    live: Arc<ConnectionRegistry>,
}

impl ExchangeStore {
    pub fn new(live: Arc<ConnectionRegistry>) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            live,
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite the request at `id` (last writer wins).
    ///
    /// A non-empty `topic_id` registers `topic_id → id`. `ttl` restarts the
    /// expiry clock; `None` clears any previous expiry.
    pub fn put_request(
        &self,
        id: &str,
        request: RequestPayload,
        topic_id: Option<&str>,
        ttl: Option<Duration>,
    ) {
        let now = Instant::now();
        let mut tables = self.tables();
        self.evict_expired(&mut tables, id, now);

        if let Some(topic) = topic_id.filter(|topic| !topic.is_empty()) {
            tables.link_topic(id, topic);
        }

        let exchange = tables.exchanges.entry(id.to_string()).or_default();
        exchange.request = Some(request.clone());
        // A ttl past the clock's range never expires.
        exchange.expires_at = ttl.and_then(|ttl| now.checked_add(ttl));

        debug!(exchange_id = %id, topic_id = ?topic_id, ttl = ?ttl, "Request stored");
        self.live.push_to_id(id, LiveEvent::Request(request));
    }

    /// Set or overwrite the response at `id`.
    ///
    /// The slot is created if the request has not arrived yet.
    pub fn put_response(&self, id: &str, data: String) {
        let mut tables = self.tables();
        self.evict_expired(&mut tables, id, Instant::now());
        tables.exchanges.entry(id.to_string()).or_default().response = Some(data.clone());

        debug!(exchange_id = %id, "Response stored");
        self.live.push_to_id(id, LiveEvent::Response(data));
    }

    /// Drop `id` if its ttl has elapsed, exactly as the sweeper would, so a
    /// reused id starts from an empty slot whether or not a sweep ran.
    fn evict_expired(&self, tables: &mut Tables, id: &str, now: Instant) {
        let expired = tables
            .exchanges
            .get(id)
            .is_some_and(|exchange| !exchange.is_live(now));
        if expired {
            self.live.push_to_id(id, LiveEvent::Deleted);
            tables.remove(id);
            debug!(exchange_id = %id, "Expired exchange evicted");
        }
    }

    pub fn get_request(&self, id: &str) -> Option<RequestPayload> {
        let now = Instant::now();
        self.tables()
            .exchanges
            .get(id)
            .filter(|exchange| exchange.is_live(now))
            .and_then(|exchange| exchange.request.clone())
    }

    pub fn get_response(&self, id: &str) -> Option<String> {
        let now = Instant::now();
        self.tables()
            .exchanges
            .get(id)
            .filter(|exchange| exchange.is_live(now))
            .and_then(|exchange| exchange.response.clone())
    }

    /// Remove the exchange and its topic mapping.
    ///
    /// The live connection is told before the entry goes away. Returns
    /// whether anything was removed; a missing id is a no-op.
    pub fn delete(&self, id: &str) -> bool {
        let mut tables = self.tables();
        if !tables.exchanges.contains_key(id) {
            return false;
        }

        self.live.push_to_id(id, LiveEvent::Deleted);
        tables.remove(id);
        debug!(exchange_id = %id, "Exchange deleted");
        true
    }

    /// Map topic ids to exchange ids, preserving input order and skipping
    /// topics without a (live) mapping.
    pub fn resolve_by_topics<S: AsRef<str>>(&self, topic_ids: &[S]) -> Vec<String> {
        let now = Instant::now();
        let tables = self.tables();
        topic_ids
            .iter()
            .filter_map(|topic| tables.topics.get(topic.as_ref()))
            .filter(|id| {
                tables
                    .exchanges
                    .get(id.as_str())
                    .is_some_and(|exchange| exchange.is_live(now))
            })
            .cloned()
            .collect()
    }

    /// Delete every exchange whose TTL has elapsed. Returns the removed ids.
    pub fn purge_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let mut tables = self.tables();

        let expired: Vec<String> = tables
            .exchanges
            .iter()
            .filter(|(_, exchange)| !exchange.is_live(now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.live.push_to_id(id, LiveEvent::Deleted);
            tables.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.tables().exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

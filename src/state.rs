// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{RelayConfig, DEFAULT_LIVE_CHANNEL_CAPACITY, DEFAULT_SSE_POLL_INTERVAL};
use crate::exchange::{ConnectionRegistry, ExchangeStore};
use crate::notifications::NotificationMailbox;
use crate::push::PushDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub exchanges: Arc<ExchangeStore>,
    pub live: Arc<ConnectionRegistry>,
    pub mailbox: Arc<NotificationMailbox>,
    /// `None` when APNs is not configured.
    pub push: Option<PushDispatcher>,
    pub api_key: Option<Arc<str>>,
    pub sse_poll_interval: Duration,
    pub live_channel_capacity: usize,
    /// Cancelled on process shutdown; long-lived streams end with it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: &RelayConfig, push: Option<PushDispatcher>, shutdown: CancellationToken) -> Self {
        let live = Arc::new(ConnectionRegistry::new());
        Self {
            exchanges: Arc::new(ExchangeStore::new(live.clone())),
            live,
            mailbox: Arc::new(NotificationMailbox::new()),
            push,
            api_key: config.api_key.as_deref().map(Arc::from),
            sse_poll_interval: config.sse_poll_interval,
            live_channel_capacity: config.live_channel_capacity,
            shutdown,
        }
    }

    pub fn with_push(mut self, push: PushDispatcher) -> Self {
        self.push = Some(push);
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(Arc::from(key));
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        let live = Arc::new(ConnectionRegistry::new());
        Self {
            exchanges: Arc::new(ExchangeStore::new(live.clone())),
            live,
            mailbox: Arc::new(NotificationMailbox::new()),
            push: None,
            api_key: None,
            sse_poll_interval: DEFAULT_SSE_POLL_INTERVAL,
            live_channel_capacity: DEFAULT_LIVE_CHANNEL_CAPACITY,
            shutdown: CancellationToken::new(),
        }
    }
}

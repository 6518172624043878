// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Polling stream over a user's mailbox.
//!
//! The stream subscribes the user when it is created and repeatedly drains
//! the mailbox, sleeping `poll_interval` whenever it comes back empty. When
//! the peer goes away the HTTP layer drops the stream, and the subscription
//! guard unsubscribes the user. A newer stream for the same user takes the
//! mailbox over and the older one ends. Server shutdown ends the stream as
//! well.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, Stream};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::mailbox::{Notification, NotificationMailbox, SubscriptionToken};

/// Keeps `user_id` subscribed for as long as it is alive.
struct Subscription {
    mailbox: Arc<NotificationMailbox>,
    user_id: String,
    token: SubscriptionToken,
}

impl Subscription {
    fn new(mailbox: Arc<NotificationMailbox>, user_id: String) -> Self {
        let token = mailbox.subscribe(&user_id);
        info!(user_id = %user_id, subscription = %token, "Notification stream opened");
        Self {
            mailbox,
            user_id,
            token,
        }
    }

    /// `None` once a newer stream holds the mailbox.
    fn drain(&self) -> Option<Vec<Notification>> {
        self.mailbox.drain_as(&self.user_id, self.token)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.mailbox.release(&self.user_id, self.token);
        info!(user_id = %self.user_id, subscription = %self.token, "Notification stream closed");
    }
}

struct PollState {
    subscription: Subscription,
    pending: VecDeque<Notification>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

/// Stream of notifications addressed to `user_id` (or broadcast).
pub fn notification_stream(
    mailbox: Arc<NotificationMailbox>,
    user_id: String,
    poll_interval: Duration,
    shutdown: CancellationToken,
) -> impl Stream<Item = Notification> + Send + 'static {
    let state = PollState {
        subscription: Subscription::new(mailbox, user_id),
        pending: VecDeque::new(),
        poll_interval,
        shutdown,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.shutdown.is_cancelled() {
                return None;
            }
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }

            let Some(events) = state.subscription.drain() else {
                info!(user_id = %state.subscription.user_id, "Notification stream replaced");
                return None;
            };
            state.pending.extend(events);
            if !state.pending.is_empty() {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(state.poll_interval) => {},
                _ = state.shutdown.cancelled() => return None,
            }
        }
    })
}

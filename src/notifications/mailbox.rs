// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-user notification mailbox.
//!
//! A user has a mailbox only while subscribed; publishing to a user without
//! one drops the event. Draining empties the mailbox (read-once), and
//! unsubscribing discards whatever was still buffered.
//!
//! Each subscription is stamped with a [`SubscriptionToken`]. Subscribing
//! again hands the mailbox to the new holder; the previous holder's token
//! stops draining and cannot unsubscribe the user.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

/// A notification event as delivered over SSE.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Notification {
    /// Opaque payload.
    pub data: String,
    /// Recipient, or `None` for a broadcast.
    pub recipient: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(data: impl Into<String>, recipient: Option<String>) -> Self {
        Self {
            data: data.into(),
            recipient,
            created_at: Utc::now(),
        }
    }
}

/// Identifies the current holder of a user's mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(Uuid);

impl std::fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Mailbox {
    holder: SubscriptionToken,
    queue: VecDeque<Notification>,
}

type Boxes = HashMap<String, Mailbox>;

#[derive(Default)]
pub struct NotificationMailbox {
    /// Presence of a key is the subscription flag.
    boxes: Mutex<Boxes>,
}

impl NotificationMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn boxes(&self) -> MutexGuard<'_, Boxes> {
        self.boxes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start buffering events for `user_id` and return the new holder's
    /// token. A backlog already buffered for the user is kept.
    pub fn subscribe(&self, user_id: &str) -> SubscriptionToken {
        let holder = SubscriptionToken(Uuid::new_v4());
        let mut boxes = self.boxes();
        match boxes.get_mut(user_id) {
            Some(mailbox) => mailbox.holder = holder,
            None => {
                boxes.insert(
                    user_id.to_string(),
                    Mailbox {
                        holder,
                        queue: VecDeque::new(),
                    },
                );
            }
        }
        holder
    }

    /// Stop buffering for `user_id` and discard the backlog.
    pub fn unsubscribe(&self, user_id: &str) {
        if let Some(mailbox) = self.boxes().remove(user_id) {
            log_discarded(user_id, &mailbox);
        }
    }

    /// Unsubscribe `user_id` only if `holder` still owns the mailbox.
    pub fn release(&self, user_id: &str, holder: SubscriptionToken) -> bool {
        let mut boxes = self.boxes();
        if boxes.get(user_id).is_some_and(|mailbox| mailbox.holder == holder) {
            if let Some(mailbox) = boxes.remove(user_id) {
                log_discarded(user_id, &mailbox);
            }
            true
        } else {
            false
        }
    }

    pub fn is_subscribed(&self, user_id: &str) -> bool {
        self.boxes().contains_key(user_id)
    }

    /// Append `event` to the recipient's mailbox, or to every mailbox when
    /// the event has no recipient. Returns the number of mailboxes reached.
    pub fn publish(&self, event: Notification) -> usize {
        let mut boxes = self.boxes();
        match event.recipient.as_deref() {
            Some(user_id) => match boxes.get_mut(user_id) {
                Some(mailbox) => {
                    mailbox.queue.push_back(event);
                    1
                }
                None => 0,
            },
            None => {
                for mailbox in boxes.values_mut() {
                    mailbox.queue.push_back(event.clone());
                }
                boxes.len()
            }
        }
    }

    /// Remove and return everything buffered for `user_id`, oldest first.
    pub fn drain(&self, user_id: &str) -> Vec<Notification> {
        self.boxes()
            .get_mut(user_id)
            .map(|mailbox| mailbox.queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Like [`drain`](Self::drain), but `None` once `holder` no longer owns
    /// the mailbox.
    pub fn drain_as(&self, user_id: &str, holder: SubscriptionToken) -> Option<Vec<Notification>> {
        self.boxes()
            .get_mut(user_id)
            .filter(|mailbox| mailbox.holder == holder)
            .map(|mailbox| mailbox.queue.drain(..).collect())
    }

    pub fn subscriber_count(&self) -> usize {
        self.boxes().len()
    }
}

fn log_discarded(user_id: &str, mailbox: &Mailbox) {
    if !mailbox.queue.is_empty() {
        debug!(user_id = %user_id, discarded = mailbox.queue.len(), "Discarded undelivered notifications");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(events: &[Notification]) -> Vec<&str> {
        events.iter().map(|e| e.data.as_str()).collect()
    }

    #[test]
    fn publish_before_subscribe_is_dropped() {
        let mailbox = NotificationMailbox::new();
        assert_eq!(mailbox.publish(Notification::new("early", Some("alice".into()))), 0);

        mailbox.subscribe("alice");
        assert!(mailbox.drain("alice").is_empty());
    }

    #[test]
    fn drain_is_fifo_and_read_once() {
        let mailbox = NotificationMailbox::new();
        mailbox.subscribe("alice");
        for n in ["one", "two", "three"] {
            mailbox.publish(Notification::new(n, Some("alice".into())));
        }

        assert_eq!(data(&mailbox.drain("alice")), vec!["one", "two", "three"]);
        assert!(mailbox.drain("alice").is_empty());
    }

    #[test]
    fn broadcast_reaches_only_subscribers() {
        let mailbox = NotificationMailbox::new();
        mailbox.subscribe("alice");
        mailbox.subscribe("bob");

        assert_eq!(mailbox.publish(Notification::new("hi all", None)), 2);

        assert_eq!(data(&mailbox.drain("alice")), vec!["hi all"]);
        assert_eq!(data(&mailbox.drain("bob")), vec!["hi all"]);
        assert!(mailbox.drain("carol").is_empty());
        assert!(!mailbox.is_subscribed("carol"));
    }

    #[test]
    fn targeted_publish_skips_other_users() {
        let mailbox = NotificationMailbox::new();
        mailbox.subscribe("alice");
        mailbox.subscribe("bob");

        mailbox.publish(Notification::new("for bob", Some("bob".into())));
        assert!(mailbox.drain("alice").is_empty());
        assert_eq!(data(&mailbox.drain("bob")), vec!["for bob"]);
    }

    #[test]
    fn unsubscribe_discards_backlog() {
        let mailbox = NotificationMailbox::new();
        mailbox.subscribe("alice");
        mailbox.publish(Notification::new("stale", Some("alice".into())));

        mailbox.unsubscribe("alice");
        mailbox.subscribe("alice");
        assert!(mailbox.drain("alice").is_empty());
    }

    #[test]
    fn subscribe_is_idempotent() {
        let mailbox = NotificationMailbox::new();
        mailbox.subscribe("alice");
        mailbox.publish(Notification::new("kept", Some("alice".into())));
        mailbox.subscribe("alice");

        assert_eq!(data(&mailbox.drain("alice")), vec!["kept"]);
        assert_eq!(mailbox.subscriber_count(), 1);
    }

    #[test]
    fn unsubscribe_unknown_user_is_a_noop() {
        let mailbox = NotificationMailbox::new();
        mailbox.unsubscribe("nobody");
        assert_eq!(mailbox.subscriber_count(), 0);
    }

    #[test]
    fn resubscribe_hands_over_the_mailbox() {
        let mailbox = NotificationMailbox::new();
        let first = mailbox.subscribe("alice");
        mailbox.publish(Notification::new("pending", Some("alice".into())));
        let second = mailbox.subscribe("alice");
        assert_ne!(first, second);

        assert_eq!(mailbox.drain_as("alice", first), None);
        assert!(!mailbox.release("alice", first));
        assert!(mailbox.is_subscribed("alice"));

        assert_eq!(
            mailbox.drain_as("alice", second).as_deref().map(data),
            Some(vec!["pending"])
        );
        assert!(mailbox.release("alice", second));
        assert!(!mailbox.is_subscribed("alice"));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Notifications
//!
//! Per-user mailboxes fed by `POST /sse` and consumed through long-lived
//! server-sent event streams. Delivery is best-effort: events reach only
//! users with an open stream, each event at most once, in publish order.

pub mod mailbox;
pub mod stream;

pub use mailbox::{Notification, NotificationMailbox, SubscriptionToken};
pub use stream::notification_stream;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Push Notifications
//!
//! Producer/consumer pipeline that turns queued push tasks into APNs calls.
//!
//! ## Task lifecycle
//!
//! `Enqueued → Dispatching → Delivered | Failed`
//!
//! Both outcomes are terminal. A failed call is logged and the task dropped:
//! there is no retry, no backoff and no dead-letter queue.
//!
//! ## Modules
//!
//! - `apns` - APNs gateway client and provider token signing
//! - `dispatcher` - bounded queue and worker pool

pub mod apns;
pub mod dispatcher;

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::PushRequestBody;

pub use apns::{ApnsClient, ProviderTokenSigner};
pub use dispatcher::PushDispatcher;

/// Whether the notification is shown to the user or wakes the app silently.
///
/// Serialized as the integer the wallet apps expect in `push_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PushType {
    Background,
    #[default]
    Foreground,
}

impl From<PushType> for u8 {
    fn from(value: PushType) -> Self {
        match value {
            PushType::Background => 0,
            PushType::Foreground => 1,
        }
    }
}

impl TryFrom<u8> for PushType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PushType::Background),
            1 => Ok(PushType::Foreground),
            other => Err(format!("unknown push_type {other}, expected 0 or 1")),
        }
    }
}

/// One outbound notification. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct PushTask {
    pub device_token: String,
    pub title: String,
    pub body: String,
    pub push_type: PushType,
    pub badge: Option<u32>,
    pub payload: Option<Map<String, Value>>,
}

impl PushTask {
    pub fn new(
        device_token: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            device_token: device_token.into(),
            title: title.into(),
            body: body.into(),
            push_type: PushType::default(),
            badge: None,
            payload: None,
        }
    }

    /// Abbreviated device token for log lines.
    pub fn token_hint(&self) -> &str {
        let end = self
            .device_token
            .char_indices()
            .nth(8)
            .map_or(self.device_token.len(), |(idx, _)| idx);
        &self.device_token[..end]
    }
}

impl From<PushRequestBody> for PushTask {
    fn from(request: PushRequestBody) -> Self {
        Self {
            device_token: request.device_token,
            title: request.title,
            body: request.body,
            push_type: request.push_type,
            badge: request.badge,
            payload: request.payload,
        }
    }
}

/// Successful gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    pub apns_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("provider token signing failed: {0}")]
    Signing(String),

    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("gateway rejected notification with {status}: {reason}")]
    Rejected { status: u16, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("push queue is full")]
    QueueFull,

    #[error("push dispatcher is shut down")]
    Closed,
}

/// External push delivery service. One call per task, no batching.
pub trait PushGateway: Send + Sync + 'static {
    fn deliver(&self, task: &PushTask) -> impl Future<Output = Result<Delivery, PushError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_type_round_trips_through_integers() {
        assert_eq!(serde_json::to_value(PushType::Background).unwrap(), 0);
        assert_eq!(serde_json::to_value(PushType::Foreground).unwrap(), 1);
        assert_eq!(
            serde_json::from_str::<PushType>("0").unwrap(),
            PushType::Background
        );
        assert!(serde_json::from_str::<PushType>("7").is_err());
    }

    #[test]
    fn token_hint_truncates() {
        let task = PushTask::new("0123456789abcdef", "t", "b");
        assert_eq!(task.token_hint(), "01234567");

        let short = PushTask::new("abc", "t", "b");
        assert_eq!(short.token_hint(), "abc");
    }
}

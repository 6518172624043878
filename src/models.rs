// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the relay's HTTP surface. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and OpenAPI
//! documentation.
//!
//! ## Model Categories
//!
//! - **Exchange**: request/response handoff between two wallet clients
//! - **Notifications**: server-sent events published to subscribed users
//! - **Push**: APNs notifications queued for the dispatcher

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::push::PushType;

// =============================================================================
// Common
// =============================================================================

/// Generic acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn queued() -> Self {
        Self {
            status: "queued".to_string(),
        }
    }
}

// =============================================================================
// Exchange Models
// =============================================================================

fn default_request_type() -> String {
    "login".to_string()
}

/// Body of `POST /{request_id}/request`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PutRequestBody {
    /// Opaque payload handed to the fulfilling client.
    pub data: String,
    /// Kind of wallet action requested.
    #[serde(rename = "type", default = "default_request_type")]
    pub request_type: String,
    /// Stable key the creator can use to rediscover this request id.
    #[serde(default)]
    pub topic_id: Option<String>,
    /// Seconds until the exchange expires. Absent means no expiry.
    #[serde(default)]
    pub ttl: Option<u64>,
    /// Whether `data` is end-to-end encrypted by the clients.
    #[serde(default)]
    pub encrypted: bool,
}

/// Body of `POST /{request_id}/response`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PutResponseBody {
    pub data: String,
}

/// Body of `GET /{request_id}/response`. `data` is `null` until answered.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ResponseData {
    pub data: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TopicQuery {
    /// Semicolon separated topic ids, e.g. `a;b;c`.
    pub topic_ids: String,
}

impl TopicQuery {
    pub fn topics(&self) -> Vec<String> {
        self.topic_ids.split(';').map(str::to_string).collect()
    }
}

/// Exchange ids resolved from topics, in query order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ExchangeIds {
    pub ids: Vec<String>,
}

// =============================================================================
// Notification Models
// =============================================================================

/// Body of `POST /sse`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublishNotificationBody {
    pub data: String,
    /// Recipient; `null` broadcasts to every subscribed user.
    #[serde(default)]
    pub near_account_id: Option<String>,
    /// Shared service key.
    pub key: String,
}

// =============================================================================
// Push Models
// =============================================================================

/// Body of `POST /push`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PushRequestBody {
    pub device_token: String,
    pub title: String,
    pub body: String,
    /// `1` for a visible alert (default), `0` for a silent background push.
    #[serde(default)]
    #[schema(value_type = u8)]
    pub push_type: PushType,
    #[serde(default)]
    pub badge: Option<u32>,
    /// Extra top-level keys merged into the APNs body.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub payload: Option<Map<String, Value>>,
}

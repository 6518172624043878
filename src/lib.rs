// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Relay - Wallet Handoff & Notification Relay
//!
//! This crate hands short-lived request/response payloads between two wallet
//! clients that share no direct channel, streams live updates over
//! WebSocket and server-sent events, and fans out APNs push notifications
//! through a bounded worker pool. All state is in memory.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Shared service key checks
//! - `exchange` - Exchange store, live connection registry, TTL sweeper
//! - `notifications` - Per-user notification mailbox and SSE stream
//! - `push` - APNs gateway and push dispatcher

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod exchange;
pub mod models;
pub mod notifications;
pub mod push;
pub mod state;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Exchange Handoff
//!
//! Request/response handoff between two wallet clients.
//!
//! - `store` - the in-memory exchange table and its topic index
//! - `registry` - live WebSocket connections receiving store mutations
//! - `sweeper` - background removal of exchanges whose TTL elapsed

pub mod registry;
pub mod store;
pub mod sweeper;

pub use registry::{ConnectionRegistry, ConnectionToken, LiveEvent, LiveSender};
pub use store::{ExchangeStore, RequestPayload};
pub use sweeper::ExchangeSweeper;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Exchange TTL Sweeper
//!
//! Background task that removes exchanges whose `ttl` has elapsed. Reads
//! already treat expired exchanges as absent; the sweeper reclaims their
//! memory and tells attached live connections that the exchange is gone.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`, the same token that stops the
//! push workers and the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::ExchangeStore;

pub struct ExchangeSweeper {
    store: Arc<ExchangeStore>,
    sweep_interval: Duration,
}

impl ExchangeSweeper {
    pub fn new(store: Arc<ExchangeStore>, sweep_interval: Duration) -> Self {
        Self {
            store,
            sweep_interval,
        }
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Exchange sweeper starting"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Exchange sweeper shutting down");
                    return;
                }
            }

            self.sweep_step();
        }
    }

    fn sweep_step(&self) -> usize {
        let expired = self.store.purge_expired();
        if !expired.is_empty() {
            info!(count = expired.len(), "Exchange sweeper: removed expired exchanges");
            debug!(exchange_ids = ?expired, "Expired exchanges");
        }
        expired.len()
    }
}

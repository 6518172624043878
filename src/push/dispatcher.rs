// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Push Dispatcher
//!
//! A fixed pool of workers consuming one shared FIFO queue. Each worker pulls
//! a task, makes one gateway call, logs the outcome and moves on, so a slow
//! or failing call only occupies its own worker.
//!
//! ## Admission control
//!
//! The queue is bounded. [`PushDispatcher::enqueue`] never waits: it returns
//! [`EnqueueError::QueueFull`] at capacity and [`EnqueueError::Closed`] once
//! the workers have stopped.
//!
//! ## Shutdown
//!
//! Workers exit when the shared `CancellationToken` fires. Tasks still
//! queued at that point are dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{EnqueueError, PushGateway, PushTask};

type SharedQueue = Arc<Mutex<mpsc::Receiver<PushTask>>>;

/// Producer handle. Cheap to clone; every clone feeds the same queue.
#[derive(Clone)]
pub struct PushDispatcher {
    tx: mpsc::Sender<PushTask>,
    workers: usize,
}

impl PushDispatcher {
    /// Spawn `workers` consumers over a queue holding at most `capacity`
    /// tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<G: PushGateway>(
        gateway: Arc<G>,
        workers: usize,
        capacity: usize,
        shutdown: CancellationToken,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue: SharedQueue = Arc::new(Mutex::new(rx));
        let workers = workers.max(1);

        info!(workers, capacity, "Push dispatcher starting");

        let handles = (0..workers)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    gateway.clone(),
                    queue.clone(),
                    shutdown.clone(),
                ))
            })
            .collect();

        (Self { tx, workers }, handles)
    }

    /// Accept a task without waiting. Delivery outcome is never reported
    /// back to the caller.
    pub fn enqueue(&self, task: PushTask) -> Result<(), EnqueueError> {
        let hint = task.token_hint().to_string();
        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })?;
        debug!(device = %hint, "Push task enqueued");
        Ok(())
    }

    /// Tasks waiting for a worker.
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether every worker has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn run_worker<G: PushGateway>(
    worker: usize,
    gateway: Arc<G>,
    queue: SharedQueue,
    shutdown: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            task = recv(&queue) => task,
        };
        let Some(task) = next else {
            break;
        };

        dispatch(worker, gateway.as_ref(), task).await;
    }
    debug!(worker, "Push worker stopped");
}

/// The queue lock is held only while waiting for the next task.
async fn recv(queue: &SharedQueue) -> Option<PushTask> {
    queue.lock().await.recv().await
}

async fn dispatch<G: PushGateway>(worker: usize, gateway: &G, task: PushTask) {
    debug!(worker, device = %task.token_hint(), push_type = ?task.push_type, "Dispatching push");

    match gateway.deliver(&task).await {
        Ok(delivery) => info!(
            worker,
            device = %task.token_hint(),
            status = delivery.status,
            apns_id = ?delivery.apns_id,
            "Push delivered"
        ),
        Err(e) => warn!(
            worker,
            device = %task.token_hint(),
            error = %e,
            "Push failed, dropping task"
        ),
    }
}

//! The queue collection and the handle used to reach it.
//!
//! A single actor task owns the items and the store. Every mutation, whether
//! from an inbound webhook, the scheduler, or an operator, is a command on
//! its channel, so the persisted document only ever has one writer.

mod actor;
pub mod id;
pub mod sweep;

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::models::{EnqueueRequest, EscalationAlert, ItemStatus, QueueItem, QueueStats};
use crate::store::Store;

use actor::{Command, QueueActor};

const COMMAND_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("source is required")]
    MissingSource,
    #[error("queue is not running")]
    Unavailable,
}

/// Result of applying one dispatch attempt to an item.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Completed,
    Retrying { retries: u32 },
    /// Budget exhausted on this attempt; the alert must be sent exactly once.
    Exhausted(EscalationAlert),
    /// Item was reset, swept, or already terminal while the attempt ran.
    Stale,
}

#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<Command>,
    wake: Arc<Notify>,
}

impl QueueHandle {
    /// Load the collection from `store` and start the owning actor.
    pub async fn spawn(
        store: Arc<dyn Store>,
        max_retries: u32,
        retention: Duration,
    ) -> (Self, JoinHandle<()>) {
        let items = match store.load().await {
            Ok(items) => {
                tracing::info!("Loaded {} queued webhooks", items.len());
                items
            }
            Err(e) => {
                tracing::warn!("Starting with an empty queue: {e}");
                Vec::new()
            }
        };

        let stranded = over_budget(&items, max_retries);
        if stranded > 0 {
            tracing::warn!(
                "{stranded} pending webhooks already have {max_retries} or more retries and \
                 will not be dispatched; run retry-all to requeue them"
            );
        }

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = QueueActor::new(items, store, max_retries, retention);
        let join = tokio::spawn(actor.run(rx));

        let handle = Self {
            tx,
            wake: Arc::new(Notify::new()),
        };
        (handle, join)
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| QueueError::Unavailable)?;
        rx.await.map_err(|_| QueueError::Unavailable)
    }

    /// Append a new pending item and persist. Returns its id.
    pub async fn enqueue(&self, request: EnqueueRequest) -> Result<String, QueueError> {
        if request.source.trim().is_empty() {
            return Err(QueueError::MissingSource);
        }
        self.request(|reply| Command::Enqueue { request, reply }).await
    }

    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        self.request(|reply| Command::Stats { reply }).await
    }

    pub async fn export(&self) -> Result<Vec<QueueItem>, QueueError> {
        self.request(|reply| Command::Export { reply }).await
    }

    /// Reset every failed or pending item to a fresh pending state and ask
    /// the scheduler for an immediate scan. Returns how many items were reset.
    pub async fn retry_all(&self) -> Result<usize, QueueError> {
        let reset = self.request(|reply| Command::RetryAll { reply }).await?;
        self.wake.notify_one();
        Ok(reset)
    }

    pub(crate) fn wake(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Pending items still inside their retry budget, in insertion order.
    pub(crate) async fn pending_snapshot(&self) -> Result<Vec<QueueItem>, QueueError> {
        self.request(|reply| Command::PendingSnapshot { reply }).await
    }

    pub(crate) async fn apply(
        &self,
        id: String,
        outcome: Result<(), String>,
    ) -> Result<Applied, QueueError> {
        self.request(|reply| Command::Apply { id, outcome, reply }).await
    }

    /// Sweep expired terminal items and persist. Returns the number swept.
    pub(crate) async fn finish_scan(&self) -> Result<usize, QueueError> {
        self.request(|reply| Command::FinishScan { reply }).await
    }

    /// Persist one last time and stop the actor.
    pub(crate) async fn close(&self) -> Result<(), QueueError> {
        self.request(|reply| Command::Close { reply }).await
    }
}

/// Pending items the scheduler will skip because their retry count already
/// meets the budget, e.g. after the budget was lowered between runs.
fn over_budget(items: &[QueueItem], max_retries: u32) -> usize {
    items
        .iter()
        .filter(|i| i.status == ItemStatus::Pending && i.retries >= max_retries)
        .count()
}

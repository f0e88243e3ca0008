use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{mpsc, oneshot};

use super::{Applied, id, sweep};
use crate::models::{EnqueueRequest, EscalationAlert, ItemStatus, QueueItem, QueueStats};
use crate::store::Store;

pub(super) enum Command {
    Enqueue {
        request: EnqueueRequest,
        reply: oneshot::Sender<String>,
    },
    Stats {
        reply: oneshot::Sender<QueueStats>,
    },
    Export {
        reply: oneshot::Sender<Vec<QueueItem>>,
    },
    RetryAll {
        reply: oneshot::Sender<usize>,
    },
    PendingSnapshot {
        reply: oneshot::Sender<Vec<QueueItem>>,
    },
    Apply {
        id: String,
        outcome: Result<(), String>,
        reply: oneshot::Sender<Applied>,
    },
    FinishScan {
        reply: oneshot::Sender<usize>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

pub(super) struct QueueActor {
    items: Vec<QueueItem>,
    store: Arc<dyn Store>,
    max_retries: u32,
    retention: Duration,
}

impl QueueActor {
    pub(super) fn new(
        items: Vec<QueueItem>,
        store: Arc<dyn Store>,
        max_retries: u32,
        retention: Duration,
    ) -> Self {
        Self {
            items,
            store,
            max_retries,
            retention,
        }
    }

    pub(super) async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        tracing::debug!("Queue actor started");

        while let Some(command) = rx.recv().await {
            match command {
                Command::Enqueue { request, reply } => {
                    let id = self.enqueue(request).await;
                    let _ = reply.send(id);
                }
                Command::Stats { reply } => {
                    let _ = reply.send(QueueStats::from_items(&self.items));
                }
                Command::Export { reply } => {
                    let _ = reply.send(self.items.clone());
                }
                Command::RetryAll { reply } => {
                    let reset = self.retry_all().await;
                    let _ = reply.send(reset);
                }
                Command::PendingSnapshot { reply } => {
                    let pending = self
                        .items
                        .iter()
                        .filter(|i| i.status == ItemStatus::Pending && i.retries < self.max_retries)
                        .cloned()
                        .collect();
                    let _ = reply.send(pending);
                }
                Command::Apply { id, outcome, reply } => {
                    let _ = reply.send(self.apply(&id, outcome));
                }
                Command::FinishScan { reply } => {
                    let swept = sweep::sweep(&mut self.items, Utc::now(), self.retention);
                    if swept > 0 {
                        tracing::info!("Pruned {swept} expired webhooks");
                    }
                    self.persist().await;
                    let _ = reply.send(swept);
                }
                Command::Close { reply } => {
                    self.persist().await;
                    let _ = reply.send(());
                    break;
                }
            }
        }

        tracing::debug!("Queue actor stopped");
    }

    async fn enqueue(&mut self, request: EnqueueRequest) -> String {
        let now = Utc::now();
        let mut item_id = id::generate(now);
        while self.items.iter().any(|i| i.id == item_id) {
            item_id = id::generate(now);
        }

        tracing::info!(
            item_id = %item_id,
            source = %request.source,
            kind = %request.kind,
            "Webhook queued"
        );
        self.items.push(QueueItem::new(item_id.clone(), request, now));
        self.persist().await;
        item_id
    }

    async fn retry_all(&mut self) -> usize {
        let reset = self.items.iter_mut().map(QueueItem::reset).filter(|r| *r).count();
        if reset > 0 {
            tracing::info!("Reset {reset} webhooks for retry");
            self.persist().await;
        }
        reset
    }

    fn apply(&mut self, id: &str, outcome: Result<(), String>) -> Applied {
        let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.id == id && i.status == ItemStatus::Pending)
        else {
            return Applied::Stale;
        };

        let now = Utc::now();
        match outcome {
            Ok(()) => {
                item.mark_completed(now);
                Applied::Completed
            }
            Err(error) => {
                if item.record_failure(error, self.max_retries, now) {
                    Applied::Exhausted(EscalationAlert::from(&*item))
                } else {
                    Applied::Retrying {
                        retries: item.retries,
                    }
                }
            }
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.items).await {
            tracing::error!("Queue persist failed, changes kept in memory only: {e}");
        }
    }
}

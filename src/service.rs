use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::alerts::Escalator;
use crate::config::SchedulerConfig;
use crate::dispatcher::Dispatcher;
use crate::handlers::HandlerRegistry;
use crate::queue::QueueHandle;
use crate::store::Store;
use crate::worker::{self, Scheduler};

/// The running queue: owning actor plus retry scheduler.
pub struct QueueService {
    queue: QueueHandle,
    scheduler: Arc<Scheduler>,
    shutdown_tx: watch::Sender<bool>,
    scheduler_join: JoinHandle<()>,
    actor_join: JoinHandle<()>,
}

impl QueueService {
    pub async fn start(
        config: &SchedulerConfig,
        store: Arc<dyn Store>,
        registry: HandlerRegistry,
        escalator: Escalator,
    ) -> Result<Self, String> {
        config.validate()?;

        let (queue, actor_join) =
            QueueHandle::spawn(store, config.max_retries, config.retention).await;

        let dispatcher = Dispatcher::new(Arc::new(registry), config.dispatch_timeout);
        tracing::info!(
            "Dispatching sources: [{}]",
            dispatcher.registry().sources().join(", ")
        );
        if escalator.is_empty() {
            tracing::warn!("No alert channel configured, escalations will only be logged");
        }

        let scheduler = Arc::new(Scheduler::new(queue.clone(), dispatcher, escalator));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler_join = worker::spawn(
            Arc::clone(&scheduler),
            config,
            queue.wake(),
            shutdown_rx,
        );

        Ok(Self {
            queue,
            scheduler,
            shutdown_tx,
            scheduler_join,
            actor_join,
        })
    }

    pub fn handle(&self) -> QueueHandle {
        self.queue.clone()
    }

    pub fn scheduler(&self) -> Arc<Scheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Stop future ticks, wait for an in-flight scan, persist once more and
    /// stop the actor.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.scheduler_join.await {
            tracing::error!("Retry scheduler task failed: {e}");
        }

        if let Err(e) = self.queue.close().await {
            tracing::warn!("Final persist skipped: {e}");
        }
        let _ = self.actor_join.await;
        tracing::info!("Webhook queue stopped");
    }
}

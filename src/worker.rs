//! Retry scheduler.
//!
//! Every tick retries *all* pending items still inside their budget, with no
//! per-item backoff. A scan that finds another one in flight is skipped, not
//! queued. Items within a scan are dispatched one at a time in insertion order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Notify, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::alerts::Escalator;
use crate::config::SchedulerConfig;
use crate::dispatcher::Dispatcher;
use crate::queue::{Applied, QueueHandle};

/// `interval_at` panics on a zero period.
const MIN_INTERVAL: std::time::Duration = std::time::Duration::from_millis(1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub attempted: usize,
    pub completed: usize,
    pub retrying: usize,
    pub exhausted: usize,
    pub swept: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Another scan was already running.
    Skipped,
    Ran(ScanReport),
}

pub struct Scheduler {
    queue: QueueHandle,
    dispatcher: Dispatcher,
    escalator: Escalator,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the scan ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Scheduler {
    pub fn new(queue: QueueHandle, dispatcher: Dispatcher, escalator: Escalator) -> Self {
        Self {
            queue,
            dispatcher,
            escalator,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one pass over the pending items, then sweep and persist once.
    pub async fn scan(&self) -> ScanOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Scan already in flight, skipping tick");
            return ScanOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        let mut report = ScanReport::default();

        let pending = match self.queue.pending_snapshot().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!("Scan aborted: {e}");
                return ScanOutcome::Ran(report);
            }
        };

        for item in pending {
            report.attempted += 1;
            tracing::debug!(
                item_id = %item.id,
                source = %item.source,
                retries = item.retries,
                "Dispatching webhook"
            );

            let outcome = self
                .dispatcher
                .dispatch(&item)
                .await
                .map_err(|e| e.to_string());

            if let Err(ref error) = outcome {
                tracing::warn!(item_id = %item.id, source = %item.source, "Webhook attempt failed: {error}");
            }

            match self.queue.apply(item.id.clone(), outcome).await {
                Ok(Applied::Completed) => report.completed += 1,
                Ok(Applied::Retrying { .. }) => report.retrying += 1,
                Ok(Applied::Exhausted(alert)) => {
                    report.exhausted += 1;
                    self.escalator.escalate(&alert).await;
                }
                Ok(Applied::Stale) => {
                    tracing::debug!(item_id = %item.id, "Item changed during dispatch, outcome dropped");
                }
                Err(e) => {
                    tracing::error!("Scan aborted: {e}");
                    return ScanOutcome::Ran(report);
                }
            }
        }

        match self.queue.finish_scan().await {
            Ok(swept) => report.swept = swept,
            Err(e) => tracing::error!("Failed to finish scan: {e}"),
        }

        if report.attempted > 0 || report.swept > 0 {
            tracing::info!(
                attempted = report.attempted,
                completed = report.completed,
                retrying = report.retrying,
                exhausted = report.exhausted,
                swept = report.swept,
                "Scan finished"
            );
        }

        ScanOutcome::Ran(report)
    }
}

/// Drive `scheduler` on a fixed interval until `shutdown` flips. One extra
/// scan runs `startup_delay` after start, and one more whenever `wake` fires.
pub fn spawn(
    scheduler: Arc<Scheduler>,
    config: &SchedulerConfig,
    wake: Arc<Notify>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let interval = if config.interval.is_zero() {
        tracing::error!("Scheduler interval is zero, using {MIN_INTERVAL:?}");
        MIN_INTERVAL
    } else {
        config.interval
    };
    let startup_delay = config.startup_delay;
    tokio::spawn(run(scheduler, interval, startup_delay, wake, shutdown))
}

async fn run(
    scheduler: Arc<Scheduler>,
    interval: std::time::Duration,
    startup_delay: std::time::Duration,
    wake: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(
        "Retry scheduler started (interval={}s, startup scan in {}s)",
        interval.as_secs_f64(),
        startup_delay.as_secs_f64()
    );

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let startup = tokio::time::sleep(startup_delay);
    tokio::pin!(startup);
    let mut started = false;

    let mut scans = JoinSet::new();

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = &mut startup, if !started => {
                started = true;
            }
            _ = ticker.tick() => {}
            _ = wake.notified() => {
                tracing::debug!("Out-of-band scan requested");
            }
            Some(_) = scans.join_next(), if !scans.is_empty() => continue,
        }

        let scheduler = Arc::clone(&scheduler);
        scans.spawn(async move { scheduler.scan().await });
    }

    while scans.join_next().await.is_some() {}

    tracing::info!("Retry scheduler stopped");
}

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use webhook_queue::alerts::{AlertError, AlertSink, Escalator};
use webhook_queue::config::SchedulerConfig;
use webhook_queue::handlers::{HandlerError, HandlerRegistry, SourceHandler};
use webhook_queue::models::{EscalationAlert, ItemStatus, QueueItem};
use webhook_queue::queue::QueueHandle;
use webhook_queue::store::Store;
use webhook_queue::QueueService;

const LONG: Duration = Duration::from_secs(3600);

/// Handler that fails until its `succeed_on`-th call (1-based), or forever.
pub struct ScriptedHandler {
    source: String,
    succeed_on: Option<usize>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedHandler {
    pub fn always_fails(source: &str) -> Arc<Self> {
        Arc::new(Self::build(source, None, Duration::ZERO))
    }

    pub fn succeeds_on(source: &str, call: usize) -> Arc<Self> {
        Arc::new(Self::build(source, Some(call), Duration::ZERO))
    }

    pub fn slow(source: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(source, Some(1), delay))
    }

    fn build(source: &str, succeed_on: Option<usize>, delay: Duration) -> Self {
        Self {
            source: source.to_string(),
            succeed_on,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceHandler for ScriptedHandler {
    fn source(&self) -> &str {
        &self.source
    }

    async fn process(&self, _data: &serde_json::Value) -> Result<(), HandlerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.succeed_on {
            Some(n) if call >= n => Ok(()),
            _ => Err(format!("downstream unavailable (call {call})").into()),
        }
    }
}

pub fn as_dyn(handler: &Arc<ScriptedHandler>) -> Arc<dyn SourceHandler> {
    handler.clone()
}

#[derive(Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<EscalationAlert>>,
}

impl RecordingSink {
    pub fn alerts(&self) -> Vec<EscalationAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn send(&self, alert: &EscalationAlert) -> Result<(), AlertError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

/// Scheduler config whose timers never fire on their own; tests drive scans.
pub fn manual_config(max_retries: u32) -> SchedulerConfig {
    SchedulerConfig {
        interval: LONG,
        startup_delay: LONG,
        max_retries,
        dispatch_timeout: Duration::from_secs(5),
        ..SchedulerConfig::default()
    }
}

pub fn registry(handlers: Vec<Arc<dyn SourceHandler>>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for handler in handlers {
        registry.register(handler);
    }
    registry
}

pub struct TestQueue {
    pub service: QueueService,
    pub alerts: Arc<RecordingSink>,
}

impl TestQueue {
    pub fn queue(&self) -> QueueHandle {
        self.service.handle()
    }
}

pub async fn start(
    config: &SchedulerConfig,
    store: Arc<dyn Store>,
    handlers: Vec<Arc<dyn SourceHandler>>,
) -> TestQueue {
    let alerts = Arc::new(RecordingSink::default());
    let escalator = Escalator::new(vec![alerts.clone() as Arc<dyn AlertSink>]);
    let service = QueueService::start(config, store, registry(handlers), escalator)
        .await
        .expect("scheduler config is valid");
    TestQueue { service, alerts }
}

/// Unique, not-yet-existing path for a queue document.
pub fn temp_store_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("webhook_queue_test_{}", Uuid::now_v7().simple()))
        .join("queue.json")
}

pub async fn cleanup_path(path: &PathBuf) {
    if let Some(dir) = path.parent() {
        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}

pub async fn find(queue: &QueueHandle, id: &str) -> QueueItem {
    queue
        .export()
        .await
        .unwrap()
        .into_iter()
        .find(|i| i.id == id)
        .expect("item exists")
}

/// Poll until the item reaches `status` or `timeout` elapses.
pub async fn wait_for_status(
    queue: &QueueHandle,
    id: &str,
    status: ItemStatus,
    timeout: Duration,
) -> QueueItem {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let item = find(queue, id).await;
        if item.status == status {
            return item;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "item {id} still {:?} after {timeout:?}",
            item.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Assert the timestamp/status invariants hold for every item.
pub fn assert_invariants(items: &[QueueItem], max_retries: u32) {
    for item in items {
        assert!(item.retries <= max_retries, "{} over budget", item.id);
        match item.status {
            ItemStatus::Completed => {
                assert!(item.completed_at.is_some() && item.failed_at.is_none())
            }
            ItemStatus::Failed => {
                assert!(item.failed_at.is_some() && item.completed_at.is_none())
            }
            ItemStatus::Pending => {
                assert!(item.completed_at.is_none() && item.failed_at.is_none())
            }
        }
    }
}

/// Serve `app` on a random local port.
pub async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    addr
}

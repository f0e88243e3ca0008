mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use common::{RecordingSink, ScriptedHandler, as_dyn};
use webhook_queue::alerts::{AlertError, AlertSink, Escalator, summary};
use webhook_queue::dispatcher::{DispatchError, Dispatcher};
use webhook_queue::handlers::HandlerError;
use webhook_queue::models::{EnqueueRequest, EscalationAlert, QueueItem};

fn dispatcher() -> Dispatcher {
    let registry = common::registry(vec![
        as_dyn(&ScriptedHandler::succeeds_on("echo", 1)),
        as_dyn(&ScriptedHandler::always_fails("broken")),
        as_dyn(&ScriptedHandler::slow("hang", Duration::from_secs(3600))),
    ]);
    Dispatcher::new(Arc::new(registry), Duration::from_millis(50))
}

fn item(source: &str) -> QueueItem {
    QueueItem::new(
        "wh_1_x".to_string(),
        EnqueueRequest::new(source, "t", json!({})),
        Utc::now(),
    )
}

fn alert() -> EscalationAlert {
    EscalationAlert {
        id: "wh_1_abc".into(),
        source: "sms".into(),
        kind: "inbound".into(),
        retries: 5,
        last_error: Some("503".into()),
    }
}

// ── Dispatcher ──────────────────────────────────────────────────

#[tokio::test]
async fn routes_to_registered_handler() {
    dispatcher().dispatch(&item("echo")).await.unwrap();
}

#[tokio::test]
async fn handler_error_propagates() {
    let err = dispatcher().dispatch(&item("broken")).await.unwrap_err();
    assert!(matches!(err, DispatchError::Handler(ref m) if m.contains("downstream unavailable")));
}

#[tokio::test]
async fn unknown_source_is_typed_error() {
    let err = dispatcher().dispatch(&item("fax")).await.unwrap_err();
    assert!(matches!(err, DispatchError::UnknownSource(ref s) if s == "fax"));
    assert!(err.to_string().contains("fax"));
}

#[tokio::test]
async fn hung_handler_hits_deadline() {
    let err = dispatcher().dispatch(&item("hang")).await.unwrap_err();
    assert!(matches!(err, DispatchError::TimedOut(_)));
}

// ── Registry ────────────────────────────────────────────────────

#[test]
fn registry_looks_up_by_source() {
    let registry = common::registry(vec![
        as_dyn(&ScriptedHandler::always_fails("sms")),
        as_dyn(&ScriptedHandler::always_fails("calendar")),
    ]);

    assert!(registry.get("sms").is_some());
    assert!(registry.get("slack").is_none());
    assert_eq!(registry.sources(), vec!["calendar", "sms"]);
}

#[test]
fn later_registration_replaces_earlier() {
    let first = ScriptedHandler::always_fails("sms");
    let second = ScriptedHandler::succeeds_on("sms", 1);
    let registry = common::registry(vec![as_dyn(&first), as_dyn(&second)]);

    assert_eq!(registry.sources(), vec!["sms"]);
    let handler = registry.get("sms").expect("registered");
    assert!(Arc::ptr_eq(handler, &as_dyn(&second)));
}

#[test]
fn handler_error_from_str() {
    let err = HandlerError::from("nope");
    assert_eq!(err.to_string(), "nope");
}

// ── Escalation ──────────────────────────────────────────────────

struct Broken(Mutex<usize>);

#[async_trait]
impl AlertSink for Broken {
    async fn send(&self, _alert: &EscalationAlert) -> Result<(), AlertError> {
        *self.0.lock().unwrap() += 1;
        Err(AlertError::new("test", "down"))
    }
}

#[tokio::test]
async fn broken_sink_does_not_stop_the_others() {
    let broken = Arc::new(Broken(Mutex::new(0)));
    let recording = Arc::new(RecordingSink::default());
    let escalator = Escalator::new(vec![
        broken.clone() as Arc<dyn AlertSink>,
        recording.clone() as Arc<dyn AlertSink>,
    ]);

    escalator.escalate(&alert()).await;

    assert_eq!(*broken.0.lock().unwrap(), 1);
    assert_eq!(recording.alerts(), vec![alert()]);
}

#[test]
fn summary_mentions_item_and_error() {
    let text = summary(&alert());
    assert!(text.contains("wh_1_abc"));
    assert!(text.contains("source=sms"));
    assert!(text.contains("503"));
}

#[test]
fn alert_error_names_channel() {
    let err = AlertError::new("slack", "timeout");
    assert_eq!(err.to_string(), "slack alert failed: timeout");
}

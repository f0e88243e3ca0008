pub mod alerts;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod models;
pub mod queue;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::alerts::{AlertSink, Escalator, MailAlertSink, SlackAlertSink};
use crate::config::Config;
use crate::handlers::HandlerRegistry;
use crate::handlers::forward::ForwardHandler;
use crate::queue::QueueHandle;
use crate::state::{AppState, SharedState};

pub use crate::service::QueueService;

pub fn build_app(queue: QueueHandle) -> Router {
    let state: SharedState = Arc::new(AppState { queue });

    Router::new()
        .merge(routes::api_routes())
        .merge(routes::ingest_routes())
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Forward handlers for every `source=url` pair in the config.
pub fn build_registry(config: &Config, client: &reqwest::Client) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for (source, url) in &config.forward_targets {
        registry.register(Arc::new(ForwardHandler::new(
            source.clone(),
            url.clone(),
            client.clone(),
        )));
    }
    registry
}

pub fn build_escalator(config: &Config, client: &reqwest::Client) -> Escalator {
    let mut sinks: Vec<Arc<dyn AlertSink>> = Vec::new();

    if let Some(url) = &config.alert_webhook_url {
        sinks.push(Arc::new(SlackAlertSink::new(url.clone(), client.clone())));
    }

    if let Some(smtp) = &config.smtp {
        match MailAlertSink::new(smtp, config.scheduler.dispatch_timeout) {
            Ok(sink) => {
                tracing::info!("Alert SMTP configured");
                sinks.push(Arc::new(sink));
            }
            Err(e) => tracing::warn!("Alert SMTP not available: {e}"),
        }
    }

    Escalator::new(sinks)
}

async fn health() -> &'static str {
    "ok"
}

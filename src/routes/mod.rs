pub mod ingest;
pub mod queue;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/queue", post(queue::enqueue))
        .route("/api/v1/queue/stats", get(queue::stats))
        .route("/api/v1/queue/retry-all", post(queue::retry_all))
        .route("/api/v1/queue/export", get(queue::export))
}

pub fn ingest_routes() -> Router<SharedState> {
    Router::new().route("/webhooks/{source}", post(ingest::ingest))
}

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::{EnqueueRequest, QueueItem, QueueStats};
use crate::state::SharedState;

pub async fn enqueue(
    State(state): State<SharedState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let id = state.queue.enqueue(req).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

pub async fn stats(State(state): State<SharedState>) -> Result<Json<QueueStats>, AppError> {
    Ok(Json(state.queue.stats().await?))
}

pub async fn retry_all(State(state): State<SharedState>) -> Result<Json<Value>, AppError> {
    let reset = state.queue.retry_all().await?;
    Ok(Json(json!({ "reset": reset })))
}

pub async fn export(State(state): State<SharedState>) -> Result<Json<Vec<QueueItem>>, AppError> {
    Ok(Json(state.queue.export().await?))
}

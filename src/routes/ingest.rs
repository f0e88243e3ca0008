use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::EnqueueRequest;
use crate::state::SharedState;

const DEFAULT_TYPE: &str = "webhook";

/// Provider callback: the path names the source, the body is the payload.
pub async fn ingest(
    State(state): State<SharedState>,
    Path(source): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let request = into_request(source, body);
    let id = state.queue.enqueue(request).await?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}

fn into_request(source: String, body: Value) -> EnqueueRequest {
    match body {
        Value::Object(mut map) => {
            let kind = match map.remove("type") {
                Some(Value::String(kind)) if !kind.is_empty() => kind,
                _ => DEFAULT_TYPE.to_string(),
            };
            map.remove("source");
            EnqueueRequest::new(source, kind, Value::Object(map))
        }
        other => EnqueueRequest::new(source, DEFAULT_TYPE, other),
    }
}

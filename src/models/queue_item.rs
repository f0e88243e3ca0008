use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Completed,
    Failed,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ItemStatus::Pending)
    }
}

/// One inbound callback awaiting (or done with) processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub status: ItemStatus,
    #[serde(default)]
    pub retries: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_retry_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    pub fn new(id: String, request: EnqueueRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            source: request.source,
            kind: request.kind,
            payload: serde_json::Value::Object(request.data),
            status: ItemStatus::Pending,
            retries: 0,
            created_at: now,
            last_retry_at: None,
            last_error: None,
            completed_at: None,
            failed_at: None,
        }
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = ItemStatus::Completed;
        self.completed_at = Some(now);
    }

    /// Record a failed attempt. Returns true when this attempt exhausted the budget.
    pub fn record_failure(&mut self, error: String, max_retries: u32, now: DateTime<Utc>) -> bool {
        self.retries += 1;
        self.last_retry_at = Some(now);
        self.last_error = Some(error);

        if self.retries >= max_retries {
            self.status = ItemStatus::Failed;
            self.failed_at = Some(now);
            return true;
        }
        false
    }

    /// Admin reset back to a fresh pending item. Returns false for completed items.
    pub fn reset(&mut self) -> bool {
        if self.status == ItemStatus::Completed {
            return false;
        }
        self.status = ItemStatus::Pending;
        self.retries = 0;
        self.last_error = None;
        self.failed_at = None;
        true
    }
}

/// Input accepted by `enqueue`: `{source, type, ...data}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    #[serde(default)]
    pub source: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl EnqueueRequest {
    pub fn new(source: impl Into<String>, kind: impl Into<String>, data: serde_json::Value) -> Self {
        let data = match data {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        Self {
            source: source.into(),
            kind: kind.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub queue: Vec<QueueItem>,
}

impl QueueStats {
    pub fn from_items(items: &[QueueItem]) -> Self {
        let mut stats = QueueStats {
            total: items.len(),
            queue: items.to_vec(),
            ..Default::default()
        };
        for item in items {
            match item.status {
                ItemStatus::Pending => stats.pending += 1,
                ItemStatus::Completed => stats.completed += 1,
                ItemStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

/// Operator notification sent once an item exhausts its retry budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EscalationAlert {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub retries: u32,
    pub last_error: Option<String>,
}

impl From<&QueueItem> for EscalationAlert {
    fn from(item: &QueueItem) -> Self {
        Self {
            id: item.id.clone(),
            source: item.source.clone(),
            kind: item.kind.clone(),
            retries: item.retries,
            last_error: item.last_error.clone(),
        }
    }
}

use chrono::{DateTime, Duration, Utc};

use crate::models::QueueItem;

pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Drop terminal items older than `retention`. Pending items are kept no
/// matter their age. Returns the number of items removed.
pub fn sweep(items: &mut Vec<QueueItem>, now: DateTime<Utc>, retention: Duration) -> usize {
    let before = items.len();
    items.retain(|item| !(item.status.is_terminal() && now - item.created_at > retention));
    before - items.len()
}

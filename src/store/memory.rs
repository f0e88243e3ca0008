use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{Store, StoreError};
use crate::models::QueueItem;

/// Volatile store, mainly for tests. Writes can be forced to fail.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<Vec<QueueItem>>,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<QueueItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Default::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.items
            .lock()
            .map(|items| items.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load(&self) -> Result<Vec<QueueItem>, StoreError> {
        self.items
            .lock()
            .map(|items| items.clone())
            .map_err(|e| StoreError::Read(e.to_string()))
    }

    async fn save(&self, items: &[QueueItem]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("writes disabled".to_string()));
        }
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StoreError::Write(e.to_string()))?;
        *guard = items.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

//! Durable storage for the queue collection.
//!
//! The store is only ever touched by the queue actor, which owns the single
//! writer role. Implementations just move whole collections in and out.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::models::QueueItem;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read queue document: {0}")]
    Read(String),
    #[error("failed to write queue document: {0}")]
    Write(String),
    #[error("failed to encode queue document: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Load the full collection in insertion order. A missing document is an
    /// empty collection, not an error.
    async fn load(&self) -> Result<Vec<QueueItem>, StoreError>;

    /// Replace the persisted collection.
    async fn save(&self, items: &[QueueItem]) -> Result<(), StoreError>;
}

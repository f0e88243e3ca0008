pub mod queue_item;

pub use queue_item::{EnqueueRequest, EscalationAlert, ItemStatus, QueueItem, QueueStats};

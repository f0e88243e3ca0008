use std::sync::Arc;
use std::time::Duration;

use crate::handlers::HandlerRegistry;
use crate::models::QueueItem;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no handler registered for source '{0}'")]
    UnknownSource(String),
    #[error("{0}")]
    Handler(String),
    #[error("handler timed out after {0:?}")]
    TimedOut(Duration),
}

/// Routes an item to the handler registered for its source.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, item: &QueueItem) -> Result<(), DispatchError> {
        let handler = self
            .registry
            .get(&item.source)
            .ok_or_else(|| DispatchError::UnknownSource(item.source.clone()))?;

        match tokio::time::timeout(self.timeout, handler.process(&item.payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DispatchError::Handler(e.message)),
            Err(_) => Err(DispatchError::TimedOut(self.timeout)),
        }
    }
}

pub mod forward;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

#[derive(Debug)]
pub struct HandlerError {
    pub message: String,
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<String> for HandlerError {
    fn from(s: String) -> Self {
        HandlerError { message: s }
    }
}

impl From<&str> for HandlerError {
    fn from(s: &str) -> Self {
        HandlerError {
            message: s.to_string(),
        }
    }
}

/// Downstream collaborator that processes callbacks for one source.
#[async_trait]
pub trait SourceHandler: Send + Sync {
    /// Source tag this handler is registered under.
    fn source(&self) -> &str;

    async fn process(&self, data: &serde_json::Value) -> Result<(), HandlerError>;
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn SourceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its source tag. Last registration wins.
    pub fn register(&mut self, handler: Arc<dyn SourceHandler>) {
        let source = handler.source().to_string();
        if self.handlers.insert(source.clone(), handler).is_some() {
            tracing::warn!("Handler for source '{source}' replaced");
        }
    }

    pub fn get(&self, source: &str) -> Option<&Arc<dyn SourceHandler>> {
        self.handlers.get(source)
    }

    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        sources.sort_unstable();
        sources
    }
}

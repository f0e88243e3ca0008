use std::sync::Arc;

use crate::queue::QueueHandle;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub queue: QueueHandle,
}

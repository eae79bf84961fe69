//! Shared application state for the HTTP layer.

use crate::dispatch::Dispatcher;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// Upper bound on request body size, enforced before dispatch.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, max_body_bytes: usize) -> Self {
        AppState {
            dispatcher: Arc::new(dispatcher),
            max_body_bytes,
        }
    }
}

//! HTTP API for the completion proxy

mod handlers;
pub mod types;

pub use handlers::create_router;

use crate::proxy::CompletionProxy;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<CompletionProxy>,
}

impl AppState {
    pub fn new(proxy: CompletionProxy) -> Self {
        Self {
            proxy: Arc::new(proxy),
        }
    }
}

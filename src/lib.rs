pub mod config;
pub mod engine;
pub mod rest;
pub mod retry;
pub mod store;
pub mod task;

use std::sync::Arc;
use std::time::Instant;

use engine::TaskEngine;

/// Shared state handed to every HTTP handler.
pub struct AppContext {
    pub engine: TaskEngine,
    pub started_at: Instant,
}

impl AppContext {
    pub fn new(engine: TaskEngine) -> Arc<Self> {
        Arc::new(Self {
            engine,
            started_at: Instant::now(),
        })
    }
}

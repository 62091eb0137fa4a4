use std::sync::Arc;

use crate::services::{InferencePipeline, ModelLoader};

/// Shared application state for API handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Per-request transform over the shared artifact
    pub pipeline: InferencePipeline,

    /// Largest accepted `/invocations` body in bytes
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(loader: Arc<ModelLoader>, max_body_bytes: usize) -> Self {
        Self {
            pipeline: InferencePipeline::new(loader),
            max_body_bytes,
        }
    }
}

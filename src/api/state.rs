//! Application state for the API server

use crate::{Config, Pipeline};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; both fields are `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// The pipeline handling webhook updates and worker runs
    pub pipeline: Arc<Pipeline>,

    /// Configuration (secrets, limits)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(pipeline: Arc<Pipeline>, config: Arc<Config>) -> Self {
        Self { pipeline, config }
    }
}

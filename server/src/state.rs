//! Application state for the Otosearch server.
//!
//! Everything here is built once in `main` and shared read-only across
//! requests: the recognition pipeline (model + label table) and the
//! optional specification store client.

use std::sync::Arc;
use std::time::Instant;

use otosearch_specs::SpecStore;
use otosearch_vision::RecognitionPipeline;

/// Immutable shared state.
pub struct AppState {
    /// The composed recognition pipeline
    pub pipeline: Arc<RecognitionPipeline>,
    /// Specification store; absent when no store is configured or the
    /// connection failed at startup (lookups then use the fallback)
    pub store: Option<Arc<dyn SpecStore>>,
    /// Server start time, for the health endpoint
    started: Instant,
}

impl AppState {
    pub fn new(pipeline: RecognitionPipeline, store: Option<Arc<dyn SpecStore>>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store,
            started: Instant::now(),
        }
    }

    /// Seconds since the server came up.
    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Shared handle passed to every route handler.
pub type SharedState = Arc<AppState>;

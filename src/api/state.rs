use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::IngestionPipeline;
use crate::preferences::PreferenceBook;
use crate::query::AlertQueryService;

/// Shared by every request. Both services hold the same alert store, and the preference
/// book is the one the pipeline reads thresholds from.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub queries: Arc<AlertQueryService>,
    pub preferences: Arc<PreferenceBook>,
    pub version: String
}

impl AppState {
    pub fn new(pipeline: Arc<IngestionPipeline>, queries: Arc<AlertQueryService>) -> Self {
        Self {
            preferences: pipeline.preferences().clone(),
            pipeline,
            queries,
            version: env!("CARGO_PKG_VERSION").to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub address: SocketAddr,
    pub enable_cors: bool,
    /// Upper bound for a whole request, above the per-call scorer and store timeouts.
    pub request_timeout: Duration,
    pub body_limit: usize
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            enable_cors: true,
            request_timeout: Duration::from_secs(120),
            body_limit: 32 * 1024 * 1024
        }
    }
}

mod error;
mod handlers;
mod server;
mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiResult;
pub use server::run_server;
pub use state::{AppState, ServerSettings};

/// Builds the HTTP surface consumed by the dashboard.
pub fn create_router(state: AppState, settings: &ServerSettings) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/processing/file", post(handlers::process_file))
        .route("/alerts", get(handlers::list_alerts))
        .route("/preferences/{iban}", get(handlers::get_preference)
            .put(handlers::put_preference)
            .delete(handlers::delete_preference))
        .layer(DefaultBodyLimit::max(settings.body_limit))
        .layer(TimeoutLayer::new(settings.request_timeout))
        .layer(TraceLayer::new_for_http());

    if settings.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

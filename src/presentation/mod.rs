// Presentation layer - HTTP routing and handlers
pub mod api_error;
pub mod app_state;
pub mod handlers;
pub mod payload;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{health_check, query_readings, submit_reading};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/query", get(query_readings))
        .route("/api/restricted/submit/:device", post(submit_reading))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

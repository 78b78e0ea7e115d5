//! HTTP surface for the hosting display
//!
//! REST control endpoints under `/api/v1`, an SSE event stream, and the
//! display page served at `/`.

pub mod display;
pub mod error;
pub mod handlers;
pub mod sse;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::playback::PlaybackEngine;

pub use error::{ApiError, ApiResult};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Playback engine
    pub engine: PlaybackEngine,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(display::display_page))
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                .route("/player/status", get(handlers::get_status))
                .route("/player/current", get(handlers::get_current))
                .route("/player/start", post(handlers::start))
                .route("/player/reload", post(handlers::reload))
                .route("/player/next", post(handlers::next))
                .route("/player/stop", post(handlers::stop))
                .route("/events", get(sse::event_stream)),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "totem-player",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
    }))
}

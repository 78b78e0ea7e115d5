//! HTTP request handlers
//!
//! Thin wrappers over [`PlaybackEngine`](crate::playback::PlaybackEngine);
//! every response carries the player view after the operation.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use totem_common::PlayerView;

use super::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    device_id: String,
}

#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    index: usize,
    player: PlayerView,
}

/// GET /api/v1/player/status
pub async fn get_status(State(state): State<AppState>) -> Json<PlayerView> {
    Json(state.engine.view().await)
}

/// GET /api/v1/player/current
///
/// 204 when there is nothing to show.
pub async fn get_current(State(state): State<AppState>) -> Response {
    match state.engine.current_item().await {
        Some(item) => Json(item).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// POST /api/v1/player/start
pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> ApiResult<Json<PlayerView>> {
    info!("Start requested for device {}", req.device_id);
    state.engine.start(&req.device_id).await?;
    Ok(Json(state.engine.view().await))
}

/// POST /api/v1/player/reload
pub async fn reload(State(state): State<AppState>) -> ApiResult<Json<PlayerView>> {
    state.engine.reload().await?;
    Ok(Json(state.engine.view().await))
}

/// POST /api/v1/player/next
pub async fn next(State(state): State<AppState>) -> ApiResult<Json<AdvanceResponse>> {
    let index = state.engine.advance().await?;
    Ok(Json(AdvanceResponse {
        index,
        player: state.engine.view().await,
    }))
}

/// POST /api/v1/player/stop
pub async fn stop(State(state): State<AppState>) -> Json<PlayerView> {
    state.engine.stop().await;
    Json(state.engine.view().await)
}

use axum::extract::State;
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::middleware::auth::AdminUser;
use crate::models::config::{UpdateMapConfig, TILE_PRESETS};
use crate::state::AppState;

pub async fn get_config(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let config = db::config::get_config(&state.db).await?;
    Ok(Json(serde_json::json!({ "data": config })))
}

pub async fn update_config(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<UpdateMapConfig>,
) -> Result<Json<serde_json::Value>, AppError> {
    let config = db::config::upsert_config(&state.db, &input).await?;
    tracing::info!(
        zoom = config.zoom,
        center_lat = config.center_lat,
        center_lng = config.center_lng,
        "map config updated"
    );
    Ok(Json(serde_json::json!({ "data": config })))
}

pub async fn list_tile_presets() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "data": TILE_PRESETS }))
}

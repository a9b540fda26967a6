use axum::extract::{Path, State};
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::middleware::auth::AdminUser;
use crate::models::pinpoint::{CreatePinpoint, UpdatePinpoint};
use crate::state::AppState;

pub async fn list_pinpoints(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pinpoints = db::pinpoints::list_pinpoints(&state.db).await?;
    Ok(Json(serde_json::json!({ "data": pinpoints })))
}

pub async fn get_pinpoint(
    State(state): State<AppState>,
    Path(pinpoint_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pinpoint = db::pinpoints::get_pinpoint(&state.db, pinpoint_id).await?;
    Ok(Json(serde_json::json!({ "data": pinpoint })))
}

pub async fn create_pinpoint(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<CreatePinpoint>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pinpoint = db::pinpoints::create_pinpoint(&state.db, &input).await?;
    tracing::info!(id = pinpoint.id, title = %pinpoint.title, "pinpoint created");
    Ok(Json(serde_json::json!({ "data": pinpoint })))
}

pub async fn update_pinpoint(
    State(state): State<AppState>,
    Path(pinpoint_id): Path<i64>,
    _admin: AdminUser,
    Json(input): Json<UpdatePinpoint>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pinpoint = db::pinpoints::update_pinpoint(&state.db, pinpoint_id, &input).await?;
    tracing::info!(id = pinpoint_id, "pinpoint updated");
    Ok(Json(serde_json::json!({ "data": pinpoint })))
}

pub async fn delete_pinpoint(
    State(state): State<AppState>,
    Path(pinpoint_id): Path<i64>,
    _admin: AdminUser,
) -> Result<Json<serde_json::Value>, AppError> {
    db::pinpoints::delete_pinpoint(&state.db, pinpoint_id).await?;
    tracing::info!(id = pinpoint_id, "pinpoint deleted");
    Ok(Json(serde_json::json!({ "data": null })))
}

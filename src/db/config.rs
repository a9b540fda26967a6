use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::config::{MapConfig, UpdateMapConfig};

type ConfigRow = (String, f64, f64, i64, i64, i64, String, String);

const SELECT_CONFIG: &str =
    "SELECT tile_layer_url, center_lat, center_lng, zoom, min_zoom, max_zoom, attribution, updated_at FROM map_config WHERE id = 1";

fn row_to_config(row: ConfigRow) -> MapConfig {
    MapConfig {
        tile_layer_url: row.0,
        center_lat: row.1,
        center_lng: row.2,
        zoom: row.3,
        min_zoom: row.4,
        max_zoom: row.5,
        attribution: row.6,
        updated_at: Some(row.7),
    }
}

/// Read the persisted config, falling back to the built-in default when no row
/// exists yet.
pub async fn get_config(pool: &SqlitePool) -> Result<MapConfig, AppError> {
    let row = sqlx::query_as::<_, ConfigRow>(SELECT_CONFIG)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(row_to_config).unwrap_or_default())
}

/// Merge `input` over the current config and persist the result as the
/// singleton row.
pub async fn upsert_config(
    pool: &SqlitePool,
    input: &UpdateMapConfig,
) -> Result<MapConfig, AppError> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, ConfigRow>(SELECT_CONFIG)
        .fetch_optional(&mut *tx)
        .await?
        .map(row_to_config)
        .unwrap_or_default();

    let merged = current.merged(input)?;

    sqlx::query(
        "INSERT INTO map_config (id, tile_layer_url, center_lat, center_lng, zoom, min_zoom, max_zoom, attribution, updated_at)
         VALUES (1, ?, ?, ?, ?, ?, ?, ?, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
           tile_layer_url = excluded.tile_layer_url,
           center_lat = excluded.center_lat,
           center_lng = excluded.center_lng,
           zoom = excluded.zoom,
           min_zoom = excluded.min_zoom,
           max_zoom = excluded.max_zoom,
           attribution = excluded.attribution,
           updated_at = datetime('now')",
    )
    .bind(merged.tile_layer_url.trim())
    .bind(merged.center_lat)
    .bind(merged.center_lng)
    .bind(merged.zoom)
    .bind(merged.min_zoom)
    .bind(merged.max_zoom)
    .bind(&merged.attribution)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    get_config(pool).await
}

/// Insert the default config row if none exists. Returns true if a row was
/// written.
pub async fn ensure_default_config(pool: &SqlitePool) -> Result<bool, AppError> {
    let defaults = MapConfig::default();
    let result = sqlx::query(
        "INSERT OR IGNORE INTO map_config (id, tile_layer_url, center_lat, center_lng, zoom, min_zoom, max_zoom, attribution)
         VALUES (1, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&defaults.tile_layer_url)
    .bind(defaults.center_lat)
    .bind(defaults.center_lng)
    .bind(defaults.zoom)
    .bind(defaults.min_zoom)
    .bind(defaults.max_zoom)
    .bind(&defaults.attribution)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::pinpoint::{CreatePinpoint, Pinpoint, UpdatePinpoint, DEFAULT_ICON};

type PinpointRow = (i64, f64, f64, String, String, String, String, String, String);

const SELECT_COLUMNS: &str =
    "SELECT id, latitude, longitude, title, description, sound_url, icon, created_at, updated_at FROM pinpoints";

fn row_to_pinpoint(row: PinpointRow) -> Pinpoint {
    Pinpoint {
        id: row.0,
        latitude: row.1,
        longitude: row.2,
        title: row.3,
        description: row.4,
        sound_url: row.5,
        icon: row.6,
        created_at: row.7,
        updated_at: row.8,
    }
}

pub async fn get_pinpoint(pool: &SqlitePool, pinpoint_id: i64) -> Result<Pinpoint, AppError> {
    let row = sqlx::query_as::<_, PinpointRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(pinpoint_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("unknown_pinpoint".to_string()))?;

    Ok(row_to_pinpoint(row))
}

pub async fn list_pinpoints(pool: &SqlitePool) -> Result<Vec<Pinpoint>, AppError> {
    let rows = sqlx::query_as::<_, PinpointRow>(&format!(
        "{SELECT_COLUMNS} ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_pinpoint).collect())
}

pub async fn create_pinpoint(
    pool: &SqlitePool,
    input: &CreatePinpoint,
) -> Result<Pinpoint, AppError> {
    input.validate()?;

    let result = sqlx::query(
        "INSERT INTO pinpoints (latitude, longitude, title, description, sound_url, icon) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(input.latitude)
    .bind(input.longitude)
    .bind(input.title.trim())
    .bind(input.description.as_deref().unwrap_or(""))
    .bind(input.sound_url.trim())
    .bind(input.icon.as_deref().unwrap_or(DEFAULT_ICON))
    .execute(pool)
    .await?;

    get_pinpoint(pool, result.last_insert_rowid()).await
}

/// Apply a partial update in a single statement. Absent fields keep their
/// stored value.
pub async fn update_pinpoint(
    pool: &SqlitePool,
    pinpoint_id: i64,
    input: &UpdatePinpoint,
) -> Result<Pinpoint, AppError> {
    input.validate()?;

    if input.is_empty() {
        return get_pinpoint(pool, pinpoint_id).await;
    }

    let result = sqlx::query(
        "UPDATE pinpoints SET
           latitude = COALESCE(?, latitude),
           longitude = COALESCE(?, longitude),
           title = COALESCE(?, title),
           description = COALESCE(?, description),
           sound_url = COALESCE(?, sound_url),
           icon = COALESCE(?, icon),
           updated_at = datetime('now')
         WHERE id = ?",
    )
    .bind(input.latitude)
    .bind(input.longitude)
    .bind(input.title.as_deref().map(str::trim))
    .bind(input.description.as_deref())
    .bind(input.sound_url.as_deref().map(str::trim))
    .bind(input.icon.as_deref())
    .bind(pinpoint_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("unknown_pinpoint".to_string()));
    }

    get_pinpoint(pool, pinpoint_id).await
}

pub async fn delete_pinpoint(pool: &SqlitePool, pinpoint_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM pinpoints WHERE id = ?")
        .bind(pinpoint_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("unknown_pinpoint".to_string()));
    }
    Ok(())
}

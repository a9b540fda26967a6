use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::sound::{Sound, SoundBytes};
use crate::player::resolver::SoundRef;

type SoundRow = (i64, String, String, i64, String);

fn row_to_sound(row: SoundRow) -> Sound {
    Sound {
        id: row.0,
        filename: row.1,
        mime_type: row.2,
        size: row.3,
        url: SoundRef::internal(row.0).to_string(),
        created_at: row.4,
    }
}

pub async fn get_sound(pool: &SqlitePool, sound_id: i64) -> Result<Sound, AppError> {
    let row = sqlx::query_as::<_, SoundRow>(
        "SELECT id, filename, mime_type, size, created_at FROM sounds WHERE id = ?",
    )
    .bind(sound_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("unknown_sound".to_string()))?;

    Ok(row_to_sound(row))
}

/// List sound metadata, newest first. Payloads are not loaded.
pub async fn list_sounds(pool: &SqlitePool) -> Result<Vec<Sound>, AppError> {
    let rows = sqlx::query_as::<_, SoundRow>(
        "SELECT id, filename, mime_type, size, created_at FROM sounds ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_sound).collect())
}

pub async fn get_sound_bytes(pool: &SqlitePool, sound_id: i64) -> Result<SoundBytes, AppError> {
    let (data, mime_type, size) = sqlx::query_as::<_, (Vec<u8>, String, i64)>(
        "SELECT data, mime_type, size FROM sounds WHERE id = ?",
    )
    .bind(sound_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("unknown_sound".to_string()))?;

    Ok(SoundBytes {
        data,
        mime_type,
        size,
    })
}

/// Store a new sound. The size column is always derived from the payload.
pub async fn create_sound(
    pool: &SqlitePool,
    filename: &str,
    mime_type: &str,
    data: &[u8],
) -> Result<Sound, AppError> {
    if mime_type.trim().is_empty() {
        return Err(AppError::BadRequest("mime type must not be empty".to_string()));
    }

    let result = sqlx::query(
        "INSERT INTO sounds (filename, data, mime_type, size) VALUES (?, ?, ?, ?)",
    )
    .bind(filename)
    .bind(data)
    .bind(mime_type)
    .bind(data.len() as i64)
    .execute(pool)
    .await?;

    get_sound(pool, result.last_insert_rowid()).await
}

pub async fn delete_sound(pool: &SqlitePool, sound_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM sounds WHERE id = ?")
        .bind(sound_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("unknown_sound".to_string()));
    }
    Ok(())
}

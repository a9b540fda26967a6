use sqlx::SqlitePool;

use crate::error::AppError;
use crate::middleware::auth::{create_token_hash, generate_token};

/// Admin sessions last a week.
pub const TOKEN_TTL_DAYS: i64 = 7;

fn timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Create a new admin token. Returns `(raw_token, expires_at)`; only the hash
/// is persisted.
pub async fn issue_token(pool: &SqlitePool) -> Result<(String, String), AppError> {
    let token = generate_token();
    let token_hash = create_token_hash(&token);
    let expires_at = timestamp(chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS));

    sqlx::query("INSERT INTO admin_tokens (token_hash, expires_at) VALUES (?, ?)")
        .bind(&token_hash)
        .bind(&expires_at)
        .execute(pool)
        .await?;

    Ok((token, expires_at))
}

/// Returns the expiry of a valid, unexpired token.
pub async fn find_valid_token(pool: &SqlitePool, token: &str) -> Result<Option<String>, AppError> {
    let token_hash = create_token_hash(token);
    let expires_at: Option<String> =
        sqlx::query_scalar("SELECT expires_at FROM admin_tokens WHERE token_hash = ?")
            .bind(&token_hash)
            .fetch_optional(pool)
            .await?;

    let now = timestamp(chrono::Utc::now());
    Ok(expires_at.filter(|expires_at| *expires_at >= now))
}

pub async fn revoke_token(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM admin_tokens WHERE token_hash = ?")
        .bind(create_token_hash(token))
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove expired tokens. Returns the number of rows deleted.
pub async fn purge_expired_tokens(pool: &SqlitePool) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM admin_tokens WHERE expires_at < ?")
        .bind(timestamp(chrono::Utc::now()))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

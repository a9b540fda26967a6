use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::db;
use crate::error::AppError;
use crate::middleware::auth::{AdminUser, ADMIN_COOKIE};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

fn session_cookie(token: &str) -> String {
    format!(
        "{ADMIN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        db::auth::TOKEN_TTL_DAYS * 24 * 60 * 60
    )
}

fn expired_cookie() -> String {
    format!("{ADMIN_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(stored_hash) = state.admin_password_hash.as_deref() else {
        return Err(AppError::Unauthorized(
            "admin login is not configured".to_string(),
        ));
    };

    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("stored hash parse failed: {e}")))?;

    if Argon2::default()
        .verify_password(input.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        tracing::info!("rejected admin login");
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    let (token, expires_at) = db::auth::issue_token(&state.db).await?;
    tracing::info!(%expires_at, "admin session issued");

    Ok((
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(serde_json::json!({
            "data": {
                "token": token,
                "expires_at": expires_at
            }
        })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    db::auth::revoke_token(&state.db, &admin.token).await?;

    Ok((
        [(header::SET_COOKIE, expired_cookie())],
        Json(serde_json::json!({
            "data": { "ok": true }
        })),
    ))
}

pub async fn me(admin: AdminUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "data": {
            "admin": true,
            "expires_at": admin.expires_at
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_lasts_token_lifetime() {
        let cookie = session_cookie("abc");
        assert!(cookie.starts_with("admin_token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn test_expired_cookie_clears_value() {
        assert!(expired_cookie().starts_with("admin_token=;"));
        assert!(expired_cookie().ends_with("Max-Age=0"));
    }
}

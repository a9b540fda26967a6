use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use sha2::{Digest, Sha256};

use crate::db;
use crate::error::AppError;
use crate::middleware::auth::AdminUser;
use crate::middleware::cache::CachePolicy;
use crate::models::sound::{CreateSound, SoundQuery};
use crate::state::AppState;
use crate::storage::{self, AudioUpload};

/// Multipart field carrying the audio file.
const FILE_FIELD: &str = "file";

/// `GET /api/sounds`: the metadata listing, or the payload when `?id=` is set.
pub async fn list_or_fetch(
    State(state): State<AppState>,
    Query(query): Query<SoundQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    match query.id {
        Some(raw) => serve_sound(&state, &raw, &headers).await,
        None => {
            let sounds = db::sounds::list_sounds(&state.db).await?;
            Ok(Json(serde_json::json!({ "data": sounds })).into_response())
        }
    }
}

/// `GET /sounds?id=N`: payload only.
pub async fn fetch_sound(
    State(state): State<AppState>,
    Query(query): Query<SoundQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let raw = query
        .id
        .ok_or_else(|| AppError::BadRequest("missing sound id".to_string()))?;
    serve_sound(&state, &raw, &headers).await
}

fn parse_sound_id(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(format!("invalid sound id: {raw}")))
}

fn etag_for(data: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(data))
}

/// Whether an `If-None-Match` header already names `etag`.
fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|candidate| candidate.trim().trim_start_matches("W/"))
        .any(|candidate| candidate == etag || candidate == "*")
}

async fn serve_sound(
    state: &AppState,
    raw_id: &str,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let sound_id = parse_sound_id(raw_id)?;
    let sound = db::sounds::get_sound_bytes(&state.db, sound_id).await?;
    let etag = etag_for(&sound.data);

    if etag_matches(headers, &etag) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            Extension(CachePolicy::immutable()),
            [(header::ETAG, etag)],
        )
            .into_response());
    }

    Ok((
        StatusCode::OK,
        Extension(CachePolicy::immutable()),
        [
            (header::CONTENT_TYPE, sound.mime_type),
            (header::ETAG, etag),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        sound.data,
    )
        .into_response())
}

/// `POST /api/sounds`: accepts `multipart/form-data` with a `file` part, or a
/// JSON body carrying a base64 data URI.
pub async fn create_sound(
    State(state): State<AppState>,
    _admin: AdminUser,
    request: Request,
) -> Result<Json<serde_json::Value>, AppError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("multipart/form-data"));

    let upload = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let Json(input) = Json::<CreateSound>::from_request(request, &state)
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;
        let (bytes, mime_type) = storage::validate_audio_data_uri(&input.audio)?;
        AudioUpload {
            filename: storage::sanitize_filename(&input.filename),
            mime_type,
            bytes,
        }
    };

    let sound =
        db::sounds::create_sound(&state.db, &upload.filename, &upload.mime_type, &upload.bytes)
            .await?;
    tracing::info!(
        id = sound.id,
        filename = %sound.filename,
        mime_type = %sound.mime_type,
        size = sound.size,
        "sound stored"
    );

    Ok(Json(serde_json::json!({ "data": sound })))
}

async fn read_multipart(mut multipart: Multipart) -> Result<AudioUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejection(e.status(), e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("sound").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| rejection(e.status(), e.body_text()))?;
        return storage::validate_audio_upload(&filename, content_type.as_deref(), bytes.to_vec());
    }

    Err(AppError::BadRequest(format!(
        "multipart body has no `{FILE_FIELD}` field"
    )))
}

fn rejection(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(message),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => AppError::UnsupportedMediaType(message),
        _ => AppError::BadRequest(message),
    }
}

pub async fn delete_sound(
    State(state): State<AppState>,
    Path(sound_id): Path<i64>,
    _admin: AdminUser,
) -> Result<Json<serde_json::Value>, AppError> {
    db::sounds::delete_sound(&state.db, sound_id).await?;
    tracing::info!(id = sound_id, "sound deleted");
    Ok(Json(serde_json::json!({ "data": null })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_sound_id() {
        assert_eq!(parse_sound_id("42").unwrap(), 42);
        assert_eq!(parse_sound_id(" 7 ").unwrap(), 7);
        assert!(parse_sound_id("0").is_err());
        assert!(parse_sound_id("-3").is_err());
        assert!(parse_sound_id("abc").is_err());
        assert!(parse_sound_id("").is_err());
    }

    #[test]
    fn test_etag_is_quoted_digest() {
        let etag = etag_for(b"RIFF");
        assert!(etag.starts_with('"') && etag.ends_with('"'));
        assert_eq!(etag.len(), 66);
        assert_ne!(etag, etag_for(b"RIFX"));
    }

    #[test]
    fn test_if_none_match_variants() {
        let etag = etag_for(b"abc");
        let mut headers = HeaderMap::new();
        assert!(!etag_matches(&headers, &etag));

        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_str(&format!("\"other\", W/{etag}")).unwrap(),
        );
        assert!(etag_matches(&headers, &etag));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(etag_matches(&headers, &etag));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"nope\""));
        assert!(!etag_matches(&headers, &etag));
    }
}

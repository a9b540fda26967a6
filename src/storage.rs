use crate::error::AppError;

pub const MAX_SOUND_SIZE: usize = 5 * 1024 * 1024; // 5 MB
const MAX_FILENAME_LEN: usize = 255;

pub const ALLOWED_AUDIO_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/ogg",
    "audio/wav",
    "audio/x-wav",
    "audio/mp4",
    "audio/aac",
    "audio/flac",
];

/// A validated sound upload, ready to be stored.
#[derive(Debug)]
pub struct AudioUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Parse a `data:<mime>;base64,<data>` URI for audio.
/// Returns `(decoded_bytes, content_type)`.
pub fn validate_audio_data_uri(data: &str) -> Result<(Vec<u8>, String), AppError> {
    let rest = data
        .strip_prefix("data:")
        .ok_or_else(|| AppError::BadRequest("audio must be a data URI".to_string()))?;
    let (mime, b64) = rest
        .split_once(";base64,")
        .ok_or_else(|| AppError::BadRequest("audio must be a base64 data URI".to_string()))?;

    let mime = normalize_mime(mime)?;
    let cleaned: String = b64.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    // Reject before decoding: base64 expands by 4/3.
    if cleaned.len() / 4 * 3 > MAX_SOUND_SIZE + 3 {
        return Err(too_large());
    }

    let bytes = data_encoding::BASE64
        .decode(cleaned.as_bytes())
        .map_err(|_| AppError::BadRequest("invalid base64 data".to_string()))?;
    validate_audio_bytes(&bytes)?;

    Ok((bytes, mime))
}

/// Validate a raw upload (e.g. a multipart file part).
pub fn validate_audio_upload(
    filename: &str,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> Result<AudioUpload, AppError> {
    let filename = sanitize_filename(filename);
    let mime = match content_type {
        Some(ct) if ct != "application/octet-stream" => normalize_mime(ct)?,
        _ => mime_from_filename(&filename)
            .map(str::to_string)
            .ok_or_else(|| unsupported(content_type.unwrap_or("unknown")))?,
    };
    validate_audio_bytes(&bytes)?;

    Ok(AudioUpload {
        filename,
        mime_type: mime,
        bytes,
    })
}

fn validate_audio_bytes(bytes: &[u8]) -> Result<(), AppError> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("audio file is empty".to_string()));
    }
    if bytes.len() > MAX_SOUND_SIZE {
        return Err(too_large());
    }
    Ok(())
}

fn too_large() -> AppError {
    AppError::PayloadTooLarge(format!(
        "audio exceeds maximum size of {} MB",
        MAX_SOUND_SIZE / (1024 * 1024)
    ))
}

fn unsupported(mime: &str) -> AppError {
    AppError::UnsupportedMediaType(format!(
        "unsupported audio type: {mime}. allowed: {}",
        ALLOWED_AUDIO_TYPES.join(", ")
    ))
}

/// Lowercase, drop parameters (`;codecs=...`) and check against the allow list.
fn normalize_mime(mime: &str) -> Result<String, AppError> {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let essence = match essence.as_str() {
        "audio/mp3" => "audio/mpeg".to_string(),
        "audio/vnd.wave" | "audio/wave" => "audio/wav".to_string(),
        _ => essence,
    };
    if ALLOWED_AUDIO_TYPES.contains(&essence.as_str()) {
        Ok(essence)
    } else {
        Err(unsupported(mime))
    }
}

pub fn mime_from_filename(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "mp3" => Some("audio/mpeg"),
        "ogg" | "oga" => Some("audio/ogg"),
        "wav" => Some("audio/wav"),
        "m4a" | "mp4" => Some("audio/mp4"),
        "aac" => Some("audio/aac"),
        "flac" => Some("audio/flac"),
        _ => None,
    }
}

/// Sanitize a filename to prevent directory traversal and other issues.
pub fn sanitize_filename(name: &str) -> String {
    let name = name.replace(['/', '\\', '\0'], "_");
    let name = name.trim().trim_start_matches('.');
    let name: String = name.chars().take(MAX_FILENAME_LEN).collect();
    if name.is_empty() {
        "sound".to_string()
    } else {
        name
    }
}

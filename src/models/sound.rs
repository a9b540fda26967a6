use serde::{Deserialize, Serialize};

/// Sound metadata as returned by the listing endpoint. The payload itself is
/// only served by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sound {
    pub id: i64,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub url: String,
    pub created_at: String,
}

/// Raw payload of a stored sound.
#[derive(Debug, Clone)]
pub struct SoundBytes {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub size: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSound {
    pub filename: String,
    pub audio: String, // base64 data URI
}

#[derive(Debug, Deserialize)]
pub struct SoundQuery {
    pub id: Option<String>,
}

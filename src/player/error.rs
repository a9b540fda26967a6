use std::fmt;
use std::time::Duration;

/// Why a single playback tier could not start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The server does not know the sound (HTTP 404/410).
    NotFound { url: String },
    HttpStatus { url: String, status: u16 },
    NetworkUnavailable { url: String, reason: String },
    InvalidUrl(String),
    Decode { url: String, reason: String },
    Timeout { url: String, after: Duration },
    TooLarge { url: String, limit: usize },
    Synthesis(String),
    OutputUnavailable(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::NotFound { url } => write!(f, "sound not found: {url}"),
            MediaError::HttpStatus { url, status } => write!(f, "HTTP {status} from {url}"),
            MediaError::NetworkUnavailable { url, reason } => {
                write!(f, "network error fetching {url}: {reason}")
            }
            MediaError::InvalidUrl(msg) => write!(f, "invalid sound url: {msg}"),
            MediaError::Decode { url, reason } => write!(f, "cannot decode {url}: {reason}"),
            MediaError::Timeout { url, after } => {
                write!(f, "{url} not playable after {}ms", after.as_millis())
            }
            MediaError::TooLarge { url, limit } => {
                write!(f, "{url} exceeds the {limit} byte limit")
            }
            MediaError::Synthesis(msg) => write!(f, "tone synthesis failed: {msg}"),
            MediaError::OutputUnavailable(msg) => write!(f, "audio output unavailable: {msg}"),
        }
    }
}

impl std::error::Error for MediaError {}

//! Turns a pinpoint's sound reference into a fetchable URL.
//!
//! A reference is either an internal path served by this application
//! (`/api/sounds?id=7`, or the shorter `/sounds?id=7`) or an external URL.
//! Both forms are already fetchable, so resolution never rewrites them and
//! never fails; reachability is only discovered when the player loads the
//! sound.

use std::fmt;

use reqwest::Url;

use crate::player::error::MediaError;

/// Canonical path of the sound payload endpoint.
pub const INTERNAL_SOUND_PATH: &str = "/api/sounds";
const SOUND_PATHS: &[&str] = &["/api/sounds", "/sounds"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundRef {
    /// A sound stored in the database, addressed by id.
    Internal { id: i64, path: String },
    External(String),
}

impl SoundRef {
    pub fn parse(raw: &str) -> SoundRef {
        match internal_sound_id(raw.trim()) {
            Some(id) => SoundRef::Internal {
                id,
                path: raw.to_string(),
            },
            None => SoundRef::External(raw.to_string()),
        }
    }

    /// The canonical reference for a stored sound.
    pub fn internal(id: i64) -> SoundRef {
        SoundRef::Internal {
            id,
            path: format!("{INTERNAL_SOUND_PATH}?id={id}"),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SoundRef::Internal { path, .. } => path,
            SoundRef::External(url) => url,
        }
    }

    pub fn sound_id(&self) -> Option<i64> {
        match self {
            SoundRef::Internal { id, .. } => Some(*id),
            SoundRef::External(_) => None,
        }
    }
}

impl fmt::Display for SoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn internal_sound_id(reference: &str) -> Option<i64> {
    // Only same-origin paths; `//host/...` is protocol-relative, i.e. external.
    if !reference.starts_with('/') || reference.starts_with("//") {
        return None;
    }
    let (path, query) = reference.split_once('?')?;
    let path = path.trim_end_matches('/');
    if !SOUND_PATHS.contains(&path) {
        return None;
    }
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "id")
        .and_then(|(_, value)| value.parse::<i64>().ok())
        .filter(|id| *id > 0)
}

/// Resolve a sound reference to the URL the player should fetch.
pub fn resolve(sound_ref: &str) -> String {
    let resolved = SoundRef::parse(sound_ref);
    tracing::trace!(?resolved, "resolved sound reference");
    resolved.as_str().to_string()
}

/// Make a resolved reference absolute so it can be fetched outside a browser.
/// Relative paths are joined onto `base`; absolute http(s) URLs pass through.
pub fn absolute_url(base: Option<&Url>, resolved: &str) -> Result<Url, MediaError> {
    let resolved = resolved.trim();
    match Url::parse(resolved) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        Ok(url) => Err(MediaError::InvalidUrl(format!(
            "unsupported scheme `{}` in {resolved}",
            url.scheme()
        ))),
        Err(_) => {
            let base = base.ok_or_else(|| {
                MediaError::InvalidUrl(format!("relative sound url without a base: {resolved}"))
            })?;
            base.join(resolved)
                .map_err(|e| MediaError::InvalidUrl(format!("{resolved}: {e}")))
        }
    }
}

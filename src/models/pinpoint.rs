use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_ICON: &str = "📍";
const MAX_TITLE_LEN: usize = 200;
const MAX_ICON_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pinpoint {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub description: String,
    /// Sound reference: an internal `/api/sounds?id=N` path or an external URL.
    pub sound_url: String,
    pub icon: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePinpoint {
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub description: Option<String>,
    pub sound_url: String,
    pub icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePinpoint {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sound_url: Option<String>,
    pub icon: Option<String>,
}

pub fn validate_latitude(latitude: f64) -> Result<(), AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::BadRequest(
            "latitude must be between -90 and 90".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_longitude(longitude: f64) -> Result<(), AppError> {
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::BadRequest(
            "longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::BadRequest(format!(
            "title must be between 1 and {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_sound_url(sound_url: &str) -> Result<(), AppError> {
    if sound_url.trim().is_empty() {
        return Err(AppError::BadRequest("sound_url must not be empty".to_string()));
    }
    Ok(())
}

fn validate_icon(icon: &str) -> Result<(), AppError> {
    if icon.trim().is_empty() || icon.chars().count() > MAX_ICON_LEN {
        return Err(AppError::BadRequest(format!(
            "icon must be between 1 and {MAX_ICON_LEN} characters"
        )));
    }
    Ok(())
}

impl CreatePinpoint {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_latitude(self.latitude)?;
        validate_longitude(self.longitude)?;
        validate_title(&self.title)?;
        validate_sound_url(&self.sound_url)?;
        if let Some(ref icon) = self.icon {
            validate_icon(icon)?;
        }
        Ok(())
    }
}

impl UpdatePinpoint {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(latitude) = self.latitude {
            validate_latitude(latitude)?;
        }
        if let Some(longitude) = self.longitude {
            validate_longitude(longitude)?;
        }
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(ref sound_url) = self.sound_url {
            validate_sound_url(sound_url)?;
        }
        if let Some(ref icon) = self.icon {
            validate_icon(icon)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.sound_url.is_none()
            && self.icon.is_none()
    }
}

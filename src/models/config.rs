use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::pinpoint::{validate_latitude, validate_longitude};

pub const DEFAULT_TILE_LAYER_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_ATTRIBUTION: &str = "© OpenStreetMap contributors";
pub const MAX_ZOOM_LEVEL: i64 = 22;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub tile_layer_url: String,
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: i64,
    pub min_zoom: i64,
    pub max_zoom: i64,
    pub attribution: String,
    pub updated_at: Option<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_layer_url: DEFAULT_TILE_LAYER_URL.to_string(),
            center_lat: 48.8566,
            center_lng: 2.3522,
            zoom: 13,
            min_zoom: 10,
            max_zoom: 18,
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMapConfig {
    pub tile_layer_url: Option<String>,
    pub center_lat: Option<f64>,
    pub center_lng: Option<f64>,
    pub zoom: Option<i64>,
    pub min_zoom: Option<i64>,
    pub max_zoom: Option<i64>,
    pub attribution: Option<String>,
}

impl MapConfig {
    /// Apply a partial update on top of this config and validate the result.
    pub fn merged(&self, input: &UpdateMapConfig) -> Result<MapConfig, AppError> {
        let merged = MapConfig {
            tile_layer_url: input
                .tile_layer_url
                .clone()
                .unwrap_or_else(|| self.tile_layer_url.clone()),
            center_lat: input.center_lat.unwrap_or(self.center_lat),
            center_lng: input.center_lng.unwrap_or(self.center_lng),
            zoom: input.zoom.unwrap_or(self.zoom),
            min_zoom: input.min_zoom.unwrap_or(self.min_zoom),
            max_zoom: input.max_zoom.unwrap_or(self.max_zoom),
            attribution: input
                .attribution
                .clone()
                .unwrap_or_else(|| self.attribution.clone()),
            updated_at: self.updated_at.clone(),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let url = self.tile_layer_url.trim();
        if url.is_empty() {
            return Err(AppError::BadRequest(
                "tile_layer_url must not be empty".to_string(),
            ));
        }
        if !["{z}", "{x}", "{y}"].iter().all(|p| url.contains(p)) {
            return Err(AppError::BadRequest(
                "tile_layer_url must contain {z}, {x} and {y} placeholders".to_string(),
            ));
        }
        validate_latitude(self.center_lat)?;
        validate_longitude(self.center_lng)?;
        for zoom in [self.zoom, self.min_zoom, self.max_zoom] {
            if !(0..=MAX_ZOOM_LEVEL).contains(&zoom) {
                return Err(AppError::BadRequest(format!(
                    "zoom levels must be between 0 and {MAX_ZOOM_LEVEL}"
                )));
            }
        }
        if !(self.min_zoom <= self.zoom && self.zoom <= self.max_zoom) {
            return Err(AppError::BadRequest(
                "zoom must satisfy min_zoom <= zoom <= max_zoom".to_string(),
            ));
        }
        Ok(())
    }
}

/// A named tile source offered to the admin config screen.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TilePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub attribution: &'static str,
}

pub const TILE_PRESETS: &[TilePreset] = &[
    TilePreset {
        id: "osm",
        name: "OpenStreetMap",
        url: DEFAULT_TILE_LAYER_URL,
        attribution: DEFAULT_ATTRIBUTION,
    },
    TilePreset {
        id: "osm-fr",
        name: "OpenStreetMap France",
        url: "https://{s}.tile.openstreetmap.fr/osmfr/{z}/{x}/{y}.png",
        attribution: "© OpenStreetMap France | © OpenStreetMap contributors",
    },
    TilePreset {
        id: "osm-hot",
        name: "Humanitarian",
        url: "https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png",
        attribution: "© OpenStreetMap contributors, Tiles style by Humanitarian OpenStreetMap Team",
    },
    TilePreset {
        id: "carto-light",
        name: "CartoDB Positron",
        url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
        attribution: "© OpenStreetMap contributors © CARTO",
    },
    TilePreset {
        id: "carto-dark",
        name: "CartoDB Dark Matter",
        url: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
        attribution: "© OpenStreetMap contributors © CARTO",
    },
    TilePreset {
        id: "carto-voyager",
        name: "CartoDB Voyager",
        url: "https://{s}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}{r}.png",
        attribution: "© OpenStreetMap contributors © CARTO",
    },
    TilePreset {
        id: "opentopomap",
        name: "OpenTopoMap",
        url: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
        attribution: "© OpenStreetMap contributors, SRTM | © OpenTopoMap (CC-BY-SA)",
    },
    TilePreset {
        id: "esri-imagery",
        name: "Esri World Imagery",
        url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        attribution: "Tiles © Esri",
    },
];

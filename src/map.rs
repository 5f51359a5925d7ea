use serde::Serialize;

use crate::basemap::{Basemap, BasemapRegistry};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MapError {
    #[error("map container id must not be empty")]
    EmptyContainerId,
    #[error("invalid map center ({lat}, {lng})")]
    InvalidCenter { lat: f64, lng: f64 },
    #[error("no basemaps configured")]
    NoBasemaps,
    #[error("basemap '{0}' is registered twice")]
    DuplicateBasemap(String),
    #[error("unknown basemap '{0}'")]
    UnknownBasemap(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// GeoJSON positions are `[lng, lat, ...]`.
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lng, lat, ..] => Some(Self::new(*lat, *lng)),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// The interactive viewport. Exactly one basemap is active at any time.
#[derive(Debug, Clone)]
pub struct MapWidget {
    container_id: String,
    center: LatLng,
    zoom: u8,
    basemaps: BasemapRegistry,
    active: usize,
}

pub fn create_map(
    container_id: &str,
    center: LatLng,
    zoom: u8,
    basemaps: Vec<Basemap>,
    default_basemap: &str,
) -> Result<MapWidget, MapError> {
    if container_id.trim().is_empty() {
        return Err(MapError::EmptyContainerId);
    }
    if !center.is_valid() {
        return Err(MapError::InvalidCenter {
            lat: center.lat,
            lng: center.lng,
        });
    }
    let basemaps = BasemapRegistry::new(basemaps)?;
    let active = basemaps
        .position(default_basemap)
        .ok_or_else(|| MapError::UnknownBasemap(default_basemap.to_string()))?;

    Ok(MapWidget {
        container_id: container_id.to_string(),
        center,
        zoom,
        basemaps,
        active,
    })
}

impl MapWidget {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn basemaps(&self) -> &BasemapRegistry {
        &self.basemaps
    }

    pub fn active_basemap(&self) -> &Basemap {
        self.basemaps.at(self.active)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active_basemap().name == name
    }

    /// Activates `name` and deactivates the previous basemap.
    ///
    /// Returns the name that was deactivated, or `None` when `name` was
    /// already active. An unknown name leaves the selection untouched.
    pub fn select_basemap(&mut self, name: &str) -> Result<Option<String>, MapError> {
        let next = self
            .basemaps
            .position(name)
            .ok_or_else(|| MapError::UnknownBasemap(name.to_string()))?;
        if self.is_active(name) {
            return Ok(None);
        }
        let previous = self.active_basemap().name.clone();
        self.active = next;
        Ok(Some(previous))
    }
}

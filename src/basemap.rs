use serde::Serialize;

use crate::constants::{DEFAULT_BASEMAP, LEAFLET_DEFAULT_MAX_ZOOM};
use crate::map::MapError;

/// A background tile source the user can switch to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Basemap {
    pub name: String,
    pub tile_url_template: String,
    pub attribution: String,
    pub max_zoom: u8,
}

impl Basemap {
    pub fn new(name: &str, tile_url_template: &str, attribution: &str, max_zoom: u8) -> Self {
        Self {
            name: name.to_string(),
            tile_url_template: tile_url_template.to_string(),
            attribution: attribution.to_string(),
            max_zoom,
        }
    }
}

/// Ordered set of basemaps keyed by display name.
///
/// Order is preserved so the layer control lists entries the same way
/// every time. Names are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct BasemapRegistry {
    basemaps: Vec<Basemap>,
}

impl BasemapRegistry {
    pub fn new(basemaps: Vec<Basemap>) -> Result<Self, MapError> {
        if basemaps.is_empty() {
            return Err(MapError::NoBasemaps);
        }
        for (i, basemap) in basemaps.iter().enumerate() {
            if basemaps[..i].iter().any(|b| b.name == basemap.name) {
                return Err(MapError::DuplicateBasemap(basemap.name.clone()));
            }
        }
        Ok(Self { basemaps })
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.basemaps.iter().position(|b| b.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.basemaps.iter().map(|b| b.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Basemap> {
        self.basemaps.iter()
    }

    pub(crate) fn at(&self, index: usize) -> &Basemap {
        &self.basemaps[index]
    }
}

/// The four tile sources the earthquake map ships with.
pub fn standard_basemaps() -> Vec<Basemap> {
    vec![
        Basemap::new(
            "GrayScale",
            "https://server.arcgisonline.com/ArcGIS/rest/services/Canvas/World_Light_Gray_Base/MapServer/tile/{z}/{y}/{x}",
            "Tiles &copy; Esri &mdash; Esri, DeLorme, NAVTEQ",
            16,
        ),
        Basemap::new(
            "Water Color",
            "http://tile.mtbmap.cz/mtbmap_tiles/{z}/{x}/{y}.png",
            "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &amp; USGS",
            LEAFLET_DEFAULT_MAX_ZOOM,
        ),
        Basemap::new(
            "Topography",
            "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            "Map data: &copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors, <a href=\"http://viewfinderpanoramas.org\">SRTM</a> | Map style: &copy; <a href=\"https://opentopomap.org\">OpenTopoMap</a> (<a href=\"https://creativecommons.org/licenses/by-sa/3.0/\">CC-BY-SA</a>)",
            17,
        ),
        Basemap::new(
            DEFAULT_BASEMAP,
            "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors",
            19,
        ),
    ]
}

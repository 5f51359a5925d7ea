//! Typed subset of GeoJSON consumed from the two remote feeds.
//!
//! Only the fields the map actually draws are modelled. Anything else in the
//! documents is ignored; a structural mismatch (wrong root type, unknown
//! geometry type, non-numeric coordinates) fails the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::map::LatLng;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("malformed GeoJSON from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("expected a FeatureCollection from {url}, found {kind}")]
    NotACollection { url: String, kind: String },
    #[error("feature {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}

impl FeedError {
    pub fn invalid(index: usize, reason: impl Into<String>) -> Self {
        FeedError::InvalidFeature {
            index,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Vec<f64> },
    LineString { coordinates: Vec<Vec<f64>> },
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
}

impl Geometry {
    fn kind(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
        }
    }
}

/// `properties` may be null or absent in valid GeoJSON; both read as
/// `P::default()` so the per-feature checks decide what to skip.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de> + Default"))]
pub struct Feature<P> {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: P,
}

fn null_as_default<'de, D, P>(deserializer: D) -> Result<P, D::Error>
where
    D: Deserializer<'de>,
    P: Deserialize<'de> + Default,
{
    Ok(Option::<P>::deserialize(deserializer)?.unwrap_or_default())
}

/// USGS summary feeds carry a `metadata` block; the plates file does not.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub generated: Option<i64>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de> + Default"))]
pub struct FeatureCollection<P> {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub metadata: Option<FeedMetadata>,
    pub features: Vec<Feature<P>>,
}

pub fn parse_collection<P: DeserializeOwned + Default>(
    url: &str,
    body: &[u8],
) -> Result<FeatureCollection<P>, FeedError> {
    let collection: FeatureCollection<P> =
        serde_json::from_slice(body).map_err(|source| FeedError::Malformed {
            url: url.to_string(),
            source,
        })?;
    if collection.kind != "FeatureCollection" {
        return Err(FeedError::NotACollection {
            url: url.to_string(),
            kind: collection.kind,
        });
    }
    Ok(collection)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuakeProperties {
    #[serde(default)]
    pub mag: Option<f64>,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlateProperties {
    #[serde(default, rename = "Name")]
    pub name: Option<String>,
    #[serde(default, rename = "PlateA")]
    pub plate_a: Option<String>,
    #[serde(default, rename = "PlateB")]
    pub plate_b: Option<String>,
    #[serde(default, rename = "Type")]
    pub boundary_type: Option<String>,
}

/// A validated earthquake event.
#[derive(Debug, Clone, PartialEq)]
pub struct Earthquake {
    pub id: Option<String>,
    pub position: LatLng,
    /// Hypocenter depth in km (third coordinate).
    pub depth: f64,
    pub magnitude: f64,
    pub place: Option<String>,
    /// Event time, ms since epoch.
    pub time: Option<i64>,
    /// USGS event page.
    pub url: Option<String>,
    pub title: Option<String>,
}

impl Earthquake {
    pub fn from_feature(index: usize, feature: Feature<QuakeProperties>) -> Result<Self, FeedError> {
        let coordinates = match feature.geometry {
            Some(Geometry::Point { coordinates }) => coordinates,
            Some(other) => {
                return Err(FeedError::invalid(
                    index,
                    format!("expected Point geometry, found {}", other.kind()),
                ))
            }
            None => return Err(FeedError::invalid(index, "missing geometry")),
        };
        let (position, depth) = match coordinates.as_slice() {
            [lng, lat, depth, ..] => (LatLng::new(*lat, *lng), *depth),
            _ => {
                return Err(FeedError::invalid(
                    index,
                    format!(
                        "expected [lng, lat, depth] coordinates, found {} values",
                        coordinates.len()
                    ),
                ))
            }
        };
        let magnitude = feature
            .properties
            .mag
            .ok_or_else(|| FeedError::invalid(index, "missing properties.mag"))?;

        Ok(Self {
            id: feature.id.as_ref().map(id_to_string),
            position,
            depth,
            magnitude,
            place: feature.properties.place,
            time: feature.properties.time,
            url: feature.properties.url,
            title: feature.properties.title,
        })
    }
}

/// One plate boundary segment, possibly split into several paths.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateBoundary {
    pub name: Option<String>,
    pub plate_a: Option<String>,
    pub plate_b: Option<String>,
    pub boundary_type: Option<String>,
    pub paths: Vec<Vec<LatLng>>,
}

impl PlateBoundary {
    pub fn from_feature(index: usize, feature: Feature<PlateProperties>) -> Result<Self, FeedError> {
        let raw_paths = match feature.geometry {
            Some(Geometry::LineString { coordinates }) => vec![coordinates],
            Some(Geometry::MultiLineString { coordinates }) => coordinates,
            Some(other) => {
                return Err(FeedError::invalid(
                    index,
                    format!("expected line geometry, found {}", other.kind()),
                ))
            }
            None => return Err(FeedError::invalid(index, "missing geometry")),
        };

        let mut paths = Vec::with_capacity(raw_paths.len());
        for path in raw_paths {
            let points = path
                .iter()
                .map(|position| LatLng::from_position(position))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| FeedError::invalid(index, "line position with fewer than 2 values"))?;
            paths.push(points);
        }

        let properties = feature.properties;
        Ok(Self {
            name: properties.name,
            plate_a: properties.plate_a,
            plate_b: properties.plate_b,
            boundary_type: properties.boundary_type.filter(|t| !t.is_empty()),
            paths,
        })
    }
}

fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

//! Marker and line styling for the two overlays.
//!
//! Color and radius are pure functions of a single feature's depth and
//! magnitude; nothing here looks at other features.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};

use crate::feed::{Earthquake, FeedError, PlateBoundary};
use crate::map::LatLng;

/// Depth bands checked top-down; the first threshold strictly exceeded wins.
pub const DEPTH_BANDS: [(f64, &str); 5] = [
    (90.0, "red"),
    (70.0, "#fc4903"),
    (50.0, "#fc8403"),
    (30.0, "#fcad03"),
    (10.0, "#cafc03"),
];
pub const SHALLOW_COLOR: &str = "green";

pub const PLATE_LINE_COLOR: &str = "yellow";
pub const PLATE_LINE_WEIGHT: f64 = 1.0;

pub fn color_for_depth(depth: f64) -> &'static str {
    DEPTH_BANDS
        .iter()
        .find(|(threshold, _)| depth > *threshold)
        .map(|(_, color)| *color)
        .unwrap_or(SHALLOW_COLOR)
}

pub fn radius_for_magnitude(magnitude: f64) -> f64 {
    if magnitude == 0.0 {
        1.0
    } else {
        magnitude * 5.0
    }
}

/// What to do with a magnitude below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeMagnitude {
    /// Scale as usual, giving a negative radius.
    #[default]
    Preserve,
    /// Draw with the same radius as a zero magnitude.
    Clamp,
    /// Skip the feature.
    Reject,
}

impl FromStr for NegativeMagnitude {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown negative magnitude policy '{other}' (expected preserve, clamp or reject)"
            )),
        }
    }
}

impl fmt::Display for NegativeMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preserve => write!(f, "preserve"),
            Self::Clamp => write!(f, "clamp"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Radius under `policy`; `None` means the feature is rejected.
pub fn marker_radius(magnitude: f64, policy: NegativeMagnitude) -> Option<f64> {
    if magnitude >= 0.0 || magnitude.is_nan() {
        return Some(radius_for_magnitude(magnitude));
    }
    match policy {
        NegativeMagnitude::Preserve => Some(radius_for_magnitude(magnitude)),
        NegativeMagnitude::Clamp => Some(radius_for_magnitude(0.0)),
        NegativeMagnitude::Reject => None,
    }
}

/// Path options handed to Leaflet's `circleMarker`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    pub opacity: f64,
    pub fill_opacity: f64,
    pub fill_color: String,
    pub color: String,
    pub radius: f64,
    pub weight: f64,
    pub stroke: bool,
}

impl MarkerStyle {
    pub fn for_quake(depth: f64, radius: f64) -> Self {
        Self {
            opacity: 0.5,
            fill_opacity: 0.5,
            fill_color: color_for_depth(depth).to_string(),
            color: "#000000".to_string(),
            radius,
            weight: 0.5,
            stroke: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: String,
    pub weight: f64,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: PLATE_LINE_COLOR.to_string(),
            weight: PLATE_LINE_WEIGHT,
        }
    }
}

pub fn popup_html(magnitude: f64, depth: f64, place: &str) -> String {
    format!(
        "Magnitude: <b>{}</b><br>\nDepth: <b>{}</b><br>\nLocation: <b>{}</b>",
        magnitude,
        depth,
        escape_html(place)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Anything that can be written back out as a styled GeoJSON feature.
pub trait ToFeature {
    fn to_feature(&self) -> Value;
}

/// One earthquake, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleMarker {
    pub id: Option<String>,
    pub position: LatLng,
    pub depth: f64,
    pub magnitude: f64,
    pub place: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub style: MarkerStyle,
    pub popup: String,
}

impl CircleMarker {
    pub fn from_quake(
        index: usize,
        quake: Earthquake,
        policy: NegativeMagnitude,
    ) -> Result<Self, FeedError> {
        let radius = marker_radius(quake.magnitude, policy).ok_or_else(|| {
            FeedError::invalid(
                index,
                format!("negative magnitude {} rejected", quake.magnitude),
            )
        })?;
        let place = quake
            .place
            .unwrap_or_else(|| "Unknown location".to_string());

        Ok(Self {
            style: MarkerStyle::for_quake(quake.depth, radius),
            popup: popup_html(quake.magnitude, quake.depth, &place),
            id: quake.id,
            position: quake.position,
            depth: quake.depth,
            magnitude: quake.magnitude,
            place,
            url: quake.url,
            title: quake.title,
        })
    }
}

impl ToFeature for CircleMarker {
    fn to_feature(&self) -> Value {
        json!({
            "type": "Feature",
            "id": self.id,
            "geometry": {
                "type": "Point",
                "coordinates": [self.position.lng, self.position.lat, self.depth],
            },
            "properties": {
                "mag": self.magnitude,
                "place": self.place,
                "url": self.url,
                "title": self.title,
                "style": self.style,
                "popup": self.popup,
            },
        })
    }
}

/// One plate boundary, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateLine {
    pub name: Option<String>,
    pub plate_a: Option<String>,
    pub plate_b: Option<String>,
    pub boundary_type: Option<String>,
    pub paths: Vec<Vec<LatLng>>,
    pub style: LineStyle,
}

impl From<PlateBoundary> for PlateLine {
    fn from(boundary: PlateBoundary) -> Self {
        Self {
            name: boundary.name,
            plate_a: boundary.plate_a,
            plate_b: boundary.plate_b,
            boundary_type: boundary.boundary_type,
            paths: boundary.paths,
            style: LineStyle::default(),
        }
    }
}

impl ToFeature for PlateLine {
    fn to_feature(&self) -> Value {
        let coordinates: Vec<Vec<[f64; 2]>> = self
            .paths
            .iter()
            .map(|path| path.iter().map(|p| [p.lng, p.lat]).collect())
            .collect();
        json!({
            "type": "Feature",
            "geometry": {
                "type": "MultiLineString",
                "coordinates": coordinates,
            },
            "properties": {
                "name": self.name,
                "plateA": self.plate_a,
                "plateB": self.plate_b,
                "type": self.boundary_type,
                "style": self.style,
            },
        })
    }
}

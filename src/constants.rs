// Server configuration
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const SSE_HEARTBEAT_SECONDS: u64 = 30;
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

// Remote feeds
pub const TECTONIC_PLATES_URL: &str =
    "https://raw.githubusercontent.com/fraxen/tectonicplates/master/GeoJSON/PB2002_boundaries.json";
pub const EARTHQUAKES_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
pub const USER_AGENT: &str = concat!("quakemap/", env!("CARGO_PKG_VERSION"));

// Map viewport
pub const MAP_CONTAINER_ID: &str = "map";
pub const DEFAULT_CENTER_LAT: f64 = 36.7783;
pub const DEFAULT_CENTER_LNG: f64 = -119.4179;
pub const DEFAULT_ZOOM: u8 = 5;
pub const DEFAULT_BASEMAP: &str = "Default";
// Leaflet's own maxZoom when a tile layer does not set one
pub const LEAFLET_DEFAULT_MAX_ZOOM: u8 = 18;

// Overlays
pub const TECTONIC_PLATES_LAYER: &str = "Tectonic Plates";
pub const EARTHQUAKES_LAYER: &str = "Earthquake Data";

// Legend
pub const LEGEND_POSITION: &str = "bottomright";

// Render output
pub const DEFAULT_OUTPUT_FILE: &str = "quakemap.html";

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use crate::constants::{
    DEFAULT_BASEMAP, DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_ZOOM, EARTHQUAKES_URL, TECTONIC_PLATES_URL,
};
use crate::map::LatLng;
use crate::style::NegativeMagnitude;
use crate::utils;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub auto_open_browser: bool,
    pub earthquakes_url: String,
    pub plates_url: String,
    pub request_timeout_secs: u64,
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: u8,
    pub default_basemap: String,
    pub negative_magnitude: NegativeMagnitude,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            auto_open_browser: false,
            earthquakes_url: EARTHQUAKES_URL.to_string(),
            plates_url: TECTONIC_PLATES_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            center_lat: DEFAULT_CENTER_LAT,
            center_lng: DEFAULT_CENTER_LNG,
            zoom: DEFAULT_ZOOM,
            default_basemap: DEFAULT_BASEMAP.to_string(),
            negative_magnitude: NegativeMagnitude::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Reads `key = value` lines over the defaults. Unknown keys and values
    /// that fail to parse are ignored.
    pub fn parse(content: &str) -> Self {
        let mut config_map = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim(), value.trim().trim_matches('"'));
            }
        }

        let mut settings = Settings::default();
        if let Some(host) = config_map.get("host") {
            settings.host = host.to_string();
        }
        parse_into(&config_map, "port", &mut settings.port);
        parse_into(&config_map, "auto_open_browser", &mut settings.auto_open_browser);
        if let Some(url) = config_map.get("earthquakes_url") {
            settings.earthquakes_url = url.to_string();
        }
        if let Some(url) = config_map.get("plates_url") {
            settings.plates_url = url.to_string();
        }
        parse_into(&config_map, "request_timeout_secs", &mut settings.request_timeout_secs);
        parse_into(&config_map, "center_lat", &mut settings.center_lat);
        parse_into(&config_map, "center_lng", &mut settings.center_lng);
        parse_into(&config_map, "zoom", &mut settings.zoom);
        if let Some(name) = config_map.get("default_basemap") {
            settings.default_basemap = name.to_string();
        }
        parse_into(&config_map, "negative_magnitude", &mut settings.negative_magnitude);
        settings
    }

    pub fn to_ini(&self) -> String {
        let mut content = String::new();
        content.push_str("# QuakeMap Configuration File\n");
        content.push_str(&format!("host = \"{}\"\n", self.host));
        content.push_str(&format!("port = {}\n", self.port));
        content.push_str(&format!("auto_open_browser = {}\n", self.auto_open_browser));
        content.push_str(&format!("earthquakes_url = \"{}\"\n", self.earthquakes_url));
        content.push_str(&format!("plates_url = \"{}\"\n", self.plates_url));
        content.push_str(&format!("request_timeout_secs = {}\n", self.request_timeout_secs));
        content.push_str(&format!("center_lat = {}\n", self.center_lat));
        content.push_str(&format!("center_lng = {}\n", self.center_lng));
        content.push_str(&format!("zoom = {}\n", self.zoom));
        content.push_str(&format!("default_basemap = \"{}\"\n", self.default_basemap));
        content.push_str(&format!("negative_magnitude = {}\n", self.negative_magnitude));
        content
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Creating config directory")?;
        }
        std::fs::write(&config_path, self.to_ini()).context("Failed to write to config file")?;
        Ok(config_path)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lng)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `quakemap.ini` next to the binary during development, otherwise in
    /// the platform data directory.
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .unwrap_or_default()
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .to_path_buf();

        if path.ends_with("target/debug") || path.ends_with("target/release") {
            path.pop();
            path.pop();
            path.push("quakemap.ini");
            return path;
        }
        utils::get_config_path()
    }
}

fn parse_into<T: std::str::FromStr>(map: &HashMap<&str, &str>, key: &str, slot: &mut T) {
    if let Some(raw) = map.get(key) {
        match raw.parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => warn!("Ignoring invalid config value {key} = {raw}"),
        }
    }
}

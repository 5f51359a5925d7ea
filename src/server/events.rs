use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// SSE event types
pub const OVERLAY_LOADED: &str = "overlay_loaded";
pub const OVERLAY_FAILED: &str = "overlay_failed";
pub const HEARTBEAT: &str = "heartbeat";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayEvent {
    pub event_type: String,
    pub data: OverlayData,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OverlayData {
    pub slug: Option<String>,
    pub layer: Option<String>,
    pub features: Option<usize>,
    pub skipped: Option<usize>,
    pub message: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl OverlayEvent {
    pub fn heartbeat() -> Self {
        Self {
            event_type: HEARTBEAT.to_string(),
            data: OverlayData {
                message: Some("SSE connection alive".to_string()),
                timestamp: Some(Utc::now()),
                ..Default::default()
            },
        }
    }
}

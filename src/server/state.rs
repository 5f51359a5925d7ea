use std::sync::Arc;
use tokio::sync::broadcast;
use crate::context::AppContext;
use crate::settings::Settings;
use super::events::OverlayEvent;

// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<AppContext>,
    pub settings: Arc<Settings>,
    pub event_sender: broadcast::Sender<OverlayEvent>,
}

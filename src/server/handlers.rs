use axum::{
    extract::{Path as AxumPath, State},
    http::{header, StatusCode},
    response::{sse::Event as SseEvent, Html, IntoResponse, Json, Response, Sse},
};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, warn};

use crate::constants::SSE_HEARTBEAT_SECONDS;
use crate::context::{BasemapChange, MapConfig, OverlaySummary};
use crate::html_template::{self, PageMode};
use crate::overlay::OverlayKind;

use super::events::OverlayEvent;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BasemapRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

fn not_found(message: String) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "status": "error",
            "message": message,
        })),
    )
        .into_response()
}

fn overlay_from_slug(state: &AppState, slug: &str) -> Result<OverlayKind, Response> {
    state
        .ctx
        .control()
        .overlay(slug)
        .ok_or_else(|| not_found(format!("Unknown overlay: {slug}")))
}

pub async fn index_html() -> Result<Html<String>, StatusCode> {
    html_template::render_page(&PageMode::Served)
        .map(Html)
        .map_err(|e| {
            warn!("Failed to render page: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

fn embedded_asset(name: &str, content_type: &'static str) -> Response {
    match html_template::asset(name) {
        Some(content) => ([(header::CONTENT_TYPE, content_type)], content).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn style_css() -> Response {
    embedded_asset("style.css", "text/css")
}

pub async fn script_js() -> Response {
    embedded_asset("script.js", "application/javascript")
}

pub async fn healthz() -> &'static str {
    "ok"
}

// API endpoint for the map, control and legend configuration
pub async fn get_map_config(State(state): State<AppState>) -> Json<MapConfig> {
    Json(state.ctx.map_config().await)
}

// API endpoint for per-overlay load status
pub async fn get_status(State(state): State<AppState>) -> Json<Vec<OverlaySummary>> {
    Json(state.ctx.overlay_summaries().await)
}

// Styled GeoJSON for one overlay; empty until its load has succeeded
pub async fn get_overlay(
    State(state): State<AppState>,
    AxumPath(slug): AxumPath<String>,
) -> Response {
    match overlay_from_slug(&state, &slug) {
        Ok(kind) => (
            [(header::CACHE_CONTROL, "no-cache")],
            Json(state.ctx.overlay_geojson(kind).await),
        )
            .into_response(),
        Err(response) => response,
    }
}

// Layer control: basemap radio selection
pub async fn select_basemap(
    State(state): State<AppState>,
    Json(payload): Json<BasemapRequest>,
) -> Result<Json<BasemapChange>, Response> {
    state
        .ctx
        .select_basemap(&payload.name)
        .await
        .map(Json)
        .map_err(|e| not_found(e.to_string()))
}

// Layer control: overlay checkbox
pub async fn set_overlay_visibility(
    State(state): State<AppState>,
    AxumPath(slug): AxumPath<String>,
    Json(payload): Json<VisibilityRequest>,
) -> Result<Json<serde_json::Value>, Response> {
    let kind = overlay_from_slug(&state, &slug)?;
    state.ctx.set_overlay_visible(kind, payload.visible).await;
    debug!("{} visible = {}", kind.layer_name(), payload.visible);

    Ok(Json(serde_json::json!({
        "status": "success",
        "slug": kind.slug(),
        "visible": payload.visible,
    })))
}

// SSE stream of overlay load events
pub async fn overlay_events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::channel(16);

    // Subscribe to the main event sender
    let mut event_receiver = state.event_sender.subscribe();

    // Forward events from main sender to SSE stream
    tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                event = event_receiver.recv() => match event {
                    Ok(overlay_event) => overlay_event,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("SSE client lagged behind by {missed} events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = tokio::time::sleep(Duration::from_secs(SSE_HEARTBEAT_SECONDS)) => {
                    OverlayEvent::heartbeat()
                }
            };

            let sse_event = SseEvent::default()
                .event(next.event_type.clone())
                .json_data(&next)
                .unwrap_or_else(|_| SseEvent::default().data("Error serializing event"));

            if tx.send(Ok(sse_event)).await.is_err() {
                break; // Client disconnected
            }
        }
    });

    Sse::new(ReceiverStream::new(rx))
}

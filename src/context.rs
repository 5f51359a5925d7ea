use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

use crate::basemap::{standard_basemaps, Basemap};
use crate::constants::MAP_CONTAINER_ID;
use crate::control::LayerControl;
use crate::fetch::FeedClient;
use crate::legend::Legend;
use crate::map::{create_map, LatLng, MapError, MapWidget};
use crate::overlay::{
    load_earthquakes, load_tectonic_plates, LayerGroup, OverlayKind, OverlayResult, OverlayStatus,
};
use crate::server::events::{OverlayData, OverlayEvent, OVERLAY_FAILED, OVERLAY_LOADED};
use crate::settings::Settings;
use crate::style::{CircleMarker, PlateLine, ToFeature};

/// Everything the page draws: the map, its two overlays, the layer
/// control and the legend.
///
/// Each overlay group sits behind its own lock so the two loads never
/// contend with each other.
pub struct AppContext {
    map: RwLock<MapWidget>,
    control: LayerControl,
    legend: Legend,
    plates: RwLock<LayerGroup<PlateLine>>,
    earthquakes: RwLock<LayerGroup<CircleMarker>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverlaySummary {
    pub slug: &'static str,
    pub name: String,
    pub visible: bool,
    pub status: OverlayStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapConfig {
    pub container_id: String,
    pub center: LatLng,
    pub zoom: u8,
    pub basemaps: Vec<Basemap>,
    pub active_basemap: String,
    pub control: LayerControl,
    pub legend: Legend,
    pub legend_html: String,
    pub overlays: Vec<OverlaySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasemapChange {
    pub previous: Option<String>,
    pub active: String,
}

/// Map configuration plus inlined overlay data for a standalone page.
#[derive(Debug, Clone, Serialize)]
pub struct PageBootstrap {
    pub map: MapConfig,
    pub overlays: serde_json::Map<String, Value>,
}

impl AppContext {
    pub fn new(map: MapWidget) -> Self {
        let control = LayerControl::new(&map, &OverlayKind::ALL);
        Self {
            map: RwLock::new(map),
            control,
            legend: Legend::depth(),
            plates: RwLock::new(LayerGroup::new(OverlayKind::TectonicPlates.layer_name())),
            earthquakes: RwLock::new(LayerGroup::new(OverlayKind::Earthquakes.layer_name())),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, MapError> {
        let map = create_map(
            MAP_CONTAINER_ID,
            settings.center(),
            settings.zoom,
            standard_basemaps(),
            &settings.default_basemap,
        )?;
        Ok(Self::new(map))
    }

    pub fn control(&self) -> &LayerControl {
        &self.control
    }

    pub async fn attach_plates(&self, result: OverlayResult<PlateLine>) -> OverlayEvent {
        attach(OverlayKind::TectonicPlates, &self.plates, result).await
    }

    pub async fn attach_earthquakes(&self, result: OverlayResult<CircleMarker>) -> OverlayEvent {
        attach(OverlayKind::Earthquakes, &self.earthquakes, result).await
    }

    /// Fetches both overlays concurrently and attaches each result to its
    /// own group as soon as it arrives. Resolves once both have settled.
    pub async fn load_overlays(
        self: Arc<Self>,
        client: FeedClient,
        settings: &Settings,
        events: Option<broadcast::Sender<OverlayEvent>>,
    ) {
        let plates_task = {
            let ctx = Arc::clone(&self);
            let client = client.clone();
            let url = settings.plates_url.clone();
            let events = events.clone();
            tokio::spawn(async move {
                let result = load_tectonic_plates(&client, &url).await;
                let event = ctx.attach_plates(result).await;
                publish(events.as_ref(), event);
            })
        };

        let quakes_task = {
            let ctx = Arc::clone(&self);
            let url = settings.earthquakes_url.clone();
            let policy = settings.negative_magnitude;
            tokio::spawn(async move {
                let result = load_earthquakes(&client, &url, policy).await;
                let event = ctx.attach_earthquakes(result).await;
                publish(events.as_ref(), event);
            })
        };

        let (plates, quakes) = tokio::join!(plates_task, quakes_task);
        for (kind, joined) in [
            (OverlayKind::TectonicPlates, plates),
            (OverlayKind::Earthquakes, quakes),
        ] {
            if let Err(e) = joined {
                error!("{} load task aborted: {e}", kind.layer_name());
            }
        }
    }

    pub async fn select_basemap(&self, name: &str) -> Result<BasemapChange, MapError> {
        let mut map = self.map.write().await;
        let previous = self.control.select_basemap(&mut map, name)?;
        if let Some(previous) = &previous {
            info!("Basemap switched from {previous} to {name}");
        }
        Ok(BasemapChange {
            previous,
            active: map.active_basemap().name.clone(),
        })
    }

    pub async fn set_overlay_visible(&self, kind: OverlayKind, visible: bool) {
        match kind {
            OverlayKind::TectonicPlates => {
                self.control
                    .toggle_overlay(&mut *self.plates.write().await, visible)
            }
            OverlayKind::Earthquakes => {
                self.control
                    .toggle_overlay(&mut *self.earthquakes.write().await, visible)
            }
        }
    }

    pub async fn overlay_summaries(&self) -> Vec<OverlaySummary> {
        let plates = self.plates.read().await;
        let quakes = self.earthquakes.read().await;
        vec![
            summarize(OverlayKind::TectonicPlates, &plates),
            summarize(OverlayKind::Earthquakes, &quakes),
        ]
    }

    pub async fn overlay_geojson(&self, kind: OverlayKind) -> Value {
        match kind {
            OverlayKind::TectonicPlates => self.plates.read().await.to_geojson(),
            OverlayKind::Earthquakes => self.earthquakes.read().await.to_geojson(),
        }
    }

    pub async fn map_config(&self) -> MapConfig {
        let overlays = self.overlay_summaries().await;
        let map = self.map.read().await;
        MapConfig {
            container_id: map.container_id().to_string(),
            center: map.center(),
            zoom: map.zoom(),
            basemaps: map.basemaps().iter().cloned().collect(),
            active_basemap: map.active_basemap().name.clone(),
            control: self.control.clone(),
            legend: self.legend.clone(),
            legend_html: self.legend.to_html(),
            overlays,
        }
    }

    pub async fn bootstrap(&self) -> PageBootstrap {
        let mut overlays = serde_json::Map::new();
        for kind in OverlayKind::ALL {
            overlays.insert(kind.slug().to_string(), self.overlay_geojson(kind).await);
        }
        PageBootstrap {
            map: self.map_config().await,
            overlays,
        }
    }
}

async fn attach<T: ToFeature>(
    kind: OverlayKind,
    group: &RwLock<LayerGroup<T>>,
    result: OverlayResult<T>,
) -> OverlayEvent {
    let mut group = group.write().await;
    let mut data = OverlayData {
        slug: Some(kind.slug().to_string()),
        layer: Some(kind.layer_name().to_string()),
        timestamp: Some(Utc::now()),
        ..Default::default()
    };

    let failure = match result {
        Ok(load) => {
            let (features, skipped) = (load.items.len(), load.skipped);
            match group.populate(load) {
                Ok(()) => {
                    info!("{} ready: {features} features", kind.layer_name());
                    data.features = Some(features);
                    data.skipped = Some(skipped);
                    data.message = Some(format!("{} loaded", kind.layer_name()));
                    return OverlayEvent {
                        event_type: OVERLAY_LOADED.to_string(),
                        data,
                    };
                }
                Err(e) => e.to_string(),
            }
        }
        Err(e) => {
            let reason = e.to_string();
            if let Err(settled) = group.mark_failed(reason.clone()) {
                warn!("{settled}");
            }
            reason
        }
    };

    warn!("{} not loaded: {failure}", kind.layer_name());
    data.features = Some(group.len());
    data.message = Some(failure);
    OverlayEvent {
        event_type: OVERLAY_FAILED.to_string(),
        data,
    }
}

fn summarize<T>(kind: OverlayKind, group: &LayerGroup<T>) -> OverlaySummary {
    OverlaySummary {
        slug: kind.slug(),
        name: group.name().to_string(),
        visible: group.is_visible(),
        status: group.status().clone(),
    }
}

fn publish(events: Option<&broadcast::Sender<OverlayEvent>>, event: OverlayEvent) {
    if let Some(tx) = events {
        // No subscribers is fine: the page also polls /api/status.
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedError;
    use crate::map::LatLng;
    use crate::overlay::OverlayLoad;
    use crate::style::{MarkerStyle, NegativeMagnitude};

    fn marker(depth: f64, magnitude: f64) -> CircleMarker {
        CircleMarker {
            id: None,
            position: LatLng::new(10.0, 20.0),
            depth,
            magnitude,
            place: "Test".into(),
            url: None,
            title: None,
            style: MarkerStyle::for_quake(depth, magnitude * 5.0),
            popup: String::new(),
        }
    }

    async fn overlay_len(ctx: &AppContext, kind: OverlayKind) -> usize {
        match kind {
            OverlayKind::TectonicPlates => ctx.plates.read().await.len(),
            OverlayKind::Earthquakes => ctx.earthquakes.read().await.len(),
        }
    }

    fn context() -> AppContext {
        AppContext::from_settings(&Settings::default()).unwrap()
    }

    #[tokio::test]
    async fn successful_load_populates_only_its_group() {
        let ctx = context();
        let event = ctx
            .attach_earthquakes(Ok(OverlayLoad {
                items: vec![marker(95.0, 5.0), marker(5.0, 1.0)],
                skipped: 1,
            }))
            .await;
        assert_eq!(event.event_type, OVERLAY_LOADED);
        assert_eq!(event.data.features, Some(2));
        assert_eq!(event.data.skipped, Some(1));
        assert_eq!(overlay_len(&ctx, OverlayKind::Earthquakes).await, 2);
        assert_eq!(overlay_len(&ctx, OverlayKind::TectonicPlates).await, 0);

        let summaries = ctx.overlay_summaries().await;
        assert!(matches!(summaries[0].status, OverlayStatus::Pending));
        assert!(matches!(summaries[1].status, OverlayStatus::Loaded { features: 2, skipped: 1, .. }));
    }

    #[tokio::test]
    async fn failed_load_is_reported_and_group_stays_empty() {
        let ctx = context();
        let event = ctx
            .attach_plates(Err(FeedError::invalid(0, "boom")))
            .await;
        assert_eq!(event.event_type, OVERLAY_FAILED);
        assert_eq!(event.data.message.as_deref(), Some("feature 0: boom"));
        assert_eq!(overlay_len(&ctx, OverlayKind::TectonicPlates).await, 0);

        // the map itself is still fully configured
        let config = ctx.map_config().await;
        assert_eq!(config.active_basemap, "Default");
        assert_eq!(config.basemaps.len(), 4);
        assert_eq!(config.legend.entries.len(), 6);
    }

    #[tokio::test]
    async fn second_attach_is_refused() {
        let ctx = context();
        ctx.attach_earthquakes(Ok(OverlayLoad {
            items: vec![marker(1.0, 1.0)],
            skipped: 0,
        }))
        .await;
        let event = ctx
            .attach_earthquakes(Ok(OverlayLoad {
                items: vec![marker(1.0, 1.0), marker(2.0, 2.0)],
                skipped: 0,
            }))
            .await;
        assert_eq!(event.event_type, OVERLAY_FAILED);
        assert_eq!(overlay_len(&ctx, OverlayKind::Earthquakes).await, 1);
    }

    #[tokio::test]
    async fn basemap_selection_goes_through_the_map() {
        let ctx = context();
        let change = ctx.select_basemap("Water Color").await.unwrap();
        assert_eq!(change.previous.as_deref(), Some("Default"));
        assert_eq!(change.active, "Water Color");
        assert!(ctx.select_basemap("Nope").await.is_err());
        assert_eq!(ctx.map_config().await.active_basemap, "Water Color");
    }

    #[tokio::test]
    async fn overlay_visibility_is_tracked_per_group() {
        let ctx = context();
        ctx.set_overlay_visible(OverlayKind::TectonicPlates, false).await;
        let summaries = ctx.overlay_summaries().await;
        assert!(!summaries[0].visible);
        assert!(summaries[1].visible);
    }

    #[tokio::test]
    async fn unreachable_feeds_leave_empty_overlays() {
        let ctx = Arc::new(context());
        let settings = Settings {
            // nothing listens on port 9 of the loopback interface
            plates_url: "http://127.0.0.1:9/plates.json".into(),
            earthquakes_url: "http://127.0.0.1:9/quakes.json".into(),
            negative_magnitude: NegativeMagnitude::Preserve,
            ..Settings::default()
        };
        let client = FeedClient::new(std::time::Duration::from_secs(2)).unwrap();
        let (tx, mut rx) = broadcast::channel(4);

        Arc::clone(&ctx).load_overlays(client, &settings, Some(tx)).await;

        for _ in 0..2 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.event_type, OVERLAY_FAILED);
            assert!(event.data.message.unwrap().contains("127.0.0.1:9"));
        }
        for summary in ctx.overlay_summaries().await {
            assert!(matches!(summary.status, OverlayStatus::Failed { .. }));
        }
        let bootstrap = ctx.bootstrap().await;
        assert_eq!(bootstrap.overlays["earthquakes"]["features"], serde_json::json!([]));
    }
}

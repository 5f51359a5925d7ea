use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::constants::{EARTHQUAKES_LAYER, TECTONIC_PLATES_LAYER};
use crate::feed::{
    Earthquake, Feature, FeatureCollection, FeedError, PlateBoundary, PlateProperties,
    QuakeProperties,
};
use crate::fetch::FeedClient;
use crate::style::{CircleMarker, NegativeMagnitude, PlateLine, ToFeature};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OverlayError {
    #[error("overlay '{0}' has already been loaded")]
    AlreadyLoaded(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayKind {
    TectonicPlates,
    Earthquakes,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 2] = [OverlayKind::TectonicPlates, OverlayKind::Earthquakes];

    pub fn layer_name(&self) -> &'static str {
        match self {
            OverlayKind::TectonicPlates => TECTONIC_PLATES_LAYER,
            OverlayKind::Earthquakes => EARTHQUAKES_LAYER,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            OverlayKind::TectonicPlates => "tectonic-plates",
            OverlayKind::Earthquakes => "earthquakes",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OverlayStatus {
    Pending,
    Loaded {
        features: usize,
        skipped: usize,
        loaded_at: DateTime<Utc>,
    },
    Failed {
        reason: String,
        at: DateTime<Utc>,
    },
}

/// Named collection of drawable features, toggled as one unit.
///
/// Starts empty and pending, is settled at most once (loaded or failed),
/// and is never refreshed afterwards.
#[derive(Debug, Clone)]
pub struct LayerGroup<T> {
    name: String,
    visible: bool,
    status: OverlayStatus,
    items: Vec<T>,
}

impl<T> LayerGroup<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            visible: true,
            status: OverlayStatus::Pending,
            items: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn status(&self) -> &OverlayStatus {
        &self.status
    }

    pub fn populate(&mut self, load: OverlayLoad<T>) -> Result<(), OverlayError> {
        self.ensure_pending()?;
        self.status = OverlayStatus::Loaded {
            features: load.items.len(),
            skipped: load.skipped,
            loaded_at: Utc::now(),
        };
        self.items = load.items;
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: String) -> Result<(), OverlayError> {
        self.ensure_pending()?;
        self.status = OverlayStatus::Failed {
            reason,
            at: Utc::now(),
        };
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), OverlayError> {
        match self.status {
            OverlayStatus::Pending => Ok(()),
            _ => Err(OverlayError::AlreadyLoaded(self.name.clone())),
        }
    }
}

impl<T: ToFeature> LayerGroup<T> {
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self.items.iter().map(ToFeature::to_feature).collect();
        json!({
            "type": "FeatureCollection",
            "name": self.name,
            "features": features,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLoad<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

pub type OverlayResult<T> = Result<OverlayLoad<T>, FeedError>;

/// Converts every feature with `render`, skipping the ones it rejects.
pub fn render_collection<P, T, F>(collection: FeatureCollection<P>, mut render: F) -> OverlayLoad<T>
where
    F: FnMut(usize, Feature<P>) -> Result<T, FeedError>,
{
    let mut items = Vec::with_capacity(collection.features.len());
    let mut skipped = 0;
    for (index, feature) in collection.features.into_iter().enumerate() {
        match render(index, feature) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!("Skipping feature: {e}");
                skipped += 1;
            }
        }
    }
    OverlayLoad { items, skipped }
}

/// Fetches `url` and renders it feature by feature.
pub async fn run_pipeline<P, T, F>(client: &FeedClient, url: &str, render: F) -> OverlayResult<T>
where
    P: DeserializeOwned + Default,
    F: FnMut(usize, Feature<P>) -> Result<T, FeedError>,
{
    let collection = client.fetch_collection::<P>(url).await?;
    if let Some(metadata) = &collection.metadata {
        debug!(
            "{} (generated {:?}, {:?} events)",
            metadata.title.as_deref().unwrap_or(url),
            metadata.generated,
            metadata.count
        );
    }
    let load = render_collection(collection, render);
    info!(
        "Fetched {} features from {} ({} skipped)",
        load.items.len(),
        url,
        load.skipped
    );
    Ok(load)
}

pub async fn load_tectonic_plates(client: &FeedClient, url: &str) -> OverlayResult<PlateLine> {
    run_pipeline::<PlateProperties, _, _>(client, url, |index, feature| {
        PlateBoundary::from_feature(index, feature).map(PlateLine::from)
    })
    .await
}

pub async fn load_earthquakes(
    client: &FeedClient,
    url: &str,
    policy: NegativeMagnitude,
) -> OverlayResult<CircleMarker> {
    run_pipeline::<QuakeProperties, _, _>(client, url, |index, feature| {
        let quake = Earthquake::from_feature(index, feature)?;
        CircleMarker::from_quake(index, quake, policy)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parse_collection;

    #[test]
    fn group_is_populated_only_once() {
        let mut group: LayerGroup<u32> = LayerGroup::new("Numbers");
        assert_eq!(group.status(), &OverlayStatus::Pending);
        group
            .populate(OverlayLoad {
                items: vec![1, 2],
                skipped: 0,
            })
            .unwrap();
        assert_eq!(group.len(), 2);

        let err = group
            .populate(OverlayLoad {
                items: vec![3],
                skipped: 0,
            })
            .unwrap_err();
        assert_eq!(err, OverlayError::AlreadyLoaded("Numbers".into()));
        assert_eq!(group.len(), 2);
        assert!(matches!(group.status(), OverlayStatus::Loaded { features: 2, .. }));
        assert!(group.mark_failed("late".into()).is_err());
    }

    #[test]
    fn failed_group_stays_empty() {
        let mut group: LayerGroup<u32> = LayerGroup::new("Numbers");
        group.mark_failed("timeout".into()).unwrap();
        assert_eq!(group.len(), 0);
        assert!(matches!(group.status(), OverlayStatus::Failed { reason, .. } if reason == "timeout"));
    }

    #[test]
    fn invalid_features_are_skipped_not_fatal() {
        let body = br#"{"type": "FeatureCollection", "features": [
            {"properties": {"mag": 4.0, "place": "A"}, "geometry": {"type": "Point", "coordinates": [1, 2, 12]}},
            {"properties": {"mag": 3.1, "place": "B"}, "geometry": {"type": "LineString", "coordinates": [[1, 2], [3, 4]]}},
            {"properties": {"mag": 2.0, "place": "C"}, "geometry": {"type": "Point", "coordinates": [1, 2]}}
        ]}"#;
        let collection = parse_collection::<QuakeProperties>("test://q", body).unwrap();
        let load = render_collection(collection, |index, feature| {
            let quake = Earthquake::from_feature(index, feature)?;
            CircleMarker::from_quake(index, quake, NegativeMagnitude::Preserve)
        });
        assert_eq!(load.items.len(), 1);
        assert_eq!(load.skipped, 2);
        assert_eq!(load.items[0].style.fill_color, "#cafc03");
        assert_eq!(load.items[0].style.radius, 20.0);
    }

    #[test]
    fn null_properties_skip_only_that_feature() {
        let body = br#"{"type": "FeatureCollection", "features": [
            {"properties": {"mag": 4.0, "place": "A"}, "geometry": {"type": "Point", "coordinates": [1, 2, 12]}},
            {"properties": null, "geometry": {"type": "Point", "coordinates": [1, 2, 12]}}
        ]}"#;
        let collection = parse_collection::<QuakeProperties>("test://q", body).unwrap();
        let load = render_collection(collection, |index, feature| {
            let quake = Earthquake::from_feature(index, feature)?;
            CircleMarker::from_quake(index, quake, NegativeMagnitude::Preserve)
        });
        assert_eq!(load.items.len(), 1);
        assert_eq!(load.skipped, 1);
        assert_eq!(load.items[0].place, "A");
    }

    #[test]
    fn empty_collection_yields_empty_group() {
        let body = br#"{"type": "FeatureCollection", "features": []}"#;
        let collection = parse_collection::<PlateProperties>("test://p", body).unwrap();
        let load = render_collection(collection, |index, feature| {
            PlateBoundary::from_feature(index, feature).map(PlateLine::from)
        });
        let mut group = LayerGroup::new(TECTONIC_PLATES_LAYER);
        group.populate(load).unwrap();
        assert_eq!(group.len(), 0);
        assert_eq!(group.to_geojson()["features"].as_array().map(Vec::len), Some(0));
    }

    async fn serve_feeds() -> String {
        use axum::{http::StatusCode, routing::get, Router};

        let app = Router::new()
            .route(
                "/quakes.geojson",
                get(|| async {
                    r#"{"type": "FeatureCollection",
                        "metadata": {"title": "Loopback", "count": 2},
                        "features": [
                        {"id": "a", "properties": {"mag": 0, "place": "Zero"},
                         "geometry": {"type": "Point", "coordinates": [-118.0, 34.0, 5.0]}},
                        {"id": "b", "properties": {"mag": -0.5, "place": "Small"},
                         "geometry": {"type": "Point", "coordinates": [-118.0, 34.0, 31.0]}}
                    ]}"#
                }),
            )
            .route("/broken.geojson", get(|| async { "{\"type\": " }))
            .route(
                "/missing.geojson",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client() -> FeedClient {
        FeedClient::new(std::time::Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn loads_earthquakes_over_http() {
        let base = serve_feeds().await;
        let url = format!("{base}/quakes.geojson");

        let load = load_earthquakes(&client(), &url, NegativeMagnitude::Preserve)
            .await
            .unwrap();
        assert_eq!(load.items.len(), 2);
        assert_eq!(load.items[0].style.radius, 1.0);
        assert_eq!(load.items[1].style.radius, -2.5);
        assert_eq!(load.items[1].style.fill_color, "#fcad03");

        let load = load_earthquakes(&client(), &url, NegativeMagnitude::Reject)
            .await
            .unwrap();
        assert_eq!(load.items.len(), 1);
        assert_eq!(load.skipped, 1);
    }

    #[tokio::test]
    async fn http_errors_fail_the_whole_overlay() {
        let base = serve_feeds().await;

        let url = format!("{base}/missing.geojson");
        let err = load_tectonic_plates(&client(), &url).await.unwrap_err();
        assert!(matches!(err, FeedError::Status { .. }));
        assert!(err.to_string().contains(&url));

        let url = format!("{base}/broken.geojson");
        let err = load_earthquakes(&client(), &url, NegativeMagnitude::Preserve)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Malformed { .. }));
        assert!(err.to_string().contains(&url));
    }

    #[test]
    fn slugs_round_trip() {
        for kind in OverlayKind::ALL {
            assert_eq!(OverlayKind::from_slug(kind.slug()), Some(kind));
        }
        assert_eq!(OverlayKind::from_slug("faults"), None);
        assert_eq!(OverlayKind::Earthquakes.layer_name(), "Earthquake Data");
    }
}

use serde::Serialize;

use crate::map::{MapError, MapWidget};
use crate::overlay::{LayerGroup, OverlayKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayToggle {
    pub slug: &'static str,
    pub name: &'static str,
}

/// Radio selection over basemaps plus one checkbox per overlay.
///
/// Holds no selection state of its own: the active basemap lives in the
/// map and visibility lives in each layer group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerControl {
    pub basemaps: Vec<String>,
    pub overlays: Vec<OverlayToggle>,
}

impl LayerControl {
    pub fn new(map: &MapWidget, overlays: &[OverlayKind]) -> Self {
        Self {
            basemaps: map.basemaps().names(),
            overlays: overlays
                .iter()
                .map(|kind| OverlayToggle {
                    slug: kind.slug(),
                    name: kind.layer_name(),
                })
                .collect(),
        }
    }

    pub fn select_basemap(
        &self,
        map: &mut MapWidget,
        name: &str,
    ) -> Result<Option<String>, MapError> {
        map.select_basemap(name)
    }

    pub fn toggle_overlay<T>(&self, group: &mut LayerGroup<T>, visible: bool) {
        group.set_visible(visible);
    }

    pub fn overlay(&self, slug: &str) -> Option<OverlayKind> {
        self.overlays
            .iter()
            .find(|toggle| toggle.slug == slug)
            .and_then(|toggle| OverlayKind::from_slug(toggle.slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basemap::standard_basemaps;
    use crate::map::{create_map, LatLng};

    #[test]
    fn lists_basemaps_and_overlays() {
        let map = create_map(
            "map",
            LatLng::new(0.0, 0.0),
            2,
            standard_basemaps(),
            "Default",
        )
        .unwrap();
        let control = LayerControl::new(&map, &OverlayKind::ALL);
        assert_eq!(control.basemaps.len(), 4);
        assert_eq!(
            control.overlays.iter().map(|o| o.name).collect::<Vec<_>>(),
            vec!["Tectonic Plates", "Earthquake Data"]
        );
        assert_eq!(control.overlay("earthquakes"), Some(OverlayKind::Earthquakes));
        assert_eq!(control.overlay("volcanoes"), None);
    }

    #[test]
    fn overlay_toggles_are_independent_of_basemap() {
        let mut map = create_map(
            "map",
            LatLng::new(0.0, 0.0),
            2,
            standard_basemaps(),
            "Default",
        )
        .unwrap();
        let control = LayerControl::new(&map, &OverlayKind::ALL);
        let mut quakes: LayerGroup<u8> = LayerGroup::new("Earthquake Data");
        let plates: LayerGroup<u8> = LayerGroup::new("Tectonic Plates");

        control.toggle_overlay(&mut quakes, false);
        control.select_basemap(&mut map, "GrayScale").unwrap();

        assert!(!quakes.is_visible());
        assert!(plates.is_visible());
        assert!(map.is_active("GrayScale"));
    }
}

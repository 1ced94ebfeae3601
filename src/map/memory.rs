use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use crate::model::route::RoutePoint;

use super::surface::{CircleMarkerStyle, LayerId, MapSurface, PolylineStyle};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Layer {
    Tiles {
        url_template: String,
        attribution: String,
    },
    Polyline {
        points: Vec<RoutePoint>,
        style: PolylineStyle,
    },
    CircleMarker {
        at: RoutePoint,
        style: CircleMarkerStyle,
        tooltip: String,
    },
    Marker {
        at: RoutePoint,
        title: String,
        popup: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: RoutePoint,
    pub zoom: u8,
}

/// A surface that only records what was drawn, for headless runs and tests.
#[derive(Debug, Default, Serialize)]
pub struct InMemorySurface {
    views_created: usize,
    viewport: Option<Viewport>,
    layers: BTreeMap<LayerId, Layer>,
    open_popup: Option<LayerId>,
    next_layer: u64,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views_created(&self) -> usize {
        self.views_created
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn layers(&self) -> impl Iterator<Item = (&LayerId, &Layer)> {
        self.layers.iter()
    }

    pub fn opened_popup(&self) -> Option<LayerId> {
        self.open_popup
    }

    pub fn count(&self, pred: impl Fn(&Layer) -> bool) -> usize {
        self.layers.values().filter(|l| pred(l)).count()
    }

    pub fn marker_count(&self) -> usize {
        self.count(|l| matches!(l, Layer::Marker { .. }))
    }

    fn insert(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        trace!("adding {id}: {layer:?}");
        self.layers.insert(id, layer);
        id
    }

    fn marker_mut(&mut self, id: LayerId) -> Option<(&mut RoutePoint, &mut Option<String>)> {
        match self.layers.get_mut(&id) {
            Some(Layer::Marker { at, popup, .. }) => Some((at, popup)),
            _ => None,
        }
    }
}

impl MapSurface for InMemorySurface {
    fn create_view(&mut self, center: RoutePoint, zoom: u8) {
        self.views_created += 1;
        self.viewport = Some(Viewport { center, zoom });
    }

    fn add_tile_layer(&mut self, url_template: &str, attribution: &str) -> LayerId {
        self.insert(Layer::Tiles {
            url_template: url_template.to_string(),
            attribution: attribution.to_string(),
        })
    }

    fn add_polyline(&mut self, points: &[RoutePoint], style: PolylineStyle) -> LayerId {
        self.insert(Layer::Polyline {
            points: points.to_vec(),
            style,
        })
    }

    fn add_circle_marker(
        &mut self,
        at: RoutePoint,
        style: CircleMarkerStyle,
        tooltip: String,
    ) -> LayerId {
        self.insert(Layer::CircleMarker { at, style, tooltip })
    }

    fn add_marker(&mut self, at: RoutePoint, title: &str) -> LayerId {
        self.insert(Layer::Marker {
            at,
            title: title.to_string(),
            popup: None,
        })
    }

    fn set_marker_position(&mut self, marker: LayerId, to: RoutePoint) {
        if let Some((at, _)) = self.marker_mut(marker) {
            *at = to;
        }
    }

    fn bind_popup(&mut self, marker: LayerId, html: String) {
        if let Some((_, popup)) = self.marker_mut(marker) {
            *popup = Some(html);
        }
    }

    fn set_popup_content(&mut self, marker: LayerId, html: String) {
        // content only changes on a popup that was bound before
        if let Some((_, Some(popup))) = self.marker_mut(marker) {
            *popup = html;
        }
    }

    fn open_popup(&mut self, marker: LayerId) {
        if matches!(
            self.layers.get(&marker),
            Some(Layer::Marker { popup: Some(_), .. })
        ) {
            self.open_popup = Some(marker);
        }
    }

    fn pan_to(&mut self, center: RoutePoint) {
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.center = center;
        }
    }

    fn set_view(&mut self, center: RoutePoint, zoom: u8) {
        self.viewport = Some(Viewport { center, zoom });
    }

    fn remove_layer(&mut self, layer: LayerId) -> bool {
        if self.open_popup == Some(layer) {
            self.open_popup = None;
        }
        self.layers.remove(&layer).is_some()
    }
}

#[test]
fn test_marker_lifecycle() {
    let mut surface = InMemorySurface::new();
    let a = RoutePoint::new(1.0, 2.0);
    let b = RoutePoint::new(3.0, 4.0);
    let marker = surface.add_marker(a, "bus");
    surface.set_popup_content(marker, "ignored".into());
    assert_eq!(
        surface.layer(marker),
        Some(&Layer::Marker {
            at: a,
            title: "bus".into(),
            popup: None
        })
    );

    surface.bind_popup(marker, "<b>hi</b>".into());
    surface.set_marker_position(marker, b);
    surface.open_popup(marker);
    assert_eq!(surface.opened_popup(), Some(marker));
    assert!(matches!(surface.layer(marker), Some(Layer::Marker { at, .. }) if *at == b));

    assert!(surface.remove_layer(marker));
    assert!(!surface.remove_layer(marker));
    assert_eq!(surface.opened_popup(), None);
    assert_eq!(surface.marker_count(), 0);
}

use tracing::{debug, info};

use crate::model::{Bus, Route};

use super::surface::{CircleMarkerStyle, LayerId, MapSurface, PolylineStyle};

pub const TILE_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";
const ROUTE_COLOR: &str = "#1e90ff";

/// Draws the route and keeps one marker per bus on a [`MapSurface`].
#[derive(Debug)]
pub struct MapView<S> {
    surface: S,
    initial_zoom: u8,
    focus_zoom: u8,
    initialized: bool,
    route_line: Option<LayerId>,
    stop_markers: Vec<LayerId>,
}

impl<S: MapSurface> MapView<S> {
    pub fn new(surface: S, initial_zoom: u8, focus_zoom: u8) -> Self {
        Self {
            surface,
            initial_zoom,
            focus_zoom,
            initialized: false,
            route_line: None,
            stop_markers: Vec::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn route_line(&self) -> Option<LayerId> {
        self.route_line
    }

    pub fn stop_markers(&self) -> &[LayerId] {
        &self.stop_markers
    }

    /// Sets up the view, tiles, route line and stops. Later calls are no-ops
    /// so a page never holds more than one map.
    pub fn initialize_once(&mut self, route: &Route) -> bool {
        if self.initialized {
            return false;
        }
        info!("initializing map for {} ({} stops)", route.name(), route.len());
        self.surface.create_view(route.first(), self.initial_zoom);
        self.surface.add_tile_layer(TILE_URL_TEMPLATE, TILE_ATTRIBUTION);
        self.route_line = Some(self.surface.add_polyline(
            route.points(),
            PolylineStyle {
                color: ROUTE_COLOR.to_string(),
                weight: 4,
                opacity: 0.8,
            },
        ));
        self.stop_markers = route
            .points()
            .iter()
            .enumerate()
            .map(|(i, point)| {
                self.surface.add_circle_marker(
                    *point,
                    CircleMarkerStyle {
                        radius: 4,
                        color: ROUTE_COLOR.to_string(),
                        fill_color: "#fff".to_string(),
                        fill_opacity: 1.0,
                    },
                    format!("Stop {}", i + 1),
                )
            })
            .collect();
        self.initialized = true;
        true
    }

    pub fn upsert_bus_marker(&mut self, bus: &mut Bus, route: &Route, popup: String) {
        let at = route.point(bus.index);
        match bus.marker {
            Some(marker) => {
                self.surface.set_marker_position(marker, at);
                self.surface.set_popup_content(marker, popup);
            }
            None => {
                let marker = self.surface.add_marker(at, &bus.id.0);
                self.surface.bind_popup(marker, popup);
                debug!("bus {} got marker {marker} at {at}", bus.id);
                bus.marker = Some(marker);
            }
        }
    }

    pub fn focus(&mut self, bus: &Bus, route: &Route) {
        self.surface.set_view(route.point(bus.index), self.focus_zoom);
        if let Some(marker) = bus.marker {
            self.surface.open_popup(marker);
        }
    }

    pub fn marker_clicked(&mut self, bus: &Bus, route: &Route) {
        if let Some(marker) = bus.marker {
            self.surface.open_popup(marker);
        }
        self.surface.pan_to(route.point(bus.index));
    }

    /// Takes every marker away from its bus and off the surface.
    pub fn remove_all_bus_markers(&mut self, buses: &mut [Bus]) {
        for bus in buses {
            if let Some(marker) = bus.marker.take() {
                self.surface.remove_layer(marker);
            }
        }
    }
}

#[cfg(test)]
use crate::map::memory::{InMemorySurface, Layer};

#[cfg(test)]
fn view() -> MapView<InMemorySurface> {
    MapView::new(InMemorySurface::new(), 13, 15)
}

#[test]
fn test_initialize_once_is_idempotent() {
    let route = Route::demo_express();
    let mut map = view();
    assert!(map.initialize_once(&route));
    assert!(!map.initialize_once(&route));

    let surface = map.surface();
    assert_eq!(surface.views_created(), 1);
    assert_eq!(surface.count(|l| matches!(l, Layer::Polyline { .. })), 1);
    assert_eq!(surface.count(|l| matches!(l, Layer::Tiles { .. })), 1);
    assert_eq!(
        surface.count(|l| matches!(l, Layer::CircleMarker { .. })),
        route.len()
    );
    assert_eq!(map.stop_markers().len(), route.len());
    assert_eq!(surface.viewport().unwrap().center, route.first());
    assert_eq!(surface.viewport().unwrap().zoom, 13);
}

#[test]
fn test_stop_tooltips_are_one_indexed() {
    let route = Route::demo_express();
    let mut map = view();
    map.initialize_once(&route);
    let first = map.stop_markers()[0];
    let last = *map.stop_markers().last().unwrap();
    assert!(
        matches!(map.surface().layer(first), Some(Layer::CircleMarker { tooltip, .. }) if tooltip == "Stop 1")
    );
    assert!(
        matches!(map.surface().layer(last), Some(Layer::CircleMarker { tooltip, .. }) if tooltip == "Stop 6")
    );
}

#[test]
fn test_upsert_creates_then_moves() {
    let route = Route::demo_express();
    let mut map = view();
    map.initialize_once(&route);
    let mut bus = Bus::new("13E MMroad".into(), 0, 25);

    map.upsert_bus_marker(&mut bus, &route, "first".into());
    let marker = bus.marker.unwrap();
    bus.advance(&route);
    map.upsert_bus_marker(&mut bus, &route, "second".into());

    assert_eq!(bus.marker, Some(marker));
    assert_eq!(map.surface().marker_count(), 1);
    assert_eq!(
        map.surface().layer(marker),
        Some(&Layer::Marker {
            at: route.point(1),
            title: "13E MMroad".into(),
            popup: Some("second".into()),
        })
    );
}

#[test]
fn test_focus_and_click() {
    let route = Route::demo_express();
    let mut map = view();
    map.initialize_once(&route);
    let mut bus = Bus::new("a".into(), 3, 20);
    map.upsert_bus_marker(&mut bus, &route, "popup".into());

    map.focus(&bus, &route);
    let viewport = map.surface().viewport().unwrap();
    assert_eq!(viewport.center, route.point(3));
    assert_eq!(viewport.zoom, 15);
    assert_eq!(map.surface().opened_popup(), bus.marker);

    bus.advance(&route);
    map.marker_clicked(&bus, &route);
    let viewport = map.surface().viewport().unwrap();
    assert_eq!(viewport.center, route.point(4));
    assert_eq!(viewport.zoom, 15);
}

#[test]
fn test_remove_all_bus_markers() {
    let route = Route::demo_express();
    let mut map = view();
    map.initialize_once(&route);
    let mut buses = vec![Bus::new("a".into(), 0, 20), Bus::new("b".into(), 2, 25)];
    for bus in buses.iter_mut() {
        map.upsert_bus_marker(bus, &route, String::new());
    }
    assert_eq!(map.surface().marker_count(), 2);

    map.remove_all_bus_markers(&mut buses);
    assert_eq!(map.surface().marker_count(), 0);
    assert!(buses.iter().all(|b| b.marker.is_none()));
    assert_eq!(map.stop_markers().len(), route.len());
}

use std::fmt::Display;

use serde::Serialize;

use crate::model::route::RoutePoint;

/// Handle to anything added on top of the map: tiles, lines, markers.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LayerId(pub u64);

impl Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolylineStyle {
    pub color: String,
    pub weight: u32,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleMarkerStyle {
    pub radius: u32,
    pub color: String,
    pub fill_color: String,
    pub fill_opacity: f64,
}

/// The mapping capability the views draw on.
///
/// Operations on a handle that is not on the surface are ignored.
pub trait MapSurface {
    fn create_view(&mut self, center: RoutePoint, zoom: u8);
    fn add_tile_layer(&mut self, url_template: &str, attribution: &str) -> LayerId;
    fn add_polyline(&mut self, points: &[RoutePoint], style: PolylineStyle) -> LayerId;
    fn add_circle_marker(
        &mut self,
        at: RoutePoint,
        style: CircleMarkerStyle,
        tooltip: String,
    ) -> LayerId;
    fn add_marker(&mut self, at: RoutePoint, title: &str) -> LayerId;
    fn set_marker_position(&mut self, marker: LayerId, at: RoutePoint);
    fn bind_popup(&mut self, marker: LayerId, html: String);
    fn set_popup_content(&mut self, marker: LayerId, html: String);
    fn open_popup(&mut self, marker: LayerId);
    fn pan_to(&mut self, center: RoutePoint);
    fn set_view(&mut self, center: RoutePoint, zoom: u8);
    /// Returns whether the layer was present.
    fn remove_layer(&mut self, layer: LayerId) -> bool;
}

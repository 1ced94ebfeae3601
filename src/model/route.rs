use std::fmt::{Debug, Display};

use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
}

impl RoutePoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl Debug for RoutePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

impl Display for RoutePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

impl From<(f64, f64)> for RoutePoint {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

const DEMO_EXPRESS: [RoutePoint; 6] = [
    RoutePoint::new(12.9716, 77.5946),
    RoutePoint::new(12.9748, 77.5974),
    RoutePoint::new(12.9796, 77.6008),
    RoutePoint::new(12.9870, 77.6045),
    RoutePoint::new(12.9945, 77.6078),
    RoutePoint::new(13.0010, 77.6100),
];

/// A closed loop of stops. The stop after the last point is the first one
/// again, so every index lookup wraps modulo the route length.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    name: String,
    points: Vec<RoutePoint>,
}

impl Route {
    pub fn new(name: impl Into<String>, points: Vec<RoutePoint>) -> anyhow::Result<Self> {
        let name = name.into();
        if points.is_empty() {
            bail!("route {name:?} must have at least one point");
        }
        Ok(Self { name, points })
    }

    /// The example route offered by the trip form.
    pub fn demo_express() -> Self {
        Self {
            name: "Demo Express".to_string(),
            points: DEMO_EXPRESS.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn first(&self) -> RoutePoint {
        self.points[0]
    }

    pub fn point(&self, index: usize) -> RoutePoint {
        self.points[index % self.points.len()]
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.points.len()
    }

    /// Stops left before reaching the last point of the loop.
    pub fn remaining_stops(&self, index: usize) -> usize {
        let len = self.points.len();
        (len - 1 + len - index % len) % len
    }
}

#[test]
fn test_empty_route_rejected() {
    assert!(Route::new("empty", vec![]).is_err());
    assert!(Route::new("single", vec![RoutePoint::new(1.0, 2.0)]).is_ok());
}

#[test]
fn test_point_wraps_around() {
    let route = Route::demo_express();
    assert_eq!(route.len(), 6);
    assert_eq!(route.point(6), route.first());
    assert_eq!(route.point(13), route.points()[1]);
    assert_eq!(route.next_index(5), 0);
}

#[test]
fn test_remaining_stops_bounds() {
    for len in 1..=8 {
        let points = (0..len).map(|i| RoutePoint::new(i as f64, 0.0)).collect();
        let route = Route::new("loop", points).unwrap();
        for index in 0..len {
            let stops = route.remaining_stops(index);
            assert!(stops <= len - 1);
            assert_eq!(stops, (len - 1 + len - index) % len);
        }
        assert_eq!(route.remaining_stops(len - 1), 0);
    }
}

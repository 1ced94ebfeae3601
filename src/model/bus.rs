use std::fmt::{Debug, Display};

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use serde::Serialize;

use crate::{config::EtaTiming, map::surface::LayerId};

use super::route::Route;

const BASE_LATE_PROBABILITY: f64 = 0.35;
const MIN_LATE_PROBABILITY: f64 = 0.05;
const LATE_PROBABILITY_PER_KMPH: f64 = 0.02;
const REFERENCE_SPEED_KMPH: f64 = 20.0;

/// Bus identifiers are free text and may collide; lookups take the first match.
#[derive(Clone, Serialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BusId(pub String);

impl Debug for BusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl Display for BusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BusId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Bus {
    pub id: BusId,
    pub index: usize,
    pub speed_kmph: u32,
    // drawn once per tick so that every render of a tick agrees
    pub is_late: bool,
    pub marker: Option<LayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusEta {
    pub remaining_stops: usize,
    pub minutes_to_destination: i64,
    pub next_stop_arrival: NaiveDateTime,
    pub destination_eta: NaiveDateTime,
}

impl Bus {
    pub fn new(id: BusId, index: usize, speed_kmph: u32) -> Self {
        Self {
            id,
            index,
            speed_kmph,
            is_late: false,
            marker: None,
        }
    }

    /// Chance of being shown as late: falls linearly with speed, never below
    /// the floor.
    pub fn late_probability(&self) -> f64 {
        let speed = self.speed_kmph as f64;
        (BASE_LATE_PROBABILITY - (speed - REFERENCE_SPEED_KMPH) * LATE_PROBABILITY_PER_KMPH)
            .max(MIN_LATE_PROBABILITY)
    }

    pub fn draw_lateness<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.is_late = rng.random::<f64>() < self.late_probability();
    }

    pub fn advance(&mut self, route: &Route) {
        self.index = route.next_index(self.index);
    }

    pub fn eta(&self, route: &Route, timing: &EtaTiming, now: NaiveDateTime) -> BusEta {
        let remaining_stops = route.remaining_stops(self.index);
        let minutes_to_destination = timing.minutes_to_destination(remaining_stops);
        BusEta {
            remaining_stops,
            minutes_to_destination,
            next_stop_arrival: minutes_after(now, timing.next_stop_minutes),
            destination_eta: minutes_after(now, minutes_to_destination),
        }
    }
}

// saturates at the end of the calendar instead of panicking
fn minutes_after(now: NaiveDateTime, minutes: i64) -> NaiveDateTime {
    Duration::try_minutes(minutes)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(NaiveDateTime::MAX)
}

#[cfg(test)]
fn noon() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

#[test]
fn test_eta_at_last_stop() {
    let route = Route::demo_express();
    let bus = Bus::new("x".into(), route.len() - 1, 20);
    let eta = bus.eta(&route, &EtaTiming::default(), noon());
    assert_eq!(eta.remaining_stops, 0);
    assert_eq!(eta.minutes_to_destination, 2);
    assert_eq!(eta.destination_eta, noon() + Duration::minutes(2));
}

#[test]
fn test_eta_formula_for_every_index() {
    let route = Route::demo_express();
    for index in 0..route.len() {
        let bus = Bus::new("x".into(), index, 20);
        let eta = bus.eta(&route, &EtaTiming::default(), noon());
        assert!(eta.remaining_stops < route.len());
        assert_eq!(eta.minutes_to_destination, eta.remaining_stops as i64 * 2 + 2);
        assert_eq!(eta.next_stop_arrival, noon() + Duration::minutes(2));
    }
    let first = Bus::new("x".into(), 0, 20).eta(&route, &EtaTiming::default(), noon());
    assert_eq!(first.remaining_stops, 5);
    assert_eq!(first.minutes_to_destination, 12);
}

#[test]
fn test_late_probability_is_floored() {
    let prob = |speed| Bus::new("x".into(), 0, speed).late_probability();
    assert!((prob(20) - 0.35).abs() < 1e-9);
    assert!((prob(25) - 0.25).abs() < 1e-9);
    assert!((prob(30) - 0.15).abs() < 1e-9);
    assert!((prob(35) - 0.05).abs() < 1e-9);
    assert_eq!(prob(80), 0.05);
    assert!(prob(10) > prob(20));
}

#[test]
fn test_eta_saturates_instead_of_panicking() {
    let route = Route::demo_express();
    let timing = EtaTiming {
        minutes_per_stop: i64::MAX,
        buffer_minutes: 0,
        next_stop_minutes: i64::MAX,
    };
    let eta = Bus::new("x".into(), 0, 20).eta(&route, &timing, noon());
    assert_eq!(eta.next_stop_arrival, NaiveDateTime::MAX);
    assert_eq!(eta.destination_eta, NaiveDateTime::MAX);

    let late = Bus::new("x".into(), 0, 20).eta(&route, &EtaTiming::default(), NaiveDateTime::MAX);
    assert_eq!(late.next_stop_arrival, NaiveDateTime::MAX);
}

#[test]
fn test_advance_wraps() {
    let route = Route::demo_express();
    let mut bus = Bus::new("x".into(), 5, 20);
    bus.advance(&route);
    assert_eq!(bus.index, 0);
}

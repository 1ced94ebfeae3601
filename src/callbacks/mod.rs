use serde::Serialize;

use crate::{
    config::EtaTiming,
    model::{Bus, BusId, Route, RoutePoint},
};

pub mod log_ticks;

#[derive(Debug, Clone, Serialize)]
pub struct BusSnapshot<'a> {
    pub id: &'a BusId,
    pub stop: usize,
    pub position: RoutePoint,
    pub speed_kmph: u32,
    pub minutes_to_destination: i64,
    pub late: bool,
}

pub fn bus_snapshots<'a>(
    buses: &'a [Bus],
    route: &Route,
    timing: &EtaTiming,
) -> Vec<BusSnapshot<'a>> {
    buses
        .iter()
        .map(|bus| {
            let remaining = route.remaining_stops(bus.index);
            BusSnapshot {
                id: &bus.id,
                stop: bus.index + 1,
                position: route.point(bus.index),
                speed_kmph: bus.speed_kmph,
                minutes_to_destination: timing.minutes_to_destination(remaining),
                late: bus.is_late,
            }
        })
        .collect()
}

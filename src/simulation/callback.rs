use chrono::NaiveDateTime;

use crate::model::{Bus, Route};

pub trait SimulationCallback {
    fn visit_initialize(&mut self, _buses: &[Bus], _route: &Route, _time: NaiveDateTime) {}
    fn visit_tick(&mut self, _tick: u64, _buses: &[Bus], _route: &Route, _time: NaiveDateTime) {}
}

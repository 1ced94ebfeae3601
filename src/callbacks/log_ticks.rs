use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::{
    callbacks::bus_snapshots,
    config::EtaTiming,
    model::{Bus, Route},
    simulation::callback::SimulationCallback,
};

/// Logs the bus set as JSON after every tick.
pub struct TickLogCallback {
    name: String,
    timing: EtaTiming,
}

impl TickLogCallback {
    pub fn new(name: String, timing: EtaTiming) -> Self {
        Self { name, timing }
    }

    pub fn snapshot_json(&self, buses: &[Bus], route: &Route) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&bus_snapshots(buses, route, &self.timing))?)
    }
}

impl SimulationCallback for TickLogCallback {
    fn visit_initialize(&mut self, buses: &[Bus], route: &Route, time: NaiveDateTime) {
        info!("[{}] {} buses placed at {time}", self.name, buses.len());
        match self.snapshot_json(buses, route) {
            Ok(json) => debug!("[{}] initial: {json}", self.name),
            Err(err) => warn!("[{}] failed to serialize buses: {err}", self.name),
        }
    }

    fn visit_tick(&mut self, tick: u64, buses: &[Bus], route: &Route, time: NaiveDateTime) {
        match self.snapshot_json(buses, route) {
            Ok(json) => debug!("[{}] tick {tick} at {time}: {json}", self.name),
            Err(err) => warn!("[{}] failed to serialize buses: {err}", self.name),
        }
    }
}

#[test]
fn test_snapshot_json() {
    let route = Route::demo_express();
    let mut buses = vec![Bus::new("306 cleveland".into(), 5, 30)];
    buses[0].is_late = true;
    let mut cb = TickLogCallback::new("test".into(), EtaTiming::default());
    let json = cb.snapshot_json(&buses, &route).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["id"], "306 cleveland");
    assert_eq!(value[0]["stop"], 6);
    assert_eq!(value[0]["minutes_to_destination"], 2);
    assert_eq!(value[0]["late"], true);
    assert_eq!(value[0]["position"]["lat"], 13.001);

    let time = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 2)
        .unwrap();
    cb.visit_tick(1, &buses, &route, time);
    cb.visit_tick(2, &buses, &route, time);
}

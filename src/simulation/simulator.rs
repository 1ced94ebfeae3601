use chrono::{Duration, NaiveDateTime};
use derivative::Derivative;
use rand::rngs::SmallRng;
use tracing::{debug, info, trace};

use crate::{
    config::{EtaTiming, SessionConfig},
    map::{MapSurface, MapView},
    model::{Bus, BusId, Route},
    view::popup::popup_html,
};

use super::{
    callback::SimulationCallback,
    event_queue::EventQueue,
    sim_event::SessionEvent,
    ticker::{RepeatingTask, TimerId},
};

/// Where the `k`-th of `n` buses starts: spread evenly over the loop.
pub fn start_index(k: usize, n: usize, route_len: usize) -> usize {
    (k * route_len / n) % route_len
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct BusSimulator {
    buses: Vec<Bus>,
    ticker: RepeatingTask,
    timing: EtaTiming,
    base_speed_kmph: u32,
    speed_increment_kmph: u32,
    ticks: u64,

    #[derivative(Debug = "ignore")]
    rng: SmallRng,
    #[derivative(Debug = "ignore")]
    callbacks: Vec<Box<dyn SimulationCallback>>,
}

impl BusSimulator {
    pub fn new(
        config: &SessionConfig,
        interval: Duration,
        rng: SmallRng,
        callbacks: Vec<Box<dyn SimulationCallback>>,
    ) -> Self {
        Self {
            buses: Vec::new(),
            ticker: RepeatingTask::new(interval),
            timing: config.timing,
            base_speed_kmph: config.base_speed_kmph,
            speed_increment_kmph: config.speed_increment_kmph,
            ticks: 0,
            rng,
            callbacks,
        }
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn ticker(&self) -> &RepeatingTask {
        &self.ticker
    }

    pub fn timing(&self) -> &EtaTiming {
        &self.timing
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// First bus carrying `id`; identifiers are not unique.
    pub fn find(&self, id: &BusId) -> Option<&Bus> {
        self.buses.iter().find(|b| &b.id == id)
    }

    /// Replaces the bus set with one bus per seed id and restarts the ticks.
    ///
    /// Markers of the previous set are taken off the map first, and the
    /// previous timer is cancelled before the new one is scheduled.
    pub fn initialize<S: MapSurface>(
        &mut self,
        route: &Route,
        seed_ids: &[String],
        map: &mut MapView<S>,
        events: &mut EventQueue<SessionEvent>,
        now: NaiveDateTime,
    ) -> TimerId {
        map.remove_all_bus_markers(&mut self.buses);
        self.buses.clear();
        self.ticks = 0;

        let n = seed_ids.len();
        for (k, id) in seed_ids.iter().enumerate() {
            let index = start_index(k, n, route.len());
            let speed = u32::try_from(k)
                .ok()
                .and_then(|k| k.checked_mul(self.speed_increment_kmph))
                .and_then(|s| s.checked_add(self.base_speed_kmph))
                .unwrap_or(u32::MAX);
            let mut bus = Bus::new(BusId(id.clone()), index, speed);
            bus.draw_lateness(&mut self.rng);
            let popup = popup_html(&bus, route, &self.timing, now);
            map.upsert_bus_marker(&mut bus, route, popup);
            debug!("bus {} starts at stop {} going {speed} km/h", bus.id, index + 1);
            self.buses.push(bus);
        }

        let timer = self.ticker.schedule(events, now);
        info!("{} buses on {}, ticking with {timer}", self.buses.len(), route.name());
        self.callbacks
            .iter_mut()
            .for_each(|cb| cb.visit_initialize(&self.buses, route, now));
        timer
    }

    /// Moves every bus one stop along the loop and refreshes its marker.
    pub fn tick<S: MapSurface>(&mut self, route: &Route, map: &mut MapView<S>, now: NaiveDateTime) {
        for bus in self.buses.iter_mut() {
            bus.advance(route);
            bus.draw_lateness(&mut self.rng);
            let popup = popup_html(bus, route, &self.timing, now);
            map.upsert_bus_marker(bus, route, popup);
        }
        self.ticks += 1;
        trace!("tick {} at {now}", self.ticks);
        self.callbacks
            .iter_mut()
            .for_each(|cb| cb.visit_tick(self.ticks, &self.buses, route, now));
    }

    /// Runs a tick for a firing of `timer`. Stale timers are dropped.
    pub fn handle_timer<S: MapSurface>(
        &mut self,
        timer: TimerId,
        route: &Route,
        map: &mut MapView<S>,
        events: &mut EventQueue<SessionEvent>,
        time: NaiveDateTime,
    ) -> bool {
        if !self.ticker.fire(timer, events, time) {
            trace!("dropping stale {timer}");
            return false;
        }
        self.tick(route, map, time);
        true
    }
}

#[cfg(test)]
use std::{cell::RefCell, rc::Rc};

#[cfg(test)]
use rand::SeedableRng;

#[cfg(test)]
use crate::map::InMemorySurface;

#[cfg(test)]
fn start() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

#[cfg(test)]
fn seeds(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
fn setup(
    callbacks: Vec<Box<dyn SimulationCallback>>,
) -> (BusSimulator, MapView<InMemorySurface>, EventQueue<SessionEvent>) {
    let config = SessionConfig::default();
    let sim = BusSimulator::new(
        &config,
        Duration::seconds(2),
        SmallRng::seed_from_u64(727),
        callbacks,
    );
    let mut map = MapView::new(InMemorySurface::new(), 13, 15);
    map.initialize_once(&Route::demo_express());
    (sim, map, EventQueue::new())
}

#[test]
fn test_start_indices_and_speeds() {
    let route = Route::demo_express();
    let (mut sim, mut map, mut events) = setup(vec![]);
    sim.initialize(&route, &seeds(&["a", "b", "c", "d"]), &mut map, &mut events, start());

    let indices: Vec<_> = sim.buses().iter().map(|b| b.index).collect();
    let speeds: Vec<_> = sim.buses().iter().map(|b| b.speed_kmph).collect();
    assert_eq!(indices, vec![0, 1, 3, 4]);
    assert_eq!(speeds, vec![20, 25, 30, 35]);
    assert_eq!(map.surface().marker_count(), 4);
    assert!(sim.buses().iter().all(|b| b.marker.is_some()));
}

#[test]
fn test_start_index_never_leaves_route() {
    for len in 1..=7 {
        for n in 1..=9 {
            for k in 0..n {
                assert!(start_index(k, n, len) < len);
            }
        }
    }
    assert_eq!(start_index(0, 3, 1), 0);
}

#[test]
fn test_tick_advances_every_bus_by_one() {
    let route = Route::demo_express();
    let (mut sim, mut map, mut events) = setup(vec![]);
    sim.initialize(&route, &seeds(&["a", "b", "c", "d"]), &mut map, &mut events, start());

    for step in 1..=8 {
        let before: Vec<_> = sim.buses().iter().map(|b| b.index).collect();
        sim.tick(&route, &mut map, start() + Duration::seconds(2 * step));
        for (bus, prev) in sim.buses().iter().zip(before) {
            assert_eq!(bus.index, (prev + 1) % route.len());
            let marker = bus.marker.unwrap();
            assert!(matches!(
                map.surface().layer(marker),
                Some(crate::map::memory::Layer::Marker { at, .. }) if *at == route.point(bus.index)
            ));
        }
    }
    assert_eq!(sim.tick_count(), 8);
    assert_eq!(map.surface().marker_count(), 4);
}

#[test]
fn test_reinitialize_replaces_markers_and_timer() {
    let route = Route::demo_express();
    let (mut sim, mut map, mut events) = setup(vec![]);
    let first = sim.initialize(&route, &seeds(&["a", "b"]), &mut map, &mut events, start());
    let old_markers: Vec<_> = sim.buses().iter().filter_map(|b| b.marker).collect();

    let second = sim.initialize(
        &route,
        &seeds(&["c", "d", "e"]),
        &mut map,
        &mut events,
        start(),
    );

    assert_ne!(first, second);
    assert_eq!(sim.ticker().active_count(), 1);
    assert_eq!(events.len(), 1);
    assert_eq!(map.surface().marker_count(), 3);
    assert!(old_markers.iter().all(|m| map.surface().layer(*m).is_none()));
    assert!(!sim.handle_timer(first, &route, &mut map, &mut events, start()));
    assert_eq!(sim.tick_count(), 0);
}

#[test]
fn test_empty_seed_list() {
    let route = Route::demo_express();
    let (mut sim, mut map, mut events) = setup(vec![]);
    sim.initialize(&route, &[], &mut map, &mut events, start());
    assert!(sim.buses().is_empty());
    assert_eq!(sim.ticker().active_count(), 1);
}

#[test]
fn test_find_takes_first_match() {
    let route = Route::demo_express();
    let (mut sim, mut map, mut events) = setup(vec![]);
    sim.initialize(&route, &seeds(&["dup", "x", "dup"]), &mut map, &mut events, start());
    assert_eq!(sim.find(&"dup".into()).map(|b| b.index), Some(0));
    assert!(sim.find(&"missing".into()).is_none());
}

#[cfg(test)]
struct Recorder {
    seen: Rc<RefCell<Vec<u64>>>,
}

#[cfg(test)]
impl SimulationCallback for Recorder {
    fn visit_initialize(&mut self, _: &[Bus], _: &Route, _: NaiveDateTime) {
        self.seen.borrow_mut().push(0);
    }

    fn visit_tick(&mut self, tick: u64, _: &[Bus], _: &Route, _: NaiveDateTime) {
        self.seen.borrow_mut().push(tick);
    }
}

#[test]
fn test_callbacks_see_every_tick() {
    let seen = Rc::new(RefCell::new(vec![]));
    let route = Route::demo_express();
    let (mut sim, mut map, mut events) = setup(vec![Box::new(Recorder { seen: seen.clone() })]);
    let timer = sim.initialize(&route, &seeds(&["a"]), &mut map, &mut events, start());
    while let Some((_, time)) = events.pop() {
        if time > start() + Duration::seconds(6) {
            break;
        }
        sim.handle_timer(timer, &route, &mut map, &mut events, time);
    }
    assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
}

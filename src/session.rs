use chrono::{Duration, NaiveDateTime};
use rand::rngs::SmallRng;
use tracing::{debug, info};

use crate::{
    config::SessionConfig,
    intake::{Page, SubmitOutcome, TripForm, TripRequest},
    map::{MapSurface, MapView},
    model::{Bus, BusId, Route},
    simulation::{
        callback::SimulationCallback,
        event_queue::EventQueue,
        sim_event::{SessionEvent, SessionEventData},
        simulator::BusSimulator,
    },
    view::ListView,
};

/// Everything one open page knows: which half is shown, the chosen route,
/// the map, the buses and the list beside it.
#[derive(Debug)]
pub struct Session<S> {
    config: SessionConfig,
    page: Page,
    title: Option<String>,
    route: Option<Route>,
    map: MapView<S>,
    simulator: BusSimulator,
    list: ListView,
    events: EventQueue<SessionEvent>,
    now: NaiveDateTime,
}

impl<S: MapSurface> Session<S> {
    pub fn new(
        config: SessionConfig,
        surface: S,
        rng: SmallRng,
        start: NaiveDateTime,
        callbacks: Vec<Box<dyn SimulationCallback>>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let interval = config.interval()?;
        Ok(Self {
            map: MapView::new(surface, config.initial_zoom, config.focus_zoom),
            simulator: BusSimulator::new(&config, interval, rng, callbacks),
            config,
            page: Page::Welcome,
            title: None,
            route: None,
            list: ListView::new(),
            events: EventQueue::new(),
            now: start,
        })
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn map(&self) -> &MapView<S> {
        &self.map
    }

    pub fn list(&self) -> &ListView {
        &self.list
    }

    pub fn simulator(&self) -> &BusSimulator {
        &self.simulator
    }

    pub fn buses(&self) -> &[Bus] {
        self.simulator.buses()
    }

    pub fn pending_ticks(&self) -> usize {
        self.events
            .iter()
            .filter(|(event, _)| matches!(event, SessionEventData::Tick { .. }))
            .count()
    }

    /// Handles a submission of the trip form. Blank labels leave the session
    /// untouched.
    pub fn submit_trip(&mut self, form: &TripForm) -> SubmitOutcome {
        let Some(request) = TripRequest::from_form(form) else {
            debug!("ignoring incomplete trip form {form:?}");
            return SubmitOutcome::Ignored;
        };

        let route = Route::demo_express();
        self.title = Some(request.title());
        self.page = Page::MapShown;
        info!(
            "trip {:?} -> {:?} on {}",
            request.origin,
            request.destination,
            route.name()
        );

        self.map.initialize_once(&route);
        self.simulator.initialize(
            &route,
            &self.config.seed_ids,
            &mut self.map,
            &mut self.events,
            self.now,
        );
        self.list.render(self.simulator.buses(), &route, &self.config.timing);
        self.route = Some(route);
        SubmitOutcome::Started
    }

    pub fn simulate_until(&mut self, until: NaiveDateTime) {
        while self.events.peek().map(|e| e.1 <= until).unwrap_or(false) {
            self.simulate_step();
        }
        self.now = self.now.max(until);
    }

    pub fn simulate_for(&mut self, duration: Duration) {
        let until = self
            .now
            .checked_add_signed(duration)
            .unwrap_or(NaiveDateTime::MAX);
        self.simulate_until(until);
    }

    pub fn simulate_step(&mut self) {
        let Some((event, time)) = self.events.pop() else {
            return;
        };
        self.now = time;
        match event {
            SessionEventData::Tick { timer } => {
                let Some(route) = self.route.as_ref() else {
                    return;
                };
                if self
                    .simulator
                    .handle_timer(timer, route, &mut self.map, &mut self.events, time)
                {
                    self.list.render(self.simulator.buses(), route, &self.config.timing);
                }
            }
        }
    }

    /// Centers the map on the first bus named `id`. Unknown ids do nothing.
    pub fn focus_bus(&mut self, id: &BusId) -> bool {
        let (Some(route), Some(bus)) = (self.route.as_ref(), self.simulator.find(id)) else {
            return false;
        };
        self.map.focus(bus, route);
        true
    }

    pub fn click_bus_marker(&mut self, id: &BusId) -> bool {
        let (Some(route), Some(bus)) = (self.route.as_ref(), self.simulator.find(id)) else {
            return false;
        };
        self.map.marker_clicked(bus, route);
        true
    }

    /// The "Center" control of the `row`-th list entry.
    pub fn activate_list_row(&mut self, row: usize) -> bool {
        let Some(id) = self.list.activate(row).cloned() else {
            return false;
        };
        self.focus_bus(&id)
    }
}

#[cfg(test)]
use rand::SeedableRng;

#[cfg(test)]
use crate::map::InMemorySurface;

#[cfg(test)]
fn session() -> Session<InMemorySurface> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    Session::new(
        SessionConfig::default(),
        InMemorySurface::new(),
        SmallRng::seed_from_u64(727),
        start,
        vec![],
    )
    .unwrap()
}

#[test]
fn test_blank_origin_stays_on_welcome() {
    let mut session = session();
    assert_eq!(
        session.submit_trip(&TripForm::new("", "Downtown")),
        SubmitOutcome::Ignored
    );
    assert_eq!(session.page(), Page::Welcome);
    assert_eq!(session.title(), None);
    assert!(!session.map().is_initialized());
    assert!(session.buses().is_empty());
    assert_eq!(session.pending_ticks(), 0);
}

#[test]
fn test_submit_shows_map() {
    let mut session = session();
    assert_eq!(
        session.submit_trip(&TripForm::new("Majestic", "Hebbal")),
        SubmitOutcome::Started
    );
    assert_eq!(session.page(), Page::MapShown);
    assert_eq!(session.title(), Some("From Majestic → To Hebbal"));
    assert!(session.map().is_initialized());
    assert_eq!(session.buses().len(), 4);
    assert_eq!(session.list().rows().len(), 4);
    assert_eq!(session.pending_ticks(), 1);
}

#[test]
fn test_ticks_follow_the_clock() {
    let mut session = session();
    session.submit_trip(&TripForm::new("a", "b"));
    session.simulate_for(Duration::milliseconds(1999));
    assert_eq!(session.simulator().tick_count(), 0);
    session.simulate_for(Duration::milliseconds(1));
    assert_eq!(session.simulator().tick_count(), 1);
    session.simulate_for(Duration::seconds(10));
    assert_eq!(session.simulator().tick_count(), 6);

    let indices: Vec<_> = session.buses().iter().map(|b| b.index).collect();
    // six ticks on a six-stop loop bring everyone back
    assert_eq!(indices, vec![0, 1, 3, 4]);
    assert_eq!(session.list().rows()[0].minutes_to_destination, 12);
}

#[test]
fn test_resubmit_restarts_buses() {
    let mut session = session();
    session.submit_trip(&TripForm::new("a", "b"));
    session.simulate_for(Duration::seconds(3));
    session.submit_trip(&TripForm::new("c", "d"));

    assert_eq!(session.page(), Page::MapShown);
    assert_eq!(session.simulator().ticker().active_count(), 1);
    assert_eq!(session.pending_ticks(), 1);
    assert_eq!(session.map().surface().views_created(), 1);
    assert_eq!(session.map().surface().marker_count(), 4);
    assert_eq!(session.buses()[1].index, 1);
}

#[test]
fn test_focus_unknown_bus_does_nothing() {
    let mut session = session();
    assert!(!session.focus_bus(&"13E MMroad".into()));
    session.submit_trip(&TripForm::new("a", "b"));
    assert!(!session.focus_bus(&"nope".into()));
    assert!(session.focus_bus(&"13E MMroad".into()));
    assert!(session.activate_list_row(2));
    assert!(!session.activate_list_row(9));
}

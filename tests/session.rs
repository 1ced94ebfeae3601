use bus_tracker::{
    config::SessionConfig,
    intake::{Page, SubmitOutcome, TripForm},
    map::{memory::Layer, InMemorySurface},
    session::Session,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{rngs::SmallRng, SeedableRng};

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(18, 30, 0)
        .unwrap()
}

fn new_session(config: SessionConfig) -> Session<InMemorySurface> {
    Session::new(
        config,
        InMemorySurface::new(),
        SmallRng::seed_from_u64(42),
        start(),
        vec![],
    )
    .unwrap()
}

fn popup_of(session: &Session<InMemorySurface>, bus: usize) -> String {
    let marker = session.buses()[bus].marker.unwrap();
    match session.map().surface().layer(marker) {
        Some(Layer::Marker {
            popup: Some(html), ..
        }) => html.clone(),
        other => panic!("no popup for bus {bus}: {other:?}"),
    }
}

#[test]
fn test_full_trip() {
    let mut session = new_session(SessionConfig::default());
    assert_eq!(
        session.submit_trip(&TripForm::new("  ", "Downtown")),
        SubmitOutcome::Ignored
    );
    assert_eq!(session.page(), Page::Welcome);

    session.submit_trip(&TripForm::new("Majestic", "<Hebbal>"));
    assert_eq!(session.page(), Page::MapShown);
    assert_eq!(session.title(), Some("From Majestic → To &lt;Hebbal&gt;"));

    let popup = popup_of(&session, 3);
    assert!(popup.contains("<strong> 16g MG road</strong>"));
    assert!(popup.contains("Arrival (next stop): 18:32:00"));
    // stop 5 of 6: one stop left
    assert!(popup.contains("Destination ETA: 18:34:00"));

    session.simulate_for(Duration::seconds(2));
    let popup = popup_of(&session, 3);
    // moved to the last stop, two seconds later
    assert!(popup.contains("Arrival (next stop): 18:32:02"));
    assert!(popup.contains("Destination ETA: 18:32:02"));
    let html = session.list().to_html();
    assert!(html.contains("2 min to destination"));

    assert!(session.activate_list_row(1));
    let viewport = session.map().surface().viewport().unwrap();
    assert_eq!(viewport.zoom, 15);
    assert_eq!(viewport.center, session.route().unwrap().point(2));
    assert_eq!(
        session.map().surface().opened_popup(),
        session.buses()[1].marker
    );
}

#[test]
fn test_lateness_is_stable_within_a_tick() {
    let mut session = new_session(SessionConfig::default());
    session.submit_trip(&TripForm::new("a", "b"));
    session.simulate_for(Duration::seconds(2));
    let before = popup_of(&session, 0);
    session.focus_bus(&"14d sivajinagar".into());
    session.click_bus_marker(&"14d sivajinagar".into());
    assert_eq!(popup_of(&session, 0), before);
}

#[test]
fn test_custom_seeds_and_interval() {
    let config: SessionConfig =
        serde_json::from_str(r#"{ "tick_interval": "1s", "seed_ids": ["x", "x", "y"] }"#).unwrap();
    let mut session = new_session(config);
    session.submit_trip(&TripForm::new("a", "b"));

    let indices: Vec<_> = session.buses().iter().map(|b| b.index).collect();
    assert_eq!(indices, vec![0, 2, 4]);

    session.simulate_for(Duration::seconds(5));
    assert_eq!(session.simulator().tick_count(), 5);
    let indices: Vec<_> = session.buses().iter().map(|b| b.index).collect();
    assert_eq!(indices, vec![5, 1, 3]);

    // duplicate ids: the first one wins
    assert!(session.focus_bus(&"x".into()));
    assert_eq!(
        session.map().surface().viewport().unwrap().center,
        session.route().unwrap().point(5)
    );
}

#[test]
fn test_restart_leaves_one_timer_and_no_stale_markers() {
    let mut session = new_session(SessionConfig::default());
    session.submit_trip(&TripForm::new("a", "b"));
    let old: Vec<_> = session.buses().iter().filter_map(|b| b.marker).collect();
    for _ in 0..3 {
        session.simulate_for(Duration::seconds(1));
        session.submit_trip(&TripForm::new("a", "b"));
    }
    assert_eq!(session.pending_ticks(), 1);
    assert_eq!(session.simulator().ticker().active_count(), 1);
    assert!(old
        .iter()
        .all(|m| session.map().surface().layer(*m).is_none()));
    assert_eq!(session.map().surface().marker_count(), 4);

    // restarting every second kept the tick from ever firing
    assert_eq!(session.simulator().tick_count(), 0);
    session.simulate_for(Duration::seconds(2));
    assert_eq!(session.simulator().tick_count(), 1);
}

#[test]
fn test_out_of_range_config_rejected_by_session() {
    for json in [
        r#"{ "tick_interval": "1000000years" }"#,
        r#"{ "timing": { "next_stop_minutes": 9223372036854775807 } }"#,
        r#"{ "timing": { "buffer_minutes": -3 } }"#,
    ] {
        let config: SessionConfig = serde_json::from_str(json).unwrap();
        let session = Session::new(
            config,
            InMemorySurface::new(),
            SmallRng::seed_from_u64(42),
            start(),
            vec![],
        );
        assert!(session.is_err(), "accepted {json}");
    }
}

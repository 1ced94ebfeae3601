use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::{
    config::EtaTiming,
    model::{Bus, Route},
};

use super::format::{escape_html, format_clock};

const SOURCE_NOTE: &str = "Source: Demo / Chalo / WhereIsMyTrain";

pub fn popup_html(bus: &Bus, route: &Route, timing: &EtaTiming, now: NaiveDateTime) -> String {
    let eta = bus.eta(route, timing, now);
    let status = if bus.is_late {
        r#"<span class="late">Late</span>"#
    } else {
        r#"<span style="color:green">On time</span>"#
    };

    let mut html = String::from(r#"<div class="bus-popup">"#);
    // writing into a String cannot fail
    let _ = write!(
        html,
        "<strong>{}</strong><br/>\
         Route: <em>{}</em><br/>\
         Arrival (next stop): {}<br/>\
         Destination ETA: {}<br/>\
         Status: {}<br/>\
         Speed: {} km/h<br/>\
         <small>{}</small>",
        escape_html(&bus.id.0),
        escape_html(route.name()),
        format_clock(eta.next_stop_arrival),
        format_clock(eta.destination_eta),
        status,
        bus.speed_kmph,
        SOURCE_NOTE,
    );
    html.push_str("</div>");
    html
}

#[test]
fn test_popup_contents() {
    let now = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    let route = Route::demo_express();
    let mut bus = Bus::new("<306>".into(), 0, 30);
    let html = popup_html(&bus, &route, &EtaTiming::default(), now);
    assert!(html.starts_with(r#"<div class="bus-popup">"#));
    assert!(html.contains("<strong>&lt;306&gt;</strong>"));
    assert!(html.contains("Route: <em>Demo Express</em>"));
    assert!(html.contains("Arrival (next stop): 08:02:00"));
    assert!(html.contains("Destination ETA: 08:12:00"));
    assert!(html.contains("On time"));
    assert!(html.contains("Speed: 30 km/h"));

    bus.is_late = true;
    let html = popup_html(&bus, &route, &EtaTiming::default(), now);
    assert!(html.contains(r#"<span class="late">Late</span>"#));
}

use std::fmt::Write as _;

use serde::Serialize;

use crate::{
    config::EtaTiming,
    model::{Bus, BusId, Route},
};

use super::format::escape_html;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRow {
    pub id: BusId,
    pub minutes_to_destination: i64,
}

/// Side panel listing every bus with its minutes to destination.
#[derive(Debug, Default)]
pub struct ListView {
    rows: Vec<ListRow>,
}

impl ListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn render(&mut self, buses: &[Bus], route: &Route, timing: &EtaTiming) {
        self.rows.clear();
        self.rows.extend(buses.iter().map(|bus| {
            let remaining = route.remaining_stops(bus.index);
            ListRow {
                id: bus.id.clone(),
                minutes_to_destination: timing.minutes_to_destination(remaining),
            }
        }));
    }

    /// The bus the "Center" control of a row points at.
    pub fn activate(&self, row: usize) -> Option<&BusId> {
        self.rows.get(row).map(|r| &r.id)
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for row in &self.rows {
            let id = escape_html(&row.id.0);
            let _ = write!(
                html,
                r#"<div class="bus-item"><div><div><strong>{id}</strong></div><div class="small">{} min to destination</div></div><div><button data-bus-id="{id}">Center</button></div></div>"#,
                row.minutes_to_destination,
            );
        }
        html
    }
}

#[test]
fn test_render_rebuilds_rows() {
    let route = Route::demo_express();
    let timing = EtaTiming::default();
    let mut list = ListView::new();
    let buses = vec![Bus::new("a".into(), 0, 20), Bus::new("b".into(), 5, 25)];
    list.render(&buses, &route, &timing);
    list.render(&buses, &route, &timing);

    assert_eq!(
        list.rows(),
        &[
            ListRow {
                id: "a".into(),
                minutes_to_destination: 12,
            },
            ListRow {
                id: "b".into(),
                minutes_to_destination: 2,
            },
        ]
    );
    assert_eq!(list.activate(1), Some(&BusId::from("b")));
    assert_eq!(list.activate(2), None);
}

#[test]
fn test_list_html_is_escaped() {
    let route = Route::demo_express();
    let mut list = ListView::new();
    list.render(
        &[Bus::new("x\"><script>".into(), 4, 20)],
        &route,
        &EtaTiming::default(),
    );
    let html = list.to_html();
    assert!(html.contains("<strong>x&quot;&gt;&lt;script&gt;</strong>"));
    assert!(html.contains(r#"data-bus-id="x&quot;&gt;&lt;script&gt;""#));
    assert!(html.contains("4 min to destination"));
    assert!(!html.contains("<script>"));
}

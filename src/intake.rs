use serde::{Deserialize, Serialize};

use crate::view::format::escape_html;

/// Which half of the page is visible. There is no way back to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Page {
    Welcome,
    MapShown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SubmitOutcome {
    Ignored,
    Started,
}

/// Raw text of the trip form, as typed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripForm {
    pub origin: String,
    pub destination: String,
}

impl TripForm {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }
}

/// A submitted trip. The labels are only displayed, never used for routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripRequest {
    pub origin: String,
    pub destination: String,
}

impl TripRequest {
    pub fn from_form(form: &TripForm) -> Option<Self> {
        let origin = form.origin.trim();
        let destination = form.destination.trim();
        if origin.is_empty() || destination.is_empty() {
            return None;
        }
        Some(Self {
            origin: origin.to_string(),
            destination: destination.to_string(),
        })
    }

    pub fn title(&self) -> String {
        format!(
            "From {} → To {}",
            escape_html(&self.origin),
            escape_html(&self.destination)
        )
    }
}

#[test]
fn test_blank_fields_rejected() {
    assert!(TripRequest::from_form(&TripForm::new("", "Downtown")).is_none());
    assert!(TripRequest::from_form(&TripForm::new("Airport", "   ")).is_none());
    assert!(TripRequest::from_form(&TripForm::default()).is_none());
}

#[test]
fn test_title_is_trimmed_and_escaped() {
    let request = TripRequest::from_form(&TripForm::new("  MG <Road> ", "Hebbal & Co")).unwrap();
    assert_eq!(request.origin, "MG <Road>");
    assert_eq!(request.title(), "From MG &lt;Road&gt; → To Hebbal &amp; Co");
}

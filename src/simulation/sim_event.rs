use chrono::NaiveDateTime;

use super::{event_queue::Event, ticker::TimerId};

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventData {
    Tick { timer: TimerId },
}

pub type SessionEvent = (SessionEventData, NaiveDateTime);

impl Event for SessionEvent {
    fn time(&self) -> NaiveDateTime {
        self.1
    }
}

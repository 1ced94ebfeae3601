use std::fmt::Display;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, warn};

use super::{
    event_queue::EventQueue,
    sim_event::{SessionEvent, SessionEventData},
};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TimerId(pub u64);

impl Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// A cancellable task firing every `interval`, driven through the event queue.
///
/// At most one timer is active: scheduling cancels the previous one, and its
/// pending firing is purged from the queue. Firings are not delayed by the
/// work done in them.
#[derive(Debug, Clone)]
pub struct RepeatingTask {
    interval: Duration,
    active: Option<TimerId>,
    next_id: u64,
}

impl RepeatingTask {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            active: None,
            next_id: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn active(&self) -> Option<TimerId> {
        self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().count()
    }

    pub fn is_active(&self, timer: TimerId) -> bool {
        self.active == Some(timer)
    }

    pub fn schedule(
        &mut self,
        events: &mut EventQueue<SessionEvent>,
        now: NaiveDateTime,
    ) -> TimerId {
        self.cancel(events);
        let timer = TimerId(self.next_id);
        self.next_id += 1;
        self.active = Some(timer);
        self.push_next(timer, events, now);
        debug!("scheduled {timer} every {}ms", self.interval.num_milliseconds());
        timer
    }

    /// Cancelling when nothing is scheduled does nothing.
    pub fn cancel(&mut self, events: &mut EventQueue<SessionEvent>) -> bool {
        let Some(cancelled) = self.active.take() else {
            return false;
        };
        events.retain(|(event, _)| {
            !matches!(event, SessionEventData::Tick { timer } if *timer == cancelled)
        });
        debug!("cancelled {cancelled}");
        true
    }

    /// Re-arms `timer` for its next firing. Returns false for stale timers,
    /// which must not run.
    pub fn fire(
        &mut self,
        timer: TimerId,
        events: &mut EventQueue<SessionEvent>,
        time: NaiveDateTime,
    ) -> bool {
        if !self.is_active(timer) {
            return false;
        }
        self.push_next(timer, events, time);
        true
    }

    // a firing past the end of the calendar never happens
    fn push_next(
        &self,
        timer: TimerId,
        events: &mut EventQueue<SessionEvent>,
        time: NaiveDateTime,
    ) {
        match time.checked_add_signed(self.interval) {
            Some(due) => events.push((SessionEventData::Tick { timer }, due)),
            None => warn!("{timer} cannot fire after {time}"),
        }
    }
}

#[cfg(test)]
fn start() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

#[test]
fn test_reschedule_keeps_single_timer() {
    let mut events = EventQueue::new();
    let mut task = RepeatingTask::new(Duration::seconds(2));
    let first = task.schedule(&mut events, start());
    let second = task.schedule(&mut events, start() + Duration::seconds(1));

    assert_ne!(first, second);
    assert_eq!(task.active_count(), 1);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events.peek(),
        Some(&(
            SessionEventData::Tick { timer: second },
            start() + Duration::seconds(3)
        ))
    );
    assert!(!task.fire(first, &mut events, start()));
    assert_eq!(events.len(), 1);
}

#[test]
fn test_cancel_is_idempotent() {
    let mut events = EventQueue::new();
    let mut task = RepeatingTask::new(Duration::seconds(2));
    assert!(!task.cancel(&mut events));
    task.schedule(&mut events, start());
    assert!(task.cancel(&mut events));
    assert!(!task.cancel(&mut events));
    assert_eq!(task.active_count(), 0);
    assert!(events.is_empty());
}

#[test]
fn test_fire_rearms_at_fixed_interval() {
    let mut events = EventQueue::new();
    let mut task = RepeatingTask::new(Duration::seconds(2));
    let timer = task.schedule(&mut events, start());
    let (_, due) = events.pop().unwrap();
    assert!(task.fire(timer, &mut events, due));
    assert_eq!(events.peek().map(|e| e.1), Some(start() + Duration::seconds(4)));
}

#[test]
fn test_schedule_at_end_of_calendar_does_not_panic() {
    let mut events = EventQueue::new();
    let mut task = RepeatingTask::new(Duration::days(1));
    let timer = task.schedule(&mut events, NaiveDateTime::MAX);
    assert!(task.is_active(timer));
    assert!(events.is_empty());
    assert!(task.fire(timer, &mut events, NaiveDateTime::MAX));
    assert!(events.is_empty());
}

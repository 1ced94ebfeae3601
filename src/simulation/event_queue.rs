use std::{cmp::Reverse, collections::BinaryHeap};

use chrono::NaiveDateTime;

pub trait Event {
    fn time(&self) -> NaiveDateTime;

    fn time_rev(&self) -> Reverse<NaiveDateTime> {
        Reverse(self.time())
    }
}

#[derive(Debug, Clone)]
pub struct EventWrapper<E: Event>(E);

impl<E: Event> PartialEq for EventWrapper<E> {
    fn eq(&self, other: &Self) -> bool {
        self.0.time_rev() == other.0.time_rev()
    }
}

impl<E: Event> PartialOrd for EventWrapper<E> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: Event> Eq for EventWrapper<E> {}
impl<E: Event> Ord for EventWrapper<E> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.time_rev().cmp(&other.0.time_rev())
    }
}

/// Min-heap of events keyed on their firing time.
#[derive(Debug, Clone)]
pub struct EventQueue<E: Event> {
    events: BinaryHeap<EventWrapper<E>>,
}

impl<E: Event> EventQueue<E> {
    pub fn new() -> EventQueue<E> {
        EventQueue {
            events: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, event: E) {
        self.events.push(EventWrapper(event));
    }

    pub fn pop(&mut self) -> Option<E> {
        self.events.pop().map(|EventWrapper(e)| e)
    }

    pub fn peek(&self) -> Option<&E> {
        self.events.peek().map(|EventWrapper(e)| e)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&E) -> bool) {
        self.events.retain(|EventWrapper(e)| keep(e));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.events.iter().map(|EventWrapper(e)| e)
    }
}

impl<E: Event> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl Event for (u32, NaiveDateTime) {
    fn time(&self) -> NaiveDateTime {
        self.1
    }
}

#[test]
fn test_pops_earliest_first() {
    let t0 = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut queue = EventQueue::new();
    queue.push((3, t0 + chrono::Duration::seconds(3)));
    queue.push((1, t0 + chrono::Duration::seconds(1)));
    queue.push((2, t0 + chrono::Duration::seconds(2)));
    assert_eq!(queue.peek().map(|e| e.0), Some(1));

    queue.retain(|e| e.0 != 2);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pop().map(|e| e.0), Some(1));
    assert_eq!(queue.pop().map(|e| e.0), Some(3));
    assert!(queue.pop().is_none());
}

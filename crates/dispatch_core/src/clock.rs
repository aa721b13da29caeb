use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

use crate::model::{RequestId, VehicleId};

pub const ONE_SEC_MS: u64 = 1000;

/// Event kinds, in the order they are handled when they share a timestamp: every
/// submission and task end of an instant is seen before that instant's reoptimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    RequestSubmitted,
    TaskEnded,
    Reoptimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSubject {
    Request(RequestId),
    Vehicle(VehicleId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
}

/// Heap entry; `seq` keeps same-instant, same-kind events FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Queued {
    event: Event,
    seq: u64,
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by timestamp.
        other
            .event
            .timestamp
            .cmp(&self.event.timestamp)
            .then_with(|| other.event.kind.cmp(&self.event.kind))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_seq: u64,
    events: BinaryHeap<Queued>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(&mut self, event: Event) {
        debug_assert!(
            event.timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Queued { event, seq });
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule(Event {
            timestamp,
            kind,
            subject,
        });
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let Queued { event, .. } = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|queued| queued.event.timestamp)
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// The event being handled by the current schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(10, EventKind::Reoptimize, None);
        clock.schedule_at(5, EventKind::Reoptimize, None);
        clock.schedule_at(20, EventKind::Reoptimize, None);

        let first = clock.pop_next().expect("first event");
        assert_eq!(first.timestamp, 5);
        assert_eq!(clock.now(), 5);

        let second = clock.pop_next().expect("second event");
        assert_eq!(second.timestamp, 10);
        assert_eq!(clock.now(), 10);

        let third = clock.pop_next().expect("third event");
        assert_eq!(third.timestamp, 20);
        assert_eq!(clock.now(), 20);

        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn reoptimize_runs_after_same_instant_notifications() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(7, EventKind::Reoptimize, None);
        clock.schedule_at(
            7,
            EventKind::TaskEnded,
            Some(EventSubject::Vehicle(VehicleId(2))),
        );
        clock.schedule_at(
            7,
            EventKind::RequestSubmitted,
            Some(EventSubject::Request(RequestId(1))),
        );
        clock.schedule_at(
            7,
            EventKind::TaskEnded,
            Some(EventSubject::Vehicle(VehicleId(1))),
        );

        let order: Vec<_> = std::iter::from_fn(|| clock.pop_next())
            .map(|e| (e.kind, e.subject))
            .collect();
        assert_eq!(
            order,
            vec![
                (
                    EventKind::RequestSubmitted,
                    Some(EventSubject::Request(RequestId(1)))
                ),
                (EventKind::TaskEnded, Some(EventSubject::Vehicle(VehicleId(2)))),
                (EventKind::TaskEnded, Some(EventSubject::Vehicle(VehicleId(1)))),
                (EventKind::Reoptimize, None),
            ]
        );
    }
}

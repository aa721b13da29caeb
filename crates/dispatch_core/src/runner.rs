//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule. Systems talk to the dispatch core only through the
//! [OptimizerResource].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bevy_ecs::prelude::{Res, Resource, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::error::DispatchError;
use crate::model::{Request, RequestId, VehicleId};
use crate::optimizer::DispatchOptimizer;
use crate::systems::{
    reoptimize::reoptimize_system, request_submitted::request_submitted_system,
    task_ended::task_ended_system,
};

/// The dispatch core, owned by the world.
#[derive(Resource)]
pub struct OptimizerResource(pub Box<dyn DispatchOptimizer>);

/// Requests whose submission event has not fired yet.
#[derive(Debug, Default, Resource)]
pub struct PendingRequests(pub BTreeMap<RequestId, Request>);

/// Simulation end time in milliseconds. When set, the runner stops processing events
/// once the next event would be at or after this timestamp.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEndTimeMs(pub u64);

/// First failure raised by the dispatch core. The run stops once this is set.
#[derive(Debug, Default, Resource)]
pub struct DispatchFailure(pub Option<DispatchError>);

/// Pending reoptimization instants, at most one event per timestamp.
#[derive(Debug, Default, Resource)]
pub struct ReoptimizationQueue {
    /// Re-run matching this long after a round that left requests unplanned.
    pub interval_ms: Option<u64>,
    scheduled: BTreeSet<u64>,
}

impl ReoptimizationQueue {
    pub fn with_interval(interval_ms: Option<u64>) -> Self {
        Self {
            interval_ms,
            scheduled: BTreeSet::new(),
        }
    }

    /// Schedule a Reoptimize event at `at` unless one is already pending there.
    pub fn request(&mut self, clock: &mut SimulationClock, at: u64) {
        if self.scheduled.insert(at) {
            clock.schedule_at(at, EventKind::Reoptimize, None);
        }
    }

    /// Mark the round at `at` as running.
    pub fn take(&mut self, at: u64) -> bool {
        self.scheduled.remove(&at)
    }
}

/// End time of each vehicle's current task, as last scheduled on the clock.
///
/// A commit cuts a vehicle's STAY short, which leaves its old task-end event in the queue.
/// Events whose timestamp no longer matches the tracked end are stale and ignored.
#[derive(Debug, Default, Resource)]
pub struct TaskEndTracker(HashMap<VehicleId, u64>);

impl TaskEndTracker {
    pub fn schedule(&mut self, clock: &mut SimulationClock, vehicle: VehicleId, end_at: u64) {
        if self.0.insert(vehicle, end_at) != Some(end_at) {
            clock.schedule_at(
                end_at,
                EventKind::TaskEnded,
                Some(EventSubject::Vehicle(vehicle)),
            );
        }
    }

    /// Consume the tracked end for `vehicle` if the event at `timestamp` is the live one.
    pub fn take_if_current(&mut self, vehicle: VehicleId, timestamp: u64) -> bool {
        if self.0.get(&vehicle) == Some(&timestamp) {
            self.0.remove(&vehicle);
            true
        } else {
            false
        }
    }

    pub fn expected_end(&self, vehicle: VehicleId) -> Option<u64> {
        self.0.get(&vehicle).copied()
    }
}

// Condition functions for each event kind
fn is_request_submitted(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RequestSubmitted)
        .unwrap_or(false)
}

fn is_task_ended(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::TaskEnded)
        .unwrap_or(false)
}

fn is_reoptimize(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::Reoptimize)
        .unwrap_or(false)
}

fn has_failed(world: &World) -> bool {
    world
        .get_resource::<DispatchFailure>()
        .is_some_and(|failure| failure.0.is_some())
}

/// Runs one simulation step: pops the next event, inserts it as [CurrentEvent], then runs
/// the schedule. Returns `true` if an event was processed, `false` if the clock was empty,
/// the run has failed, or the next event is at or past [SimulationEndTimeMs].
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    if has_failed(world) {
        return false;
    }
    let stop_at = world.get_resource::<SimulationEndTimeMs>().map(|e| e.0);
    let next_ts = world
        .get_resource::<SimulationClock>()
        .and_then(|c| c.next_event_time());
    if let (Some(end_ms), Some(ts)) = (stop_at, next_ts) {
        if ts >= end_ms {
            return false;
        }
    }

    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs simulation steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed, or the failure that stopped the run.
pub fn run_until_empty(
    world: &mut World,
    schedule: &mut Schedule,
    max_steps: usize,
) -> Result<usize, DispatchError> {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    match world.get_resource_mut::<DispatchFailure>().and_then(|mut f| f.0.take()) {
        Some(err) => Err(err),
        None => Ok(steps),
    }
}

/// Builds the dispatch schedule: one system per event kind, gated on [CurrentEvent].
pub fn dispatch_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        request_submitted_system.run_if(is_request_submitted),
        task_ended_system.run_if(is_task_ended),
        reoptimize_system.run_if(is_reoptimize),
    ));
    schedule
}

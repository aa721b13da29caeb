use bevy_ecs::prelude::{Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventSubject, SimulationClock};
use crate::runner::{DispatchFailure, OptimizerResource, ReoptimizationQueue, TaskEndTracker};

use super::record_failure;

/// Moves a vehicle on to its next task, schedules that task's end, and asks for a
/// reoptimization when the vehicle is left staying.
pub fn task_ended_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut optimizer: ResMut<OptimizerResource>,
    mut tracker: ResMut<TaskEndTracker>,
    mut queue: ResMut<ReoptimizationQueue>,
    mut failure: ResMut<DispatchFailure>,
) {
    let Some(EventSubject::Vehicle(vehicle)) = event.0.subject else {
        return;
    };
    let now = event.0.timestamp;
    if !tracker.take_if_current(vehicle, now) {
        debug!(?vehicle, now, "stale task end ignored");
        return;
    }

    let staying = match optimizer.0.on_vehicle_task_completed(vehicle) {
        Ok(staying) => staying,
        Err(err) => {
            record_failure(&mut failure, err);
            return;
        }
    };

    let next_end = optimizer
        .0
        .fleet()
        .vehicle(vehicle)
        .and_then(|v| v.schedule().current_task())
        .map(|task| task.end_at);
    match next_end {
        Some(end_at) => tracker.schedule(&mut clock, vehicle, end_at),
        None => debug!(?vehicle, now, "schedule completed"),
    }

    if staying {
        queue.request(&mut clock, now);
    }
}

use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, SimulationClock};
use crate::runner::{DispatchFailure, OptimizerResource, ReoptimizationQueue, TaskEndTracker};
use crate::telemetry::{DispatchRecord, DispatchTelemetry};

use super::record_failure;

/// Runs one matching round and reschedules the task end of every dispatched vehicle:
/// each commit cut that vehicle's STAY short.
pub fn reoptimize_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut optimizer: ResMut<OptimizerResource>,
    mut tracker: ResMut<TaskEndTracker>,
    mut queue: ResMut<ReoptimizationQueue>,
    mut failure: ResMut<DispatchFailure>,
    mut telemetry: Option<ResMut<DispatchTelemetry>>,
) {
    let now = event.0.timestamp;
    if !queue.take(now) {
        return;
    }

    let outcome = match optimizer.0.reoptimize(now) {
        Ok(outcome) => outcome,
        Err(err) => {
            record_failure(&mut failure, err);
            return;
        }
    };

    for dispatch in &outcome.dispatches {
        let Some(vehicle) = optimizer.0.fleet().vehicle(dispatch.vehicle) else {
            continue;
        };
        if let Some(task) = vehicle.schedule().current_task() {
            tracker.schedule(&mut clock, dispatch.vehicle, task.end_at);
        }
        if let Some(telemetry) = telemetry.as_mut() {
            if let Some(record) = DispatchRecord::from_schedule(
                vehicle.schedule(),
                dispatch.vehicle,
                dispatch.request.id,
                outcome.mode,
                now,
            ) {
                telemetry.dispatches.push(record);
            }
        }
    }
    if let Some(telemetry) = telemetry.as_mut() {
        telemetry.record_round(&outcome);
    }

    // Periodic retry for requests nobody could serve; stops once nothing else is queued.
    if let Some(interval_ms) = queue.interval_ms {
        if outcome.unplanned_left > 0 && !clock.is_empty() {
            queue.request(&mut clock, now + interval_ms.max(1));
        }
    }
}

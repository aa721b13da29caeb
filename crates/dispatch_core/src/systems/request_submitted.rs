use bevy_ecs::prelude::{Res, ResMut};
use tracing::warn;

use crate::clock::{CurrentEvent, EventSubject, SimulationClock};
use crate::runner::{DispatchFailure, OptimizerResource, PendingRequests, ReoptimizationQueue};
use crate::telemetry::DispatchTelemetry;

use super::record_failure;

/// Hands a pending request to the optimizer and asks for a reoptimization at the same
/// instant. Matching itself never happens on submission.
pub fn request_submitted_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut pending: ResMut<PendingRequests>,
    mut optimizer: ResMut<OptimizerResource>,
    mut queue: ResMut<ReoptimizationQueue>,
    mut failure: ResMut<DispatchFailure>,
    telemetry: Option<ResMut<DispatchTelemetry>>,
) {
    let Some(EventSubject::Request(id)) = event.0.subject else {
        return;
    };
    let Some(request) = pending.0.remove(&id) else {
        warn!(request = ?id, "submission event without a pending request");
        return;
    };

    if let Err(err) = optimizer.0.on_request_submitted(request) {
        record_failure(&mut failure, err);
        return;
    }
    if let Some(mut telemetry) = telemetry {
        telemetry.requests_submitted += 1;
    }
    queue.request(&mut clock, event.0.timestamp);
}

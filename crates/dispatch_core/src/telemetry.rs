//! Telemetry / KPIs: records every committed dispatch for analysis.

use bevy_ecs::prelude::Resource;

use crate::matching::MatchingMode;
use crate::model::{RequestId, Schedule, TaskKind, VehicleId};
use crate::optimizer::ReoptimizationOutcome;

/// One committed dispatch. Timestamps are simulation ms; use the helper methods for
/// derived KPIs.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub request: RequestId,
    pub vehicle: VehicleId,
    pub mode: MatchingMode,
    pub submitted_at: u64,
    pub dispatched_at: u64,
    /// Planned arrival at the pickup location.
    pub pickup_eta: u64,
    /// Planned end of the dropoff.
    pub dropoff_eta: u64,
}

impl DispatchRecord {
    /// Build a record from the schedule the dispatch was just committed into. `None` when
    /// the schedule holds no PICKUP/DROPOFF for `request`.
    pub fn from_schedule(
        schedule: &Schedule,
        vehicle: VehicleId,
        request: RequestId,
        mode: MatchingMode,
        dispatched_at: u64,
    ) -> Option<Self> {
        let mut pickup = None;
        let mut dropoff = None;
        for task in schedule.future_tasks() {
            match &task.kind {
                TaskKind::Pickup { request: r } if r.id == request => {
                    pickup = Some((r.submitted_at, task.begin_at));
                }
                TaskKind::Dropoff { request: r } if r.id == request => {
                    dropoff = Some(task.end_at);
                }
                _ => {}
            }
        }
        let (submitted_at, pickup_eta) = pickup?;
        Some(Self {
            request,
            vehicle,
            mode,
            submitted_at,
            dispatched_at,
            pickup_eta,
            dropoff_eta: dropoff?,
        })
    }

    /// Time spent in the unplanned pool.
    pub fn time_to_dispatch(&self) -> u64 {
        self.dispatched_at.saturating_sub(self.submitted_at)
    }

    /// Time from dispatch until the vehicle reaches the passenger.
    pub fn time_to_pickup(&self) -> u64 {
        self.pickup_eta.saturating_sub(self.dispatched_at)
    }

    /// Total passenger wait: submission to vehicle arrival.
    pub fn wait_time(&self) -> u64 {
        self.pickup_eta.saturating_sub(self.submitted_at)
    }
}

/// Collects dispatch telemetry. Insert as a resource to record reoptimization results.
#[derive(Debug, Default, Resource)]
pub struct DispatchTelemetry {
    pub dispatches: Vec<DispatchRecord>,
    pub requests_submitted: usize,
    pub request_initiated_rounds: usize,
    pub vehicle_initiated_rounds: usize,
}

impl DispatchTelemetry {
    pub fn record_round(&mut self, outcome: &ReoptimizationOutcome) {
        match outcome.mode {
            MatchingMode::RequestInitiated => self.request_initiated_rounds += 1,
            MatchingMode::VehicleInitiated => self.vehicle_initiated_rounds += 1,
        }
    }

    pub fn mean_wait_ms(&self) -> Option<f64> {
        if self.dispatches.is_empty() {
            return None;
        }
        let total: u64 = self.dispatches.iter().map(DispatchRecord::wait_time).sum();
        Some(total as f64 / self.dispatches.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(submitted_at: u64, dispatched_at: u64, pickup_eta: u64) -> DispatchRecord {
        DispatchRecord {
            request: RequestId(1),
            vehicle: VehicleId(1),
            mode: MatchingMode::RequestInitiated,
            submitted_at,
            dispatched_at,
            pickup_eta,
            dropoff_eta: pickup_eta + 60_000,
        }
    }

    #[test]
    fn derived_kpis() {
        let r = record(1_000, 4_000, 10_000);
        assert_eq!(r.time_to_dispatch(), 3_000);
        assert_eq!(r.time_to_pickup(), 6_000);
        assert_eq!(r.wait_time(), 9_000);
    }

    #[test]
    fn mean_wait_over_records() {
        let mut telemetry = DispatchTelemetry::default();
        assert_eq!(telemetry.mean_wait_ms(), None);
        telemetry.dispatches.push(record(0, 0, 2_000));
        telemetry.dispatches.push(record(0, 0, 4_000));
        assert_eq!(telemetry.mean_wait_ms(), Some(3_000.0));
    }
}

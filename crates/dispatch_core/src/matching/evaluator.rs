//! Exact scoring over a bounded candidate set.
//!
//! The zonal registries narrow the market down to a handful of candidates; this evaluator
//! routes each one and keeps the cheapest pairing. It only reads the fleet; committing the
//! winner is the optimizer's job.

use std::cmp::Ordering;

use crate::error::InvariantViolation;
use crate::fleet::Fleet;
use crate::model::{Request, VehicleId};
use crate::routing::RouteProvider;
use crate::spatial::Location;

use super::objective::{DispatchObjective, PickupTime};
use super::types::{Dispatch, DispatchCandidate};

pub struct DispatchEvaluator {
    objective: Box<dyn DispatchObjective>,
}

impl Default for DispatchEvaluator {
    fn default() -> Self {
        Self::new(Box::new(PickupTime))
    }
}

/// `(cost, id)` ordering: cheaper wins, exact ties go to the lower id.
fn beats<K: Ord>(cost: f64, id: K, best_cost: f64, best_id: K) -> bool {
    match cost.total_cmp(&best_cost) {
        Ordering::Less => true,
        Ordering::Equal => id < best_id,
        Ordering::Greater => false,
    }
}

impl DispatchEvaluator {
    pub fn new(objective: Box<dyn DispatchObjective>) -> Self {
        Self { objective }
    }

    fn idle_location(fleet: &Fleet, vehicle: VehicleId) -> Result<Location, InvariantViolation> {
        let v = fleet
            .vehicle(vehicle)
            .ok_or(InvariantViolation::UnknownVehicle(vehicle))?;
        if !v.schedule().is_idle() {
            return Err(InvariantViolation::VehicleNotIdle(vehicle));
        }
        v.stay_location()
            .ok_or(InvariantViolation::VehicleNotIdle(vehicle))
    }

    /// `true` once `now` has reached the end of the vehicle's operating window.
    fn window_closed(fleet: &Fleet, vehicle: VehicleId, now: u64) -> bool {
        fleet.vehicle(vehicle).is_some_and(|v| now >= v.t1)
    }

    /// Cheapest idle vehicle for `request` among `candidates`.
    ///
    /// Vehicles whose operating window has ended are passed over. Returns `Ok(None)` when
    /// no remaining candidate can reach the request's origin.
    pub fn best_vehicle_for_request(
        &self,
        request: &Request,
        candidates: &[VehicleId],
        fleet: &Fleet,
        router: &dyn RouteProvider,
        now: u64,
    ) -> Result<Option<Dispatch>, InvariantViolation> {
        if candidates.is_empty() {
            return Err(InvariantViolation::EmptyCandidateSet);
        }

        let mut best: Option<Dispatch> = None;
        for &vehicle in candidates {
            let from = Self::idle_location(fleet, vehicle)?;
            if Self::window_closed(fleet, vehicle, now) {
                tracing::debug!(?vehicle, now, "operating window ended");
                continue;
            }
            let Some(route) = router.route(&from, &request.origin) else {
                tracing::warn!(?vehicle, request = ?request.id, "origin unreachable from vehicle");
                continue;
            };
            let cost = self.objective.cost(&DispatchCandidate {
                vehicle,
                request,
                route: &route,
                now,
            });
            if best
                .as_ref()
                .map_or(true, |b| beats(cost, vehicle, b.cost, b.vehicle))
            {
                best = Some(Dispatch {
                    vehicle,
                    request: *request,
                    route,
                    cost,
                });
            }
        }
        Ok(best)
    }

    /// Cheapest request among `candidates` for an idle `vehicle`.
    ///
    /// Returns `Ok(None)` when the vehicle's operating window has ended or it can reach
    /// none of the candidates' origins.
    pub fn best_request_for_vehicle(
        &self,
        vehicle: VehicleId,
        candidates: &[Request],
        fleet: &Fleet,
        router: &dyn RouteProvider,
        now: u64,
    ) -> Result<Option<Dispatch>, InvariantViolation> {
        if candidates.is_empty() {
            return Err(InvariantViolation::EmptyCandidateSet);
        }
        let from = Self::idle_location(fleet, vehicle)?;
        if Self::window_closed(fleet, vehicle, now) {
            return Ok(None);
        }

        let mut best: Option<Dispatch> = None;
        for request in candidates {
            let Some(route) = router.route(&from, &request.origin) else {
                tracing::warn!(?vehicle, request = ?request.id, "origin unreachable from vehicle");
                continue;
            };
            let cost = self.objective.cost(&DispatchCandidate {
                vehicle,
                request,
                route: &route,
                now,
            });
            if best
                .as_ref()
                .map_or(true, |b| beats(cost, request.id, b.cost, b.request.id))
            {
                best = Some(Dispatch {
                    vehicle,
                    request: *request,
                    route,
                    cost,
                });
            }
        }
        Ok(best)
    }
}

//! Online dispatch: the unplanned pool, the idle fleet, and the loop that matches them.
//!
//! The optimizer owns everything it mutates: the fleet's schedules, the unplanned request
//! pool and both zonal registries. Hosts feed it two notifications (a request was
//! submitted, a vehicle finished a task) and call [`DispatchOptimizer::reoptimize`] when
//! they want matching to happen.
//!
//! Matching is greedy and one-to-one. Each step either takes the oldest unplanned request
//! and looks for the cheapest idle vehicle near it (request-initiated), or takes the next
//! idle vehicle and looks for the cheapest request near it (vehicle-initiated). The
//! [`PolicySelector`] decides which side drives each round.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DispatchConfig, OptimizerKind};
use crate::error::{ConfigError, DispatchError, InvariantViolation};
use crate::fleet::{Fleet, Vehicle};
use crate::matching::{
    build_objective, build_urgency, Dispatch, DispatchEvaluator, MarketSnapshot, MatchingMode,
    PolicySelector, UrgencyPredicate,
};
use crate::model::{Request, RequestId, TaskType, VehicleId};
use crate::routing::{build_route_provider, RouteProvider};
use crate::spatial::ZonalRegistry;

/// Result of one reoptimization round.
#[derive(Debug, Clone, PartialEq)]
pub struct ReoptimizationOutcome {
    pub now: u64,
    pub mode: MatchingMode,
    /// Committed pairings in commit order.
    pub dispatches: Vec<Dispatch>,
    pub unplanned_left: usize,
    pub idle_left: usize,
}

/// Host-facing dispatch interface.
pub trait DispatchOptimizer: Send + Sync {
    /// Register a vehicle. Its schedule starts on the first
    /// [`on_vehicle_task_completed`](Self::on_vehicle_task_completed) call.
    fn add_vehicle(&mut self, vehicle: Vehicle) -> Result<(), DispatchError>;

    /// Queue a request for matching. No matching happens here.
    fn on_request_submitted(&mut self, request: Request) -> Result<(), DispatchError>;

    /// Advance the vehicle to its next task and update the idle registry.
    ///
    /// Returns `true` when the vehicle is now staying, i.e. a reoptimization may find it
    /// work.
    fn on_vehicle_task_completed(&mut self, vehicle: VehicleId) -> Result<bool, DispatchError>;

    fn reoptimize(&mut self, now: u64) -> Result<ReoptimizationOutcome, DispatchError>;

    fn fleet(&self) -> &Fleet;

    /// Unplanned requests, oldest submission first.
    fn unplanned_requests(&self) -> Vec<Request>;

    fn unplanned_count(&self) -> usize;

    fn idle_registry(&self) -> &ZonalRegistry<VehicleId>;

    fn request_registry(&self) -> &ZonalRegistry<RequestId>;
}

/// How candidate sets are drawn from the opposite pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSelection {
    /// Whole pool when it fits the limit, otherwise the registry's nearest occupants.
    Zonal,
    /// Always the whole pool.
    Exhaustive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CandidateLimits {
    nearest_vehicles: usize,
    nearest_requests: usize,
}

/// Rule-based online optimizer.
pub struct RuleBasedOptimizer {
    fleet: Fleet,
    requests: HashMap<RequestId, Request>,
    /// `(submitted_at, id)`: iteration order of the request-initiated loop.
    queue: BTreeSet<(u64, RequestId)>,
    idle_vehicles: ZonalRegistry<VehicleId>,
    unplanned: ZonalRegistry<RequestId>,
    evaluator: DispatchEvaluator,
    policy: PolicySelector,
    urgency: Box<dyn UrgencyPredicate>,
    router: Box<dyn RouteProvider>,
    limits: CandidateLimits,
    selection: CandidateSelection,
}

impl RuleBasedOptimizer {
    pub fn new(config: &DispatchConfig, router: Box<dyn RouteProvider>) -> Result<Self, ConfigError> {
        config.validate()?;
        let selection = match config.optimizer {
            OptimizerKind::RuleBased => CandidateSelection::Zonal,
            OptimizerKind::Exhaustive => CandidateSelection::Exhaustive,
        };
        Ok(Self {
            fleet: Fleet::new(config.durations),
            requests: HashMap::new(),
            queue: BTreeSet::new(),
            idle_vehicles: ZonalRegistry::new(config.zone_edge_length),
            unplanned: ZonalRegistry::new(config.zone_edge_length),
            evaluator: DispatchEvaluator::new(build_objective(config.objective)),
            policy: PolicySelector::new(config.goal),
            urgency: build_urgency(config.urgency),
            router,
            limits: CandidateLimits {
                nearest_vehicles: config.nearest_vehicles_limit,
                nearest_requests: config.nearest_requests_limit,
            },
            selection,
        })
    }

    /// Replace the configured urgency predicate, e.g. with a closure.
    pub fn with_urgency(mut self, urgency: Box<dyn UrgencyPredicate>) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn selection(&self) -> CandidateSelection {
        self.selection
    }

    pub fn router(&self) -> &dyn RouteProvider {
        self.router.as_ref()
    }

    fn pooled(&self, id: RequestId) -> Result<Request, InvariantViolation> {
        self.requests
            .get(&id)
            .copied()
            .ok_or(InvariantViolation::UnknownRequest(id))
    }

    fn queued_requests(&self) -> Result<Vec<Request>, InvariantViolation> {
        self.queue.iter().map(|&(_, id)| self.pooled(id)).collect()
    }

    fn vehicle_candidates(&self, request: &Request) -> Vec<VehicleId> {
        let limit = self.limits.nearest_vehicles;
        match self.selection {
            CandidateSelection::Zonal if self.idle_vehicles.count() > limit => self
                .idle_vehicles
                .find_nearest(request.origin.coord, limit)
                .collect(),
            _ => self.idle_vehicles.occupants(),
        }
    }

    fn request_candidates(&self, vehicle: VehicleId) -> Result<Vec<Request>, InvariantViolation> {
        let limit = self.limits.nearest_requests;
        match self.selection {
            CandidateSelection::Zonal if self.unplanned.count() > limit => {
                let at = self
                    .idle_vehicles
                    .coord_of(vehicle)
                    .ok_or_else(|| InvariantViolation::AbsentOccupant(format!("{vehicle:?}")))?;
                self.unplanned
                    .find_nearest(at, limit)
                    .map(|id| self.pooled(id))
                    .collect()
            }
            _ => self.queued_requests(),
        }
    }

    fn commit(&mut self, dispatch: &Dispatch, now: u64) -> Result<(), InvariantViolation> {
        self.fleet.commit(dispatch, now, self.router.as_ref())?;
        self.idle_vehicles.remove(dispatch.vehicle)?;

        let request = dispatch.request;
        self.unplanned.remove(request.id)?;
        self.requests.remove(&request.id);
        self.queue.remove(&(request.submitted_at, request.id));

        debug!(
            vehicle = ?dispatch.vehicle,
            request = ?request.id,
            pickup_ms = dispatch.route.duration_ms,
            cost = dispatch.cost,
            "dispatch committed"
        );
        Ok(())
    }

    fn schedule_unplanned_requests(&mut self, now: u64) -> Result<Vec<Dispatch>, InvariantViolation> {
        let mut committed = Vec::new();
        for request in self.queued_requests()? {
            if self.idle_vehicles.is_empty() {
                break;
            }
            let candidates = self.vehicle_candidates(&request);
            let best = self.evaluator.best_vehicle_for_request(
                &request,
                &candidates,
                &self.fleet,
                self.router.as_ref(),
                now,
            )?;
            match best {
                Some(dispatch) => {
                    self.commit(&dispatch, now)?;
                    committed.push(dispatch);
                }
                None => debug!(request = ?request.id, "no reachable vehicle"),
            }
        }
        Ok(committed)
    }

    fn schedule_idle_vehicles(&mut self, now: u64) -> Result<Vec<Dispatch>, InvariantViolation> {
        let mut committed = Vec::new();
        for vehicle in self.idle_vehicles.occupants() {
            if self.queue.is_empty() {
                break;
            }
            let candidates = self.request_candidates(vehicle)?;
            let best = self.evaluator.best_request_for_vehicle(
                vehicle,
                &candidates,
                &self.fleet,
                self.router.as_ref(),
                now,
            )?;
            match best {
                Some(dispatch) => {
                    self.commit(&dispatch, now)?;
                    committed.push(dispatch);
                }
                None => debug!(?vehicle, "no reachable request"),
            }
        }
        Ok(committed)
    }
}

impl DispatchOptimizer for RuleBasedOptimizer {
    fn add_vehicle(&mut self, vehicle: Vehicle) -> Result<(), DispatchError> {
        self.fleet.add_vehicle(vehicle)?;
        Ok(())
    }

    fn on_request_submitted(&mut self, request: Request) -> Result<(), DispatchError> {
        if self.requests.contains_key(&request.id) {
            return Err(InvariantViolation::DuplicateRequest(request.id).into());
        }
        self.unplanned.insert(request.id, request.origin.coord)?;
        self.requests.insert(request.id, request);
        self.queue.insert((request.submitted_at, request.id));
        Ok(())
    }

    fn on_vehicle_task_completed(&mut self, vehicle: VehicleId) -> Result<bool, DispatchError> {
        let staying = self
            .fleet
            .advance(vehicle)?
            .is_some_and(|task| task.task_type() == TaskType::Stay);

        let idle_at = if self.fleet.is_idle(vehicle) {
            self.fleet
                .vehicle(vehicle)
                .and_then(Vehicle::stay_location)
        } else {
            None
        };
        match (idle_at, self.idle_vehicles.contains(vehicle)) {
            (Some(location), false) => self.idle_vehicles.insert(vehicle, location.coord)?,
            (None, true) => {
                self.idle_vehicles.remove(vehicle)?;
            }
            _ => {}
        }
        Ok(staying)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn reoptimize(&mut self, now: u64) -> Result<ReoptimizationOutcome, DispatchError> {
        let snapshot = MarketSnapshot {
            now,
            unplanned: self.queue.len(),
            urgent_unplanned: self
                .requests
                .values()
                .filter(|request| self.urgency.is_urgent(request, now))
                .count(),
            idle_vehicles: self.idle_vehicles.count(),
        };
        let mode = self.policy.select_mode(&snapshot);
        debug!(
            ?mode,
            unplanned = snapshot.unplanned,
            urgent = snapshot.urgent_unplanned,
            idle = snapshot.idle_vehicles,
            "matching mode selected"
        );

        let dispatches = match mode {
            MatchingMode::RequestInitiated => self.schedule_unplanned_requests(now)?,
            MatchingMode::VehicleInitiated => self.schedule_idle_vehicles(now)?,
        };

        let outcome = ReoptimizationOutcome {
            now,
            mode,
            dispatches,
            unplanned_left: self.queue.len(),
            idle_left: self.idle_vehicles.count(),
        };
        if !outcome.dispatches.is_empty() {
            info!(
                now,
                ?mode,
                committed = outcome.dispatches.len(),
                unplanned_left = outcome.unplanned_left,
                idle_left = outcome.idle_left,
                "reoptimization finished"
            );
        }
        Ok(outcome)
    }

    fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    fn unplanned_requests(&self) -> Vec<Request> {
        self.queue
            .iter()
            .filter_map(|(_, id)| self.requests.get(id).copied())
            .collect()
    }

    fn unplanned_count(&self) -> usize {
        self.queue.len()
    }

    fn idle_registry(&self) -> &ZonalRegistry<VehicleId> {
        &self.idle_vehicles
    }

    fn request_registry(&self) -> &ZonalRegistry<RequestId> {
        &self.unplanned
    }
}

/// Build the optimizer and route provider described by `config`.
pub fn build_optimizer(config: &DispatchConfig) -> Result<Box<dyn DispatchOptimizer>, ConfigError> {
    let router = build_route_provider(&config.routing);
    Ok(Box::new(RuleBasedOptimizer::new(config, router)?))
}

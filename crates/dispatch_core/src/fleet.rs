//! Fleet schedule model: vehicles, their schedules, and the only two ways schedules change.
//!
//! - [`Fleet::commit`] splices a served request onto an idle vehicle's schedule.
//! - [`Fleet::advance`] moves a schedule to its next task when the host reports a task end.
//!
//! Vehicles live in an id-keyed arena; nothing outside this module mutates a schedule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::matching::Dispatch;
use crate::model::{Schedule, ScheduleStatus, Task, TaskKind, TaskType, VehicleId};
use crate::routing::RouteProvider;
use crate::spatial::Location;

/// Dwell times at pickup and dropoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDurations {
    pub pickup_ms: u64,
    pub dropoff_ms: u64,
}

impl Default for ServiceDurations {
    fn default() -> Self {
        Self {
            pickup_ms: 120_000,
            dropoff_ms: 60_000,
        }
    }
}

/// A fleet unit operating within `[t0, t1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: VehicleId,
    pub t0: u64,
    pub t1: u64,
    pub start: Location,
    schedule: Schedule,
}

impl Vehicle {
    pub fn new(id: VehicleId, t0: u64, t1: u64, start: Location) -> Self {
        Self {
            id,
            t0,
            t1,
            start,
            schedule: Schedule::new(t0, t1, start),
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Where the vehicle currently waits, if its current task is a STAY.
    pub fn stay_location(&self) -> Option<Location> {
        self.schedule
            .current_task()
            .filter(|task| task.task_type() == TaskType::Stay)
            .map(|task| task.location)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Fleet {
    vehicles: BTreeMap<VehicleId, Vehicle>,
    durations: ServiceDurations,
}

impl Fleet {
    pub fn new(durations: ServiceDurations) -> Self {
        Self {
            vehicles: BTreeMap::new(),
            durations,
        }
    }

    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> Result<(), InvariantViolation> {
        if self.vehicles.contains_key(&vehicle.id) {
            return Err(InvariantViolation::DuplicateVehicle(vehicle.id));
        }
        self.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    /// Vehicles in ascending id order.
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn durations(&self) -> ServiceDurations {
        self.durations
    }

    /// Current task is an open STAY and nothing follows it. Unknown vehicles are not idle.
    pub fn is_idle(&self, id: VehicleId) -> bool {
        self.vehicles
            .get(&id)
            .is_some_and(|vehicle| vehicle.schedule.is_idle())
    }

    fn vehicle_mut(&mut self, id: VehicleId) -> Result<&mut Vehicle, InvariantViolation> {
        self.vehicles
            .get_mut(&id)
            .ok_or(InvariantViolation::UnknownVehicle(id))
    }

    /// Promote the next task to current.
    ///
    /// On a PLANNED schedule this starts the first task. Returns the new current task, or
    /// `None` once every task has finished (status COMPLETED).
    pub fn advance(&mut self, id: VehicleId) -> Result<Option<&Task>, InvariantViolation> {
        let schedule = &mut self.vehicle_mut(id)?.schedule;
        match schedule.status {
            ScheduleStatus::Planned => {
                schedule.current = Some(0);
                schedule.status = ScheduleStatus::Started;
            }
            ScheduleStatus::Started => {
                let next = schedule.current.map_or(0, |idx| idx + 1);
                if next < schedule.tasks.len() {
                    schedule.current = Some(next);
                } else {
                    schedule.current = None;
                    schedule.status = ScheduleStatus::Completed;
                }
            }
            ScheduleStatus::Completed => {
                return Err(InvariantViolation::ScheduleAlreadyCompleted(id));
            }
        }
        Ok(schedule.current_task())
    }

    /// Splice DRIVE, PICKUP, DRIVE, DROPOFF and a trailing STAY after the current STAY.
    ///
    /// The current STAY is cut to end at the departure time (`now`, or its own begin if
    /// later). Fails once `now` reaches the vehicle's `t1`. The vehicle must be idle: diversion of a vehicle that already has future
    /// tasks is not supported. Routing of the occupied leg happens before any mutation, so a
    /// failed commit leaves the schedule untouched.
    pub fn commit(
        &mut self,
        dispatch: &Dispatch,
        now: u64,
        router: &dyn RouteProvider,
    ) -> Result<(), InvariantViolation> {
        let durations = self.durations;
        let vehicle = self.vehicle_mut(dispatch.vehicle)?;
        let vehicle_t1 = vehicle.t1;
        let schedule = &mut vehicle.schedule;

        if schedule.status != ScheduleStatus::Started {
            return Err(InvariantViolation::ScheduleNotStarted(dispatch.vehicle));
        }
        let Some(current_idx) = schedule.current else {
            return Err(InvariantViolation::ScheduleNotStarted(dispatch.vehicle));
        };
        if schedule.tasks[current_idx].task_type() != TaskType::Stay {
            return Err(InvariantViolation::VehicleNotIdle(dispatch.vehicle));
        }
        if current_idx + 1 < schedule.tasks.len() {
            return Err(InvariantViolation::PendingFutureTasks(dispatch.vehicle));
        }
        if now >= vehicle_t1 || !schedule.is_idle() {
            return Err(InvariantViolation::OutsideOperatingWindow(dispatch.vehicle));
        }

        let request = dispatch.request;
        let trip = router
            .route(&request.origin, &request.destination)
            .ok_or(InvariantViolation::UnroutableTrip(request.id))?;

        let current = &mut schedule.tasks[current_idx];
        let departure = now.max(current.begin_at);
        current.end_at = departure;

        let arrival = departure + dispatch.route.duration_ms;
        let pickup_end = arrival.max(request.earliest_pickup_at) + durations.pickup_ms;
        let dropoff_begin = pickup_end + trip.duration_ms;
        let dropoff_end = dropoff_begin + durations.dropoff_ms;

        schedule.tasks.extend([
            Task {
                kind: TaskKind::Drive {
                    route: dispatch.route.clone(),
                },
                begin_at: departure,
                end_at: arrival,
                location: request.origin,
            },
            Task {
                kind: TaskKind::Pickup { request },
                begin_at: arrival,
                end_at: pickup_end,
                location: request.origin,
            },
            Task {
                kind: TaskKind::Drive { route: trip },
                begin_at: pickup_end,
                end_at: dropoff_begin,
                location: request.destination,
            },
            Task {
                kind: TaskKind::Dropoff { request },
                begin_at: dropoff_begin,
                end_at: dropoff_end,
                location: request.destination,
            },
            Task::stay(dropoff_end, vehicle_t1.max(dropoff_end), request.destination),
        ]);

        debug_assert!(schedule.is_contiguous(), "schedule must stay contiguous");
        Ok(())
    }
}

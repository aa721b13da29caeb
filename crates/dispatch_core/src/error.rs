//! Error taxonomy for the dispatch core.
//!
//! Two kinds of failure are fatal for a simulation run:
//!
//! - [`ConfigError`]: the host asked for something the core cannot do. Raised at construction.
//! - [`InvariantViolation`]: pool/registry/schedule bookkeeping went wrong. Never retried.
//!
//! A reoptimization that leaves requests or vehicles unmatched is not an error and never
//! surfaces here.

use std::fmt;

use crate::model::{RequestId, VehicleId};

/// Unsupported or malformed configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Mid-route diversion was requested; the rule-based optimizer cannot divert.
    DiversionUnsupported,
    /// A candidate cap was zero.
    NonPositiveLimit { name: &'static str },
    /// Zone edge length must be a finite, positive distance.
    InvalidZoneEdge(f64),
    /// Configuration JSON could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DiversionUnsupported => {
                write!(f, "vehicle diversion is not supported by the rule-based optimizer")
            }
            ConfigError::NonPositiveLimit { name } => write!(f, "{name} must be positive"),
            ConfigError::InvalidZoneEdge(edge) => {
                write!(f, "zone edge length must be finite and positive, got {edge}")
            }
            ConfigError::Parse(msg) => write!(f, "invalid dispatch config: {msg}"),
        }
    }
}

/// Internal bookkeeping bug detected by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    /// The evaluator was handed no candidates.
    EmptyCandidateSet,
    /// Occupant inserted into a registry it already belongs to.
    DuplicateOccupant(String),
    /// Occupant removed from a registry it does not belong to.
    AbsentOccupant(String),
    /// Commit against a vehicle that already has tasks after its current one.
    PendingFutureTasks(VehicleId),
    /// Commit or evaluation against a vehicle whose current task is not an open stay.
    VehicleNotIdle(VehicleId),
    UnknownVehicle(VehicleId),
    UnknownRequest(RequestId),
    DuplicateVehicle(VehicleId),
    DuplicateRequest(RequestId),
    /// `advance` on a schedule whose tasks are all finished.
    ScheduleAlreadyCompleted(VehicleId),
    /// Operation needs a started schedule.
    ScheduleNotStarted(VehicleId),
    /// The router found no path from a committed request's origin to its destination.
    UnroutableTrip(RequestId),
    /// Commit at or after the end of the vehicle's operating window.
    OutsideOperatingWindow(VehicleId),
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::EmptyCandidateSet => {
                write!(f, "dispatch evaluation requested over an empty candidate set")
            }
            InvariantViolation::DuplicateOccupant(id) => {
                write!(f, "occupant {id} is already registered")
            }
            InvariantViolation::AbsentOccupant(id) => write!(f, "occupant {id} is not registered"),
            InvariantViolation::PendingFutureTasks(id) => {
                write!(f, "vehicle {id:?} already has committed future tasks")
            }
            InvariantViolation::VehicleNotIdle(id) => write!(f, "vehicle {id:?} is not idle"),
            InvariantViolation::UnknownVehicle(id) => write!(f, "unknown vehicle {id:?}"),
            InvariantViolation::UnknownRequest(id) => write!(f, "unknown request {id:?}"),
            InvariantViolation::DuplicateVehicle(id) => {
                write!(f, "vehicle {id:?} is already part of the fleet")
            }
            InvariantViolation::DuplicateRequest(id) => {
                write!(f, "request {id:?} was already submitted")
            }
            InvariantViolation::ScheduleAlreadyCompleted(id) => {
                write!(f, "schedule of vehicle {id:?} is already completed")
            }
            InvariantViolation::ScheduleNotStarted(id) => {
                write!(f, "schedule of vehicle {id:?} has not started")
            }
            InvariantViolation::UnroutableTrip(id) => {
                write!(f, "no route between origin and destination of request {id:?}")
            }
            InvariantViolation::OutsideOperatingWindow(id) => {
                write!(f, "operating window of vehicle {id:?} has ended")
            }
        }
    }
}

/// Top-level error returned by the dispatch core.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    Config(ConfigError),
    Invariant(InvariantViolation),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Config(err) => write!(f, "configuration error: {err}"),
            DispatchError::Invariant(err) => write!(f, "invariant violation: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for InvariantViolation {}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Config(err) => Some(err),
            DispatchError::Invariant(err) => Some(err),
        }
    }
}

impl From<ConfigError> for DispatchError {
    fn from(err: ConfigError) -> Self {
        DispatchError::Config(err)
    }
}

impl From<InvariantViolation> for DispatchError {
    fn from(err: InvariantViolation) -> Self {
        DispatchError::Invariant(err)
    }
}

impl DispatchError {
    /// True for bookkeeping bugs (as opposed to bad configuration).
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, DispatchError::Invariant(_))
    }
}

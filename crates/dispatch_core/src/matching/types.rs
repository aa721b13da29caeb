use crate::model::{Request, VehicleId};
use crate::routing::RouteResult;

/// Inputs an objective scores one vehicle-request pairing on.
#[derive(Debug, Clone, Copy)]
pub struct DispatchCandidate<'a> {
    pub vehicle: VehicleId,
    pub request: &'a Request,
    pub route: &'a RouteResult,
    /// Decision time.
    pub now: u64,
}

/// The winning pairing of one reoptimization step, with the route from the vehicle's stay
/// location to the request's origin. Consumed immediately by the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub vehicle: VehicleId,
    pub request: Request,
    pub route: RouteResult,
    /// Objective value the pairing won with (lower is better).
    pub cost: f64,
}

//! Dispatch objectives: how a vehicle-request pairing is scored.

use serde::{Deserialize, Serialize};

use super::types::DispatchCandidate;

/// Cost of serving a request with a vehicle. Lower is better.
pub trait DispatchObjective: Send + Sync {
    fn cost(&self, candidate: &DispatchCandidate<'_>) -> f64;
}

/// Pickup delay only: travel time from the vehicle's stay location to the request origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct PickupTime;

impl DispatchObjective for PickupTime {
    fn cost(&self, candidate: &DispatchCandidate<'_>) -> f64 {
        candidate.route.duration_ms as f64
    }
}

/// Pickup delay minus the weighted time the request has already spent queued.
///
/// The wait term is the same for every vehicle offered one request, so request-initiated
/// rounds rank exactly as [`PickupTime`]. In vehicle-initiated rounds it lets a vehicle take
/// an older request over a slightly closer newer one.
#[derive(Debug, Clone, Copy)]
pub struct WaitDiscountedPickupTime {
    pub wait_weight: f64,
}

impl DispatchObjective for WaitDiscountedPickupTime {
    fn cost(&self, candidate: &DispatchCandidate<'_>) -> f64 {
        let waited = candidate.request.waited_ms(candidate.now) as f64;
        candidate.route.duration_ms as f64 - self.wait_weight * waited
    }
}

/// Serializable objective selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum ObjectiveKind {
    #[default]
    PickupTime,
    WaitDiscountedPickupTime { wait_weight: f64 },
}

pub fn build_objective(kind: ObjectiveKind) -> Box<dyn DispatchObjective> {
    match kind {
        ObjectiveKind::PickupTime => Box::new(PickupTime),
        ObjectiveKind::WaitDiscountedPickupTime { wait_weight } => {
            Box::new(WaitDiscountedPickupTime { wait_weight })
        }
    }
}

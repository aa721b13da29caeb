use std::collections::BTreeSet;

use bevy_ecs::prelude::World;
use dispatch_core::error::DispatchError;
use dispatch_core::model::RequestId;
use dispatch_core::optimizer::DispatchOptimizer;
use dispatch_core::runner::{dispatch_schedule, run_until_empty};

/// Step cap for harness runs in tests.
pub const MAX_STEPS: usize = 200_000;

/// Run the world to completion with the default dispatch schedule.
pub fn run_to_completion(world: &mut World) -> Result<usize, DispatchError> {
    let mut schedule = dispatch_schedule();
    run_until_empty(world, &mut schedule, MAX_STEPS)
}

/// Check the bookkeeping invariants that must hold between any two optimizer calls:
/// pool and request registry hold the same ids, the idle registry holds exactly the idle
/// vehicles, and every schedule is time-contiguous.
pub fn assert_consistent(optimizer: &dyn DispatchOptimizer) {
    let pooled: BTreeSet<RequestId> = optimizer
        .unplanned_requests()
        .iter()
        .map(|r| r.id)
        .collect();
    let registered: BTreeSet<RequestId> =
        optimizer.request_registry().occupants().into_iter().collect();
    assert_eq!(pooled, registered, "pool and request registry diverged");
    assert_eq!(pooled.len(), optimizer.unplanned_count());

    for vehicle in optimizer.fleet().vehicles() {
        assert_eq!(
            optimizer.fleet().is_idle(vehicle.id),
            optimizer.idle_registry().contains(vehicle.id),
            "idle registry out of sync for {:?}",
            vehicle.id
        );
        assert!(
            vehicle.schedule().is_contiguous(),
            "schedule of {:?} is not contiguous",
            vehicle.id
        );
        if let Some(coord) = optimizer.idle_registry().coord_of(vehicle.id) {
            assert_eq!(vehicle.stay_location().map(|l| l.coord), Some(coord));
        }
    }
}

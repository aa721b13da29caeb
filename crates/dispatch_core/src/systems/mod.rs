pub mod reoptimize;
pub mod request_submitted;
pub mod task_ended;

use tracing::error;

use crate::error::DispatchError;
use crate::runner::DispatchFailure;

/// Keep the first failure; the runner stops before the next event.
fn record_failure(failure: &mut DispatchFailure, err: DispatchError) {
    error!(%err, "dispatch core failed");
    if failure.0.is_none() {
        failure.0 = Some(err);
    }
}

#[cfg(test)]
mod end_to_end_tests {
    use bevy_ecs::prelude::World;

    use crate::config::DispatchConfig;
    use crate::error::{DispatchError, InvariantViolation};
    use crate::fleet::{ServiceDurations, Vehicle};
    use crate::model::{Request, RequestId, ScheduleStatus, TaskType, VehicleId};
    use crate::optimizer::build_optimizer;
    use crate::routing::{RoadNetwork, RouteProviderKind};
    use crate::runner::{dispatch_schedule, run_until_empty, OptimizerResource};
    use crate::scenario::{init_dispatch_world, spawn_vehicle, submit_request};
    use crate::spatial::{Coord, Location, NodeId};
    use crate::telemetry::DispatchTelemetry;

    const HOUR_MS: u64 = 60 * 60 * 1000;

    fn world_with(config: DispatchConfig) -> World {
        let mut world = World::new();
        let optimizer = build_optimizer(&config).expect("optimizer");
        init_dispatch_world(&mut world, optimizer, None);
        world
    }

    fn straight_line_config() -> DispatchConfig {
        DispatchConfig::default()
            .with_durations(ServiceDurations {
                pickup_ms: 1_000,
                dropoff_ms: 2_000,
            })
            .with_routing(RouteProviderKind::StraightLine { speed_mps: 10.0 })
    }

    #[test]
    fn simulates_one_ride_end_to_end() {
        let mut world = world_with(straight_line_config());
        spawn_vehicle(
            &mut world,
            Vehicle::new(VehicleId(1), 0, HOUR_MS, Location::at(1, 0.0, 0.0)),
        )
        .expect("vehicle");
        submit_request(
            &mut world,
            Request::new(
                RequestId(1),
                1_000,
                Location::at(10, 100.0, 0.0),
                Location::at(11, 400.0, 0.0),
            ),
        );

        let mut schedule = dispatch_schedule();
        let steps = run_until_empty(&mut world, &mut schedule, 1000).expect("run");
        assert!(steps < 1000, "runner did not converge");

        let telemetry = world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.requests_submitted, 1);
        assert_eq!(telemetry.dispatches.len(), 1);
        let record = &telemetry.dispatches[0];
        assert_eq!(record.vehicle, VehicleId(1));
        assert_eq!(record.dispatched_at, 1_000);
        assert_eq!(record.pickup_eta, 11_000);
        assert_eq!(record.dropoff_eta, 44_000);
        assert_eq!(record.wait_time(), 10_000);

        let optimizer = &world.resource::<OptimizerResource>().0;
        let vehicle = optimizer.fleet().vehicle(VehicleId(1)).expect("vehicle");
        assert_eq!(vehicle.schedule().status(), ScheduleStatus::Completed);
        assert!(vehicle.schedule().is_contiguous());
        let kinds: Vec<_> = vehicle.schedule().tasks().iter().map(|t| t.task_type()).collect();
        assert_eq!(
            kinds,
            vec![
                TaskType::Stay,
                TaskType::Drive,
                TaskType::Pickup,
                TaskType::Drive,
                TaskType::Dropoff,
                TaskType::Stay
            ]
        );
        assert_eq!(optimizer.unplanned_count(), 0);
        assert!(optimizer.idle_registry().is_empty());
    }

    #[test]
    fn second_request_waits_for_the_vehicle_to_free_up() {
        let mut world = world_with(straight_line_config());
        spawn_vehicle(
            &mut world,
            Vehicle::new(VehicleId(1), 0, HOUR_MS, Location::at(1, 0.0, 0.0)),
        )
        .expect("vehicle");
        submit_request(
            &mut world,
            Request::new(
                RequestId(1),
                1_000,
                Location::at(10, 100.0, 0.0),
                Location::at(11, 400.0, 0.0),
            ),
        );
        submit_request(
            &mut world,
            Request::new(
                RequestId(2),
                2_000,
                Location::at(11, 400.0, 0.0),
                Location::at(12, 400.0, 300.0),
            ),
        );

        let mut schedule = dispatch_schedule();
        run_until_empty(&mut world, &mut schedule, 1000).expect("run");

        let telemetry = world.resource::<DispatchTelemetry>();
        assert_eq!(telemetry.dispatches.len(), 2);
        let second = &telemetry.dispatches[1];
        assert_eq!(second.request, RequestId(2));
        assert_eq!(second.dispatched_at, 44_000);
        assert_eq!(second.pickup_eta, 44_000);
        assert_eq!(second.dropoff_eta, 77_000);
        assert_eq!(second.wait_time(), 42_000);
    }

    #[test]
    fn unroutable_trip_aborts_the_run() {
        let mut network = RoadNetwork::default();
        network.add_node(NodeId(0), Coord::new(0.0, 0.0));
        network.add_node(NodeId(1), Coord::new(100.0, 0.0));
        network.add_node(NodeId(2), Coord::new(5_000.0, 0.0));
        network.add_two_way_link(NodeId(0), NodeId(1), 10.0);
        let location = |id: u32| network.location_of(NodeId(id)).expect("node");
        let (start, origin, island) = (location(0), location(1), location(2));

        let mut world = world_with(
            DispatchConfig::default().with_routing(RouteProviderKind::Network {
                network: network.clone(),
            }),
        );
        spawn_vehicle(&mut world, Vehicle::new(VehicleId(1), 0, HOUR_MS, start)).expect("vehicle");
        submit_request(&mut world, Request::new(RequestId(1), 500, origin, island));

        let mut schedule = dispatch_schedule();
        let err = run_until_empty(&mut world, &mut schedule, 1000).expect_err("unroutable");
        assert_eq!(
            err,
            DispatchError::Invariant(InvariantViolation::UnroutableTrip(RequestId(1)))
        );
    }
}

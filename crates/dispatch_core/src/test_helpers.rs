//! Test helpers for common test setup and utilities.
//!
//! Shared fixtures for unit tests, integration tests and benches: vehicles and requests
//! on the straight-line plane, and a dispatch world ready to run.

use bevy_ecs::prelude::World;

use crate::config::DispatchConfig;
use crate::error::ConfigError;
use crate::fleet::{ServiceDurations, Vehicle};
use crate::model::{Request, RequestId, VehicleId};
use crate::optimizer::{build_optimizer, DispatchOptimizer, RuleBasedOptimizer};
use crate::routing::{RouteProviderKind, StraightLineRouteProvider};
use crate::scenario::init_dispatch_world;
use crate::spatial::Location;

/// Round speed so expected travel times are easy to compute: 100 m take 10 s.
pub const TEST_SPEED_MPS: f64 = 10.0;

pub const TEST_SHIFT_END_MS: u64 = 60 * 60 * 1000;

/// Short dwell times keep hand-computed schedules readable.
pub const TEST_DURATIONS: ServiceDurations = ServiceDurations {
    pickup_ms: 1_000,
    dropoff_ms: 2_000,
};

/// Default dispatch configuration with [`TEST_SPEED_MPS`] straight-line routing and
/// [`TEST_DURATIONS`].
pub fn test_config() -> DispatchConfig {
    DispatchConfig::default()
        .with_durations(TEST_DURATIONS)
        .with_routing(RouteProviderKind::StraightLine {
            speed_mps: TEST_SPEED_MPS,
        })
}

/// Vehicle `id` operating in `[0, TEST_SHIFT_END_MS]`, starting at `(x, y)` on node `id`.
pub fn vehicle_at(id: u32, x: f64, y: f64) -> Vehicle {
    Vehicle::new(VehicleId(id), 0, TEST_SHIFT_END_MS, Location::at(id, x, y))
}

/// Request `id` submitted at `submitted_at`. Origin and destination get nodes derived
/// from the id so they never collide with vehicle nodes.
pub fn request_at(id: u32, submitted_at: u64, origin: (f64, f64), destination: (f64, f64)) -> Request {
    Request::new(
        RequestId(id),
        submitted_at,
        Location::at(10_000 + 2 * id, origin.0, origin.1),
        Location::at(10_001 + 2 * id, destination.0, destination.1),
    )
}

/// Rule-based optimizer over [`StraightLineRouteProvider`] at [`TEST_SPEED_MPS`] with the
/// given vehicles added and started (each is idle at its start location).
///
/// # Panics
///
/// Panics if the configuration is invalid or vehicle ids repeat.
pub fn started_optimizer(config: &DispatchConfig, vehicles: &[(u32, f64, f64)]) -> RuleBasedOptimizer {
    let mut optimizer = RuleBasedOptimizer::new(
        config,
        Box::new(StraightLineRouteProvider::new(TEST_SPEED_MPS)),
    )
    .expect("test config should be valid");
    for &(id, x, y) in vehicles {
        optimizer
            .add_vehicle(vehicle_at(id, x, y))
            .expect("vehicle ids should be unique");
        optimizer
            .on_vehicle_task_completed(VehicleId(id))
            .expect("fresh schedule should start");
    }
    optimizer
}

/// Create a dispatch world with every harness resource and an optimizer built from
/// `config`.
pub fn create_test_world(config: &DispatchConfig) -> Result<World, ConfigError> {
    let mut world = World::new();
    init_dispatch_world(&mut world, build_optimizer(config)?, None);
    world.insert_resource(config.clone());
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_vehicles_are_idle_and_registered() {
        let optimizer = started_optimizer(&test_config(), &[(1, 0.0, 0.0), (2, 50.0, 50.0)]);
        assert!(optimizer.fleet().is_idle(VehicleId(1)));
        assert_eq!(optimizer.idle_registry().occupants(), vec![VehicleId(1), VehicleId(2)]);
    }

    #[test]
    fn request_nodes_are_distinct() {
        let a = request_at(1, 0, (0.0, 0.0), (1.0, 1.0));
        let b = request_at(2, 0, (0.0, 0.0), (1.0, 1.0));
        assert_ne!(a.origin.node, a.destination.node);
        assert_ne!(a.destination.node, b.origin.node);
    }
}

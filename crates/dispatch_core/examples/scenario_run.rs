//! Run a seeded 1 000 request / 80 vehicle scenario and print dispatch KPIs.
//!
//! Run with: cargo run -p dispatch_core --example scenario_run
//! Set RUST_LOG=dispatch_core=debug to see every reoptimization round.

use bevy_ecs::prelude::World;
use dispatch_core::clock::{SimulationClock, ONE_SEC_MS};
use dispatch_core::config::DispatchConfig;
use dispatch_core::matching::MatchingGoal;
use dispatch_core::runner::{dispatch_schedule, run_until_empty, OptimizerResource};
use dispatch_core::scenario::{build_scenario, ScenarioParams};
use dispatch_core::telemetry::DispatchTelemetry;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    const NUM_REQUESTS: usize = 1_000;
    const NUM_VEHICLES: usize = 80;
    const SEED: u64 = 123;

    let goal = MatchingGoal::DemandSupplyEquil;
    let params = ScenarioParams::default()
        .with_seed(SEED)
        .with_fleet_size(NUM_VEHICLES)
        .with_request_count(NUM_REQUESTS)
        .with_request_window_hours(2)
        .with_shift_end_ms(4 * 60 * 60 * ONE_SEC_MS)
        .with_prebooking(0.1, 30 * 60 * ONE_SEC_MS)
        .with_reoptimization_interval_ms(30 * ONE_SEC_MS)
        .with_dispatch_config(DispatchConfig::default().with_goal(goal));

    let mut world = World::new();
    if let Err(err) = build_scenario(&mut world, params) {
        eprintln!("invalid scenario: {err}");
        std::process::exit(1);
    }

    let mut schedule = dispatch_schedule();
    let steps = match run_until_empty(&mut world, &mut schedule, 5_000_000) {
        Ok(steps) => steps,
        Err(err) => {
            eprintln!("dispatch failed: {err}");
            std::process::exit(1);
        }
    };

    let telemetry = world.resource::<DispatchTelemetry>();
    let clock = world.resource::<SimulationClock>();
    let unplanned = world.resource::<OptimizerResource>().0.unplanned_count();
    let sim_time_secs = clock.now() / ONE_SEC_MS;

    println!(
        "--- Scenario run ({NUM_REQUESTS} requests, {NUM_VEHICLES} vehicles, {goal:?}, seed {SEED}) ---"
    );
    println!("Steps executed: {steps}");
    println!(
        "Simulation time: {} s ({:.1} min)",
        sim_time_secs,
        sim_time_secs as f64 / 60.0
    );
    println!("Requests submitted: {}", telemetry.requests_submitted);
    println!("Dispatched: {}", telemetry.dispatches.len());
    println!("Never served: {unplanned}");
    println!(
        "Rounds: {} request-initiated, {} vehicle-initiated",
        telemetry.request_initiated_rounds, telemetry.vehicle_initiated_rounds
    );
    if let Some(mean) = telemetry.mean_wait_ms() {
        println!("Mean wait: {:.1} s", mean / ONE_SEC_MS as f64);
    }

    const SAMPLE: usize = 20;
    for (i, r) in telemetry.dispatches.iter().take(SAMPLE).enumerate() {
        println!(
            "  {}  request={:?} vehicle={:?} mode={:?}  time_to_dispatch={} s  time_to_pickup={} s  dropoff_at={} s",
            i + 1,
            r.request,
            r.vehicle,
            r.mode,
            r.time_to_dispatch() / ONE_SEC_MS,
            r.time_to_pickup() / ONE_SEC_MS,
            r.dropoff_eta / ONE_SEC_MS,
        );
    }
    if telemetry.dispatches.len() > SAMPLE {
        println!("  ... and {} more", telemetry.dispatches.len() - SAMPLE);
    }
}

//! Scenario setup: seed the world with a fleet and a stream of request submissions.
//!
//! Vehicles start at random positions and requests are spread over a configurable time
//! window. Everything is drawn from one seeded RNG so a scenario replays identically.

mod build;
mod params;

pub use build::{build_scenario, init_dispatch_world, spawn_vehicle, submit_request};
pub use params::ScenarioParams;

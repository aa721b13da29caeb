//! Online dispatch core for a fleet-matching engine.
//!
//! Incoming requests are matched to idle vehicles one pairing at a time. Two grid indexes
//! ([`spatial::ZonalRegistry`]) keep candidate sets small, a
//! [`matching::DispatchEvaluator`] scores the candidates exactly, and the winner is
//! spliced into the vehicle's schedule ([`fleet::Fleet::commit`]).
//!
//! The [`runner`], [`systems`] and [`scenario`] modules are a small discrete-event host
//! built on `bevy_ecs` that drives the core the way a transport simulation would.

pub mod clock;
pub mod config;
pub mod error;
pub mod fleet;
pub mod matching;
pub mod model;
pub mod optimizer;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod spatial;
pub mod systems;
pub mod telemetry;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

//! Dispatch configuration: everything the optimizer is built from.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fleet::ServiceDurations;
use crate::matching::{MatchingGoal, ObjectiveKind, UrgencyKind};
use crate::routing::RouteProviderKind;

/// Default grid cell size for both registries (metres).
const DEFAULT_ZONE_EDGE_LENGTH: f64 = 1000.0;

/// Which optimizer variant the host runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    /// Zonal candidate sets capped by the nearest-vehicles/requests limits.
    #[default]
    RuleBased,
    /// Every idle vehicle / unplanned request is a candidate. Reference for the zonal variant.
    Exhaustive,
}

#[derive(Debug, Clone, PartialEq, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub goal: MatchingGoal,
    /// Candidate cap in request-initiated mode.
    pub nearest_vehicles_limit: usize,
    /// Candidate cap in vehicle-initiated mode.
    pub nearest_requests_limit: usize,
    /// Grid cell size for both zonal registries (metres).
    pub zone_edge_length: f64,
    /// Mid-route diversion. Unsupported; must stay `false`.
    pub vehicle_diversion: bool,
    pub durations: ServiceDurations,
    pub objective: ObjectiveKind,
    pub urgency: UrgencyKind,
    pub optimizer: OptimizerKind,
    pub routing: RouteProviderKind,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            goal: MatchingGoal::default(),
            nearest_vehicles_limit: 40,
            nearest_requests_limit: 40,
            zone_edge_length: DEFAULT_ZONE_EDGE_LENGTH,
            vehicle_diversion: false,
            durations: ServiceDurations::default(),
            objective: ObjectiveKind::default(),
            urgency: UrgencyKind::default(),
            optimizer: OptimizerKind::default(),
            routing: RouteProviderKind::default(),
        }
    }
}

impl DispatchConfig {
    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vehicle_diversion {
            return Err(ConfigError::DiversionUnsupported);
        }
        if self.nearest_vehicles_limit == 0 {
            return Err(ConfigError::NonPositiveLimit {
                name: "nearest_vehicles_limit",
            });
        }
        if self.nearest_requests_limit == 0 {
            return Err(ConfigError::NonPositiveLimit {
                name: "nearest_requests_limit",
            });
        }
        if !(self.zone_edge_length.is_finite() && self.zone_edge_length > 0.0) {
            return Err(ConfigError::InvalidZoneEdge(self.zone_edge_length));
        }
        Ok(())
    }

    pub fn with_goal(mut self, goal: MatchingGoal) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_nearest_vehicles_limit(mut self, limit: usize) -> Self {
        self.nearest_vehicles_limit = limit;
        self
    }

    pub fn with_nearest_requests_limit(mut self, limit: usize) -> Self {
        self.nearest_requests_limit = limit;
        self
    }

    pub fn with_zone_edge_length(mut self, edge_length: f64) -> Self {
        self.zone_edge_length = edge_length;
        self
    }

    pub fn with_vehicle_diversion(mut self, enabled: bool) -> Self {
        self.vehicle_diversion = enabled;
        self
    }

    pub fn with_durations(mut self, durations: ServiceDurations) -> Self {
        self.durations = durations;
        self
    }

    pub fn with_objective(mut self, objective: ObjectiveKind) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_urgency(mut self, urgency: UrgencyKind) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_routing(mut self, routing: RouteProviderKind) -> Self {
        self.routing = routing;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config = DispatchConfig::from_json_str(
            r#"{ "goal": "DEMAND_SUPPLY_EQUIL", "nearest_vehicles_limit": 8, "zone_edge_length": 500.0 }"#,
        )
        .expect("valid config");
        assert_eq!(config.goal, MatchingGoal::DemandSupplyEquil);
        assert_eq!(config.nearest_vehicles_limit, 8);
        assert_eq!(config.nearest_requests_limit, 40);
        assert_eq!(config.zone_edge_length, 500.0);
        assert!(!config.vehicle_diversion);
    }

    #[test]
    fn diversion_is_rejected() {
        let err = DispatchConfig::from_json_str(r#"{ "vehicle_diversion": true }"#)
            .expect_err("diversion unsupported");
        assert_eq!(err, ConfigError::DiversionUnsupported);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            DispatchConfig::default().with_nearest_requests_limit(0).validate(),
            Err(ConfigError::NonPositiveLimit {
                name: "nearest_requests_limit"
            })
        );
        assert!(matches!(
            DispatchConfig::default().with_zone_edge_length(-5.0).validate(),
            Err(ConfigError::InvalidZoneEdge(_))
        ));
        assert!(matches!(
            DispatchConfig::from_json_str(r#"{ "goal": "FASTEST" }"#),
            Err(ConfigError::Parse(_))
        ));
    }
}

//! Matching policy: which side of the market drives the next reoptimization.

use serde::{Deserialize, Serialize};

use crate::model::Request;

/// What the operator optimizes for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchingGoal {
    /// Send idle vehicles to the nearest demand; shrinks pickup distance.
    MinPickupTime,
    /// Serve the oldest requests first.
    #[default]
    MinWaitTime,
    /// Switch to vehicle-initiated matching when urgent demand exceeds idle supply.
    DemandSupplyEquil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchingMode {
    VehicleInitiated,
    RequestInitiated,
}

/// Demand/supply counts at a reoptimization moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub now: u64,
    pub unplanned: usize,
    pub urgent_unplanned: usize,
    pub idle_vehicles: usize,
}

/// Stateless mapping from a market snapshot to a matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySelector {
    goal: MatchingGoal,
}

impl PolicySelector {
    pub fn new(goal: MatchingGoal) -> Self {
        Self { goal }
    }

    pub fn goal(&self) -> MatchingGoal {
        self.goal
    }

    pub fn select_mode(&self, snapshot: &MarketSnapshot) -> MatchingMode {
        match self.goal {
            MatchingGoal::MinPickupTime => MatchingMode::VehicleInitiated,
            MatchingGoal::MinWaitTime => MatchingMode::RequestInitiated,
            MatchingGoal::DemandSupplyEquil => {
                if snapshot.urgent_unplanned > snapshot.idle_vehicles {
                    MatchingMode::VehicleInitiated
                } else {
                    MatchingMode::RequestInitiated
                }
            }
        }
    }
}

/// Decides whether an unplanned request is overdue at `now`.
pub trait UrgencyPredicate: Send + Sync {
    fn is_urgent(&self, request: &Request, now: u64) -> bool;
}

impl<F> UrgencyPredicate for F
where
    F: Fn(&Request, u64) -> bool + Send + Sync,
{
    fn is_urgent(&self, request: &Request, now: u64) -> bool {
        self(request, now)
    }
}

/// Urgent once the earliest pickup time has been reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarliestPickupReached;

impl UrgencyPredicate for EarliestPickupReached {
    fn is_urgent(&self, request: &Request, now: u64) -> bool {
        request.earliest_pickup_at <= now
    }
}

/// Urgent once the request has waited longer than `threshold_ms`.
#[derive(Debug, Clone, Copy)]
pub struct WaitedLongerThan {
    pub threshold_ms: u64,
}

impl UrgencyPredicate for WaitedLongerThan {
    fn is_urgent(&self, request: &Request, now: u64) -> bool {
        request.waited_ms(now) > self.threshold_ms
    }
}

/// Serializable urgency selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrgencyKind {
    #[default]
    EarliestPickupReached,
    WaitedLongerThan { threshold_ms: u64 },
    Never,
}

pub fn build_urgency(kind: UrgencyKind) -> Box<dyn UrgencyPredicate> {
    match kind {
        UrgencyKind::EarliestPickupReached => Box::new(EarliestPickupReached),
        UrgencyKind::WaitedLongerThan { threshold_ms } => {
            Box::new(WaitedLongerThan { threshold_ms })
        }
        UrgencyKind::Never => Box::new(|_: &Request, _: u64| false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RequestId;
    use crate::spatial::Location;

    fn snapshot(urgent: usize, idle: usize) -> MarketSnapshot {
        MarketSnapshot {
            now: 0,
            unplanned: urgent,
            urgent_unplanned: urgent,
            idle_vehicles: idle,
        }
    }

    #[test]
    fn fixed_goals_ignore_market() {
        for (urgent, idle) in [(0, 0), (3, 1), (1, 3)] {
            assert_eq!(
                PolicySelector::new(MatchingGoal::MinPickupTime).select_mode(&snapshot(urgent, idle)),
                MatchingMode::VehicleInitiated
            );
            assert_eq!(
                PolicySelector::new(MatchingGoal::MinWaitTime).select_mode(&snapshot(urgent, idle)),
                MatchingMode::RequestInitiated
            );
        }
    }

    #[test]
    fn equilibrium_goal_flips_when_urgent_demand_exceeds_supply() {
        let selector = PolicySelector::new(MatchingGoal::DemandSupplyEquil);
        assert_eq!(selector.select_mode(&snapshot(3, 1)), MatchingMode::VehicleInitiated);
        assert_eq!(selector.select_mode(&snapshot(1, 1)), MatchingMode::RequestInitiated);
        assert_eq!(selector.select_mode(&snapshot(0, 4)), MatchingMode::RequestInitiated);
    }

    #[test]
    fn urgency_predicates() {
        let loc = Location::at(1, 0.0, 0.0);
        let prebooked =
            Request::new(RequestId(1), 0, loc, loc).with_earliest_pickup_at(10_000);
        assert!(!EarliestPickupReached.is_urgent(&prebooked, 9_999));
        assert!(EarliestPickupReached.is_urgent(&prebooked, 10_000));

        let waited = build_urgency(UrgencyKind::WaitedLongerThan { threshold_ms: 500 });
        assert!(!waited.is_urgent(&prebooked, 500));
        assert!(waited.is_urgent(&prebooked, 501));

        assert!(!build_urgency(UrgencyKind::Never).is_urgent(&prebooked, u64::MAX));
    }
}

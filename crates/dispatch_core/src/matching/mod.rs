pub mod evaluator;
pub mod objective;
pub mod policy;
pub mod types;

pub use evaluator::DispatchEvaluator;
pub use objective::{
    build_objective, DispatchObjective, ObjectiveKind, PickupTime, WaitDiscountedPickupTime,
};
pub use policy::{
    build_urgency, EarliestPickupReached, MarketSnapshot, MatchingGoal, MatchingMode,
    PolicySelector, UrgencyKind, UrgencyPredicate, WaitedLongerThan,
};
pub use types::{Dispatch, DispatchCandidate};

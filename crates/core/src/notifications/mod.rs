pub mod eligibility;
pub mod gate;

pub use eligibility::{
    is_eligible, EligibilityDecision, EligibilityReason, NotificationEligibilityEvaluator,
};
pub use gate::{DispatchOutcome, NotificationGate};

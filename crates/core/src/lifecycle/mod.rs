pub mod registry;
pub mod tables;
pub mod validator;

pub use registry::{StatusRegistry, TableExport, TransitionTable};
pub use validator::{can_transition, DecisionReason, TransitionDecision, TransitionValidator};

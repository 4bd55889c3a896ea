pub mod steps;
pub mod tracker;

pub use steps::{StepAction, StepMetadata, StepTransition, WorkflowStep};
pub use tracker::{BookingCreationSequence, StepSequence, WorkflowStepTracker};

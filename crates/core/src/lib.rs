pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod estimation;
pub mod lifecycle;
pub mod notifications;
pub mod ports;
pub mod workflow;

pub use domain::add_on::{AddOn, AddOnCategory, AddOnId, Package, PackageId};
pub use domain::entity::{EntityId, EntityRef, VersionedState};
pub use domain::notification::{
    NotificationChannel, NotificationPayload, NotificationPreference, NotificationType, QuietHours,
};
pub use domain::status::{EntityKind, Status};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use estimation::{CostEstimate, CostEstimationEngine, DeterministicCostEngine};
pub use lifecycle::{can_transition, StatusRegistry, TransitionDecision, TransitionValidator};
pub use notifications::{is_eligible, NotificationEligibilityEvaluator, NotificationGate};
pub use ports::{EntityStateStore, NotificationDispatcher, PackageCatalog};
pub use workflow::{WorkflowStep, WorkflowStepTracker};

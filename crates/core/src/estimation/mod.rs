pub mod catalog;
pub mod engine;

pub use catalog::{estimate_selection, InMemoryPackageCatalog};
pub use engine::{
    estimate, CategoryTotal, CostEstimate, CostEstimationEngine, DeterministicCostEngine,
    EstimateTraceStep, EstimationSettings, MAX_ADD_ONS_ALLOWED,
};

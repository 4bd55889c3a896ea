use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Treatment,
    Country,
    City,
    Hospital,
    Package,
    AddOns,
    CostEstimation,
    PatientInfo,
    Insurance,
    Confirmation,
    ExpertCallScheduling,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 11] = [
        Self::Treatment,
        Self::Country,
        Self::City,
        Self::Hospital,
        Self::Package,
        Self::AddOns,
        Self::CostEstimation,
        Self::PatientInfo,
        Self::Insurance,
        Self::Confirmation,
        Self::ExpertCallScheduling,
    ];

    /// 1-based position in the booking-creation sequence.
    pub fn number(&self) -> u8 {
        match self {
            Self::Treatment => 1,
            Self::Country => 2,
            Self::City => 3,
            Self::Hospital => 4,
            Self::Package => 5,
            Self::AddOns => 6,
            Self::CostEstimation => 7,
            Self::PatientInfo => 8,
            Self::Insurance => 9,
            Self::Confirmation => 10,
            Self::ExpertCallScheduling => 11,
        }
    }

    pub fn from_number(number: u8) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|step| step.number() == number)
            .ok_or_else(|| DomainError::InvalidStep(number.to_string()))
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Treatment => "treatment",
            Self::Country => "country",
            Self::City => "city",
            Self::Hospital => "hospital",
            Self::Package => "package",
            Self::AddOns => "add_ons",
            Self::CostEstimation => "cost_estimation",
            Self::PatientInfo => "patient_info",
            Self::Insurance => "insurance",
            Self::Confirmation => "confirmation",
            Self::ExpertCallScheduling => "expert_call_scheduling",
        }
    }

    /// Accepts slugs with either `_` or `-` separators.
    pub fn from_slug(value: &str) -> Result<Self, DomainError> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|step| step.slug() == normalized)
            .ok_or_else(|| DomainError::InvalidStep(value.to_owned()))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Treatment => "Select Treatment",
            Self::Country => "Select Country",
            Self::City => "Select City",
            Self::Hospital => "Select Hospital",
            Self::Package => "Select Package",
            Self::AddOns => "Add-ons",
            Self::CostEstimation => "Cost Estimation",
            Self::PatientInfo => "Patient Information",
            Self::Insurance => "Insurance",
            Self::Confirmation => "Confirmation",
            Self::ExpertCallScheduling => "Schedule Expert Call",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Treatment => "Choose the treatment or procedure you are looking for.",
            Self::Country => "Choose the destination country for your treatment.",
            Self::City => "Choose the city where you want to be treated.",
            Self::Hospital => "Choose a hospital offering the selected treatment.",
            Self::Package => "Choose a treatment package from the selected hospital.",
            Self::AddOns => "Add travel, accommodation, visa and other services.",
            Self::CostEstimation => "Review the estimated cost of your care journey.",
            Self::PatientInfo => "Provide the patient's personal and medical details.",
            Self::Insurance => "Add insurance details if your treatment is covered.",
            Self::Confirmation => "Review everything and confirm your booking.",
            Self::ExpertCallScheduling => "Book a call with a care expert to discuss your plan.",
        }
    }

    pub fn metadata(&self) -> StepMetadata {
        StepMetadata {
            step: *self,
            number: self.number(),
            slug: self.slug(),
            label: self.label(),
            description: self.description(),
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepMetadata {
    pub step: WorkflowStep,
    pub number: u8,
    pub slug: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

/// Follow-up work the caller should schedule after moving between steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    RecalculateEstimate,
    RequestBookingConfirmation,
    OfferExpertCall,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTransition {
    pub from: WorkflowStep,
    pub to: WorkflowStep,
    pub actions: Vec<StepAction>,
}

#[cfg(test)]
mod tests {
    use super::WorkflowStep;
    use crate::errors::DomainError;

    #[test]
    fn numbers_and_slugs_resolve_back_to_the_step() {
        for step in WorkflowStep::ALL {
            assert_eq!(WorkflowStep::from_number(step.number()), Ok(step));
            assert_eq!(WorkflowStep::from_slug(step.slug()), Ok(step));
        }
        assert_eq!(WorkflowStep::from_slug("Add-Ons"), Ok(WorkflowStep::AddOns));
    }

    #[test]
    fn unknown_steps_are_rejected() {
        assert_eq!(WorkflowStep::from_number(0), Err(DomainError::InvalidStep("0".to_owned())));
        assert_eq!(WorkflowStep::from_number(12), Err(DomainError::InvalidStep("12".to_owned())));
        assert!(matches!(WorkflowStep::from_slug("payment"), Err(DomainError::InvalidStep(_))));
    }

    #[test]
    fn metadata_carries_display_fields() {
        let metadata = WorkflowStep::CostEstimation.metadata();
        assert_eq!(metadata.number, 7);
        assert_eq!(metadata.slug, "cost_estimation");
        assert_eq!(metadata.label, "Cost Estimation");
        assert!(!metadata.description.is_empty());
    }
}

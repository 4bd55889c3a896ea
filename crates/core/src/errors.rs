use thiserror::Error;

use crate::domain::entity::EntityRef;
use crate::domain::status::{EntityKind, Status};
use crate::lifecycle::DecisionReason;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {subject} value `{value}`")]
    InvalidState { subject: String, value: String },
    #[error("{kind} transition from `{from}` to `{to}` is not allowed ({reason})")]
    TransitionDenied { kind: EntityKind, from: Status, to: Status, reason: DecisionReason },
    #[error("{count} add-ons selected but at most {max} are allowed")]
    AddOnLimitExceeded { count: usize, max: usize },
    #[error("concurrent modification of {entity}: expected version {expected}, found {actual}")]
    ConcurrentModification { entity: EntityRef, expected: u64, actual: u64 },
    #[error("invalid workflow step `{0}`")]
    InvalidStep(String),
    #[error("invalid estimate input: {0}")]
    InvalidEstimateInput(String),
    #[error("unknown catalog item `{0}`")]
    UnknownCatalogItem(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    /// Only version conflicts are worth retrying; every other error repeats on replay.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("entity not found: {0}")]
    NotFound(EntityRef),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Domain(error) if error.is_retryable())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not allowed: {message}")]
    NotAllowed { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotAllowed { .. } => "This action is not allowed in the current status.",
            Self::NotFound { .. } => "The requested record could not be found.",
            Self::Conflict { .. } => {
                "The record was changed by someone else. Reload and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotAllowed { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error @ DomainError::TransitionDenied { .. }) => {
                Self::NotAllowed { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Domain(error @ DomainError::ConcurrentModification { .. }) => {
                Self::Conflict { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::NotFound(entity) => {
                Self::NotFound { message: entity.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::entity::EntityRef;
    use crate::domain::status::{BookingStatus, EntityKind};
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::lifecycle::DecisionReason;

    #[test]
    fn denied_transition_maps_to_not_allowed() {
        let interface = ApplicationError::from(DomainError::TransitionDenied {
            kind: EntityKind::Booking,
            from: BookingStatus::Completed.into(),
            to: BookingStatus::Pending.into(),
            reason: DecisionReason::TerminalState,
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::NotAllowed { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(interface.user_message(), "This action is not allowed in the current status.");
    }

    #[test]
    fn add_on_limit_is_validation_feedback() {
        let interface =
            ApplicationError::from(DomainError::AddOnLimitExceeded { count: 21, max: 20 })
                .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::BadRequest { ref message, .. } if message.contains("21")));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn version_conflict_is_the_only_retryable_error() {
        let conflict = ApplicationError::from(DomainError::ConcurrentModification {
            entity: EntityRef::new(EntityKind::Booking, "BK-1"),
            expected: 3,
            actual: 4,
        });
        assert!(conflict.is_retryable());
        assert!(matches!(conflict.into_interface("req-3"), InterfaceError::Conflict { .. }));

        let invalid = ApplicationError::from(DomainError::InvalidState {
            subject: "entity kind".to_owned(),
            value: "invoice".to_owned(),
        });
        assert!(!invalid.is_retryable());
        assert!(!ApplicationError::Persistence("disk full".to_owned()).is_retryable());
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("unreadable transition table".to_owned())
            .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}

use thiserror::Error;

use carepath_core::domain::entity::EntityRef;
use carepath_core::domain::status::Status;
use carepath_core::errors::{ApplicationError, DomainError};

pub mod entity_state;
pub mod memory;

pub use entity_state::{SqlEntityStateStore, TransitionRecord};
pub use memory::{InMemoryEntityStateStore, RecordingDispatcher, SentNotification};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("entity not found: {0}")]
    NotFound(EntityRef),
    #[error("entity already exists: {0}")]
    AlreadyExists(EntityRef),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Domain(error) => Self::Domain(error),
            RepositoryError::NotFound(entity) => Self::NotFound(entity),
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// Both stores refuse a status that belongs to another entity kind's table.
pub(crate) fn ensure_kind(entity: &EntityRef, status: Status) -> Result<(), DomainError> {
    if status.kind() == entity.kind {
        return Ok(());
    }
    Err(DomainError::InvalidState {
        subject: format!("{} status", entity.kind),
        value: format!("{}:{}", status.kind(), status.as_str()),
    })
}

#[cfg(test)]
mod tests {
    use carepath_core::domain::entity::EntityRef;
    use carepath_core::domain::status::{BookingStatus, EntityKind, PaymentStatus};
    use carepath_core::errors::{ApplicationError, DomainError};

    use super::{ensure_kind, RepositoryError};

    #[test]
    fn version_conflicts_stay_retryable_after_mapping() {
        let entity = EntityRef::new(EntityKind::Booking, "BK-1");
        let mapped = ApplicationError::from(RepositoryError::Domain(
            DomainError::ConcurrentModification { entity, expected: 1, actual: 2 },
        ));

        assert!(mapped.is_retryable());
    }

    #[test]
    fn storage_failures_map_to_persistence() {
        let entity = EntityRef::new(EntityKind::Payment, "PAY-1");

        assert!(matches!(
            ApplicationError::from(RepositoryError::AlreadyExists(entity.clone())),
            ApplicationError::Persistence(ref message) if message.contains("payment/PAY-1")
        ));
        assert_eq!(
            ApplicationError::from(RepositoryError::NotFound(entity.clone())),
            ApplicationError::NotFound(entity)
        );
    }

    #[test]
    fn status_from_another_kind_is_rejected() {
        let booking = EntityRef::new(EntityKind::Booking, "BK-7");

        assert_eq!(ensure_kind(&booking, BookingStatus::Confirmed.into()), Ok(()));
        assert_eq!(
            ensure_kind(&booking, PaymentStatus::Refunded.into()),
            Err(DomainError::InvalidState {
                subject: "booking status".to_owned(),
                value: "payment:refunded".to_owned(),
            })
        );
    }
}

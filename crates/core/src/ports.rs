//! Boundaries the core consumes. Adapters live in `carepath-db` and the embedding application.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::add_on::{AddOn, AddOnId, PackageId};
use crate::domain::entity::{EntityRef, VersionedState};
use crate::domain::notification::{NotificationChannel, NotificationPayload, NotificationType};
use crate::domain::status::Status;
use crate::errors::ApplicationError;

/// Versioned status storage with compare-and-swap writes.
#[async_trait]
pub trait EntityStateStore: Send + Sync {
    /// Inserts the entity at version 1. Fails if the entity already exists.
    async fn create(
        &self,
        entity: &EntityRef,
        initial: Status,
    ) -> Result<VersionedState, ApplicationError>;

    async fn load(&self, entity: &EntityRef) -> Result<Option<VersionedState>, ApplicationError>;

    /// Writes `new_state` only if the stored version still equals `expected_version`,
    /// otherwise fails with `DomainError::ConcurrentModification`.
    async fn store(
        &self,
        entity: &EntityRef,
        new_state: Status,
        expected_version: u64,
    ) -> Result<VersionedState, ApplicationError>;
}

pub trait PackageCatalog: Send + Sync {
    fn base_price(&self, package_id: &PackageId) -> Option<Decimal>;
    fn add_on_catalog(&self) -> Vec<AddOn>;

    fn add_on(&self, add_on_id: &AddOnId) -> Option<AddOn> {
        self.add_on_catalog().into_iter().find(|add_on| &add_on.id == add_on_id)
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        channel: NotificationChannel,
        notification_type: NotificationType,
        payload: &NotificationPayload,
    ) -> Result<(), ApplicationError>;
}

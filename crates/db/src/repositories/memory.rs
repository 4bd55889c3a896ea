use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use carepath_core::domain::entity::{EntityRef, VersionedState};
use carepath_core::domain::notification::{
    NotificationChannel, NotificationPayload, NotificationType,
};
use carepath_core::domain::status::Status;
use carepath_core::errors::{ApplicationError, DomainError};
use carepath_core::ports::{EntityStateStore, NotificationDispatcher};

use super::{ensure_kind, RepositoryError};

#[derive(Default)]
pub struct InMemoryEntityStateStore {
    states: RwLock<HashMap<EntityRef, VersionedState>>,
}

#[async_trait::async_trait]
impl EntityStateStore for InMemoryEntityStateStore {
    async fn create(
        &self,
        entity: &EntityRef,
        initial: Status,
    ) -> Result<VersionedState, ApplicationError> {
        ensure_kind(entity, initial)?;
        let mut states = self.states.write().await;
        if states.contains_key(entity) {
            return Err(RepositoryError::AlreadyExists(entity.clone()).into());
        }

        let state = VersionedState {
            entity: entity.clone(),
            status: initial,
            version: 1,
            updated_at: Utc::now(),
        };
        states.insert(entity.clone(), state.clone());
        Ok(state)
    }

    async fn load(&self, entity: &EntityRef) -> Result<Option<VersionedState>, ApplicationError> {
        let states = self.states.read().await;
        Ok(states.get(entity).cloned())
    }

    async fn store(
        &self,
        entity: &EntityRef,
        new_state: Status,
        expected_version: u64,
    ) -> Result<VersionedState, ApplicationError> {
        ensure_kind(entity, new_state)?;
        let mut states = self.states.write().await;
        let current =
            states.get_mut(entity).ok_or_else(|| ApplicationError::NotFound(entity.clone()))?;
        if current.version != expected_version {
            return Err(DomainError::ConcurrentModification {
                entity: entity.clone(),
                expected: expected_version,
                actual: current.version,
            }
            .into());
        }

        current.status = new_state;
        current.version += 1;
        current.updated_at = Utc::now();
        Ok(current.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentNotification {
    pub channel: NotificationChannel,
    pub notification_type: NotificationType,
    pub payload: NotificationPayload,
}

/// Dispatcher that keeps every notification in memory instead of delivering it.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: RwLock<Vec<SentNotification>>,
}

impl RecordingDispatcher {
    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        channel: NotificationChannel,
        notification_type: NotificationType,
        payload: &NotificationPayload,
    ) -> Result<(), ApplicationError> {
        let mut sent = self.sent.write().await;
        sent.push(SentNotification { channel, notification_type, payload: payload.clone() });
        Ok(())
    }
}

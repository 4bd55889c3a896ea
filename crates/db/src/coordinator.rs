//! Load-validate-store loop for lifecycle transitions.
//!
//! The store only enforces the version token; the coordinator owns transition rules and
//! retries a bounded number of times when another writer wins the race.

use tracing::{info, warn};

use carepath_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use carepath_core::domain::entity::{EntityRef, VersionedState};
use carepath_core::domain::status::Status;
use carepath_core::errors::ApplicationError;
use carepath_core::lifecycle::TransitionValidator;
use carepath_core::ports::EntityStateStore;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

pub struct TransitionCoordinator<S, A> {
    store: S,
    validator: TransitionValidator,
    audit: A,
    max_attempts: u32,
}

impl<S, A> TransitionCoordinator<S, A>
where
    S: EntityStateStore,
    A: AuditSink,
{
    pub fn new(store: S, validator: TransitionValidator, audit: A, max_attempts: u32) -> Self {
        Self { store, validator, audit, max_attempts: max_attempts.max(1) }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Creates `entity` at the initial status of its kind's table.
    pub async fn open(
        &self,
        entity: &EntityRef,
        context: &AuditContext,
    ) -> Result<VersionedState, ApplicationError> {
        let initial = self.validator.registry().initial_status(entity.kind)?;
        let state = self.store.create(entity, initial).await?;

        info!(
            event_name = "persistence.state_created",
            entity = %entity,
            status = initial.as_str(),
            correlation_id = %context.correlation_id,
            "entity state created"
        );
        self.audit.emit(
            self.event(context, entity, "persistence.state_created", AuditOutcome::Success)
                .with_metadata("status", initial.as_str())
                .with_metadata("version", state.version.to_string()),
        );
        Ok(state)
    }

    /// Moves `entity` to `to`, re-reading and re-validating after every version conflict.
    pub async fn request_transition(
        &self,
        entity: &EntityRef,
        to: Status,
        context: &AuditContext,
    ) -> Result<VersionedState, ApplicationError> {
        let mut attempt = 1;
        loop {
            let current = self
                .store
                .load(entity)
                .await?
                .ok_or_else(|| ApplicationError::NotFound(entity.clone()))?;

            self.validator.ensure_transition_with_audit(
                entity.kind,
                current.status,
                to,
                &self.audit,
                context,
            )?;

            match self.store.store(entity, to, current.version).await {
                Ok(stored) => {
                    info!(
                        event_name = "persistence.state_stored",
                        entity = %entity,
                        from = current.status.as_str(),
                        to = to.as_str(),
                        version = stored.version,
                        attempt,
                        correlation_id = %context.correlation_id,
                        "entity transition stored"
                    );
                    self.audit.emit(
                        self.event(
                            context,
                            entity,
                            "persistence.state_stored",
                            AuditOutcome::Success,
                        )
                        .with_metadata("from", current.status.as_str())
                        .with_metadata("to", to.as_str())
                        .with_metadata("version", stored.version.to_string())
                        .with_metadata("attempt", attempt.to_string()),
                    );
                    return Ok(stored);
                }
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        event_name = "persistence.version_conflict",
                        entity = %entity,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "version conflict, reloading state"
                    );
                    attempt += 1;
                }
                Err(error) => {
                    warn!(
                        event_name = "persistence.state_store_failed",
                        entity = %entity,
                        attempt,
                        error = %error,
                        "entity transition not stored"
                    );
                    self.audit.emit(
                        self.event(
                            context,
                            entity,
                            "persistence.state_store_failed",
                            AuditOutcome::Failed,
                        )
                        .with_metadata("to", to.as_str())
                        .with_metadata("attempt", attempt.to_string())
                        .with_metadata("error", error.to_string()),
                    );
                    return Err(error);
                }
            }
        }
    }

    fn event(
        &self,
        context: &AuditContext,
        entity: &EntityRef,
        event_type: &str,
        outcome: AuditOutcome,
    ) -> AuditEvent {
        AuditEvent::new(
            Some(context.entity.clone().unwrap_or_else(|| entity.clone())),
            context.correlation_id.clone(),
            event_type,
            AuditCategory::Persistence,
            context.actor.clone(),
            outcome,
        )
    }
}

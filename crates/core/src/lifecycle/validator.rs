use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::status::{EntityKind, Status};
use crate::errors::DomainError;
use crate::lifecycle::registry::StatusRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Allowed,
    Reactivation,
    TerminalState,
    SelfTransition,
    NotInTable,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Reactivation => "reactivation",
            Self::TerminalState => "terminal_state",
            Self::SelfTransition => "self_transition",
            Self::NotInTable => "not_in_table",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDecision {
    pub kind: EntityKind,
    pub from: Status,
    pub to: Status,
    pub allowed: bool,
    pub reason: DecisionReason,
}

/// Generic transition check over an injected [`StatusRegistry`].
#[derive(Clone, Debug)]
pub struct TransitionValidator {
    registry: Arc<StatusRegistry>,
}

impl TransitionValidator {
    pub fn new(registry: Arc<StatusRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }

    pub fn can_transition(
        &self,
        kind: EntityKind,
        from: Status,
        to: Status,
    ) -> Result<bool, DomainError> {
        Ok(self.decide(kind, from, to)?.allowed)
    }

    /// String boundary for callers holding raw status names.
    pub fn can_transition_str(&self, kind: &str, from: &str, to: &str) -> Result<bool, DomainError> {
        let kind = EntityKind::parse(kind)?;
        let from = Status::parse(kind, from)?;
        let to = Status::parse(kind, to)?;
        self.can_transition(kind, from, to)
    }

    pub fn decide(
        &self,
        kind: EntityKind,
        from: Status,
        to: Status,
    ) -> Result<TransitionDecision, DomainError> {
        let decision = self.registry.decide(kind, from, to)?;
        debug!(
            event_name = "lifecycle.transition_checked",
            entity_kind = kind.as_str(),
            from = from.as_str(),
            to = to.as_str(),
            allowed = decision.allowed,
            reason = decision.reason.as_str(),
            "transition checked"
        );
        Ok(decision)
    }

    /// Like [`decide`](Self::decide) but turns a deny into [`DomainError::TransitionDenied`].
    pub fn ensure_transition(
        &self,
        kind: EntityKind,
        from: Status,
        to: Status,
    ) -> Result<TransitionDecision, DomainError> {
        let decision = self.decide(kind, from, to)?;
        if decision.allowed {
            return Ok(decision);
        }

        Err(DomainError::TransitionDenied { kind, from, to, reason: decision.reason })
    }

    pub fn ensure_transition_with_audit<S>(
        &self,
        kind: EntityKind,
        from: Status,
        to: Status,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionDecision, DomainError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.ensure_transition(kind, from, to);
        let (event_type, outcome) = match &result {
            Ok(_) => ("lifecycle.transition_allowed", AuditOutcome::Success),
            Err(DomainError::TransitionDenied { .. }) => {
                ("lifecycle.transition_denied", AuditOutcome::Rejected)
            }
            Err(_) => ("lifecycle.transition_invalid", AuditOutcome::Failed),
        };

        let mut event = AuditEvent::new(
            audit.entity.clone(),
            audit.correlation_id.clone(),
            event_type,
            AuditCategory::Lifecycle,
            audit.actor.clone(),
            outcome,
        )
        .with_metadata("kind", kind.as_str())
        .with_metadata("from", from.as_str())
        .with_metadata("to", to.as_str());
        if let Err(error) = &result {
            event = event.with_metadata("error", error.to_string());
        }
        sink.emit(event);

        result
    }
}

impl Default for TransitionValidator {
    fn default() -> Self {
        Self::new(Arc::new(StatusRegistry::standard()))
    }
}

/// Free-function form for callers that hold a registry reference directly.
pub fn can_transition(
    registry: &StatusRegistry,
    kind: EntityKind,
    from: Status,
    to: Status,
) -> Result<bool, DomainError> {
    Ok(registry.decide(kind, from, to)?.allowed)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::notification::{
    NotificationChannel, NotificationPayload, NotificationPreference, NotificationType,
};
use crate::errors::ApplicationError;
use crate::notifications::eligibility::{EligibilityReason, NotificationEligibilityEvaluator};
use crate::ports::NotificationDispatcher;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum DispatchOutcome {
    Sent,
    Suppressed(EligibilityReason),
}

/// Sends through `D` only after the eligibility chain allows it.
pub struct NotificationGate<D> {
    evaluator: NotificationEligibilityEvaluator,
    dispatcher: D,
}

impl<D> NotificationGate<D>
where
    D: NotificationDispatcher,
{
    pub fn new(dispatcher: D) -> Self {
        Self { evaluator: NotificationEligibilityEvaluator, dispatcher }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub async fn notify(
        &self,
        preference: &NotificationPreference,
        channel: NotificationChannel,
        notification_type: NotificationType,
        payload: &NotificationPayload,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, ApplicationError> {
        let decision = self.evaluator.evaluate(preference, channel, notification_type, now);
        if !decision.eligible {
            debug!(
                event_name = "notification.suppressed",
                channel = channel.as_str(),
                notification_type = notification_type.as_str(),
                reason = decision.reason.as_str(),
                "notification suppressed"
            );
            return Ok(DispatchOutcome::Suppressed(decision.reason));
        }

        if let Err(error) = self.dispatcher.send(channel, notification_type, payload).await {
            warn!(
                event_name = "notification.dispatch_failed",
                channel = channel.as_str(),
                notification_type = notification_type.as_str(),
                error = %error,
                "notification dispatch failed"
            );
            return Err(error);
        }

        debug!(
            event_name = "notification.sent",
            channel = channel.as_str(),
            notification_type = notification_type.as_str(),
            "notification sent"
        );
        Ok(DispatchOutcome::Sent)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn notify_with_audit<S>(
        &self,
        preference: &NotificationPreference,
        channel: NotificationChannel,
        notification_type: NotificationType,
        payload: &NotificationPayload,
        now: DateTime<Utc>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<DispatchOutcome, ApplicationError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.notify(preference, channel, notification_type, payload, now).await;
        let event = match &result {
            Ok(DispatchOutcome::Sent) => AuditEvent::from_context(
                audit,
                "notification.sent",
                AuditCategory::Notification,
                AuditOutcome::Success,
            ),
            Ok(DispatchOutcome::Suppressed(reason)) => AuditEvent::from_context(
                audit,
                "notification.suppressed",
                AuditCategory::Notification,
                AuditOutcome::Rejected,
            )
            .with_metadata("reason", reason.as_str()),
            Err(error) => AuditEvent::from_context(
                audit,
                "notification.dispatch_failed",
                AuditCategory::Notification,
                AuditOutcome::Failed,
            )
            .with_metadata("error", error.to_string()),
        };
        sink.emit(
            event
                .with_metadata("channel", channel.as_str())
                .with_metadata("notification_type", notification_type.as_str()),
        );
        result
    }
}

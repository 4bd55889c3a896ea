use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::notification::{NotificationChannel, NotificationPreference, NotificationType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityReason {
    ChannelDisabled,
    TypeDisabled,
    UrgentOverride,
    QuietHours,
    Allowed,
}

impl EligibilityReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChannelDisabled => "channel_disabled",
            Self::TypeDisabled => "type_disabled",
            Self::UrgentOverride => "urgent_override",
            Self::QuietHours => "quiet_hours",
            Self::Allowed => "allowed",
        }
    }
}

impl fmt::Display for EligibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityDecision {
    pub eligible: bool,
    pub reason: EligibilityReason,
}

impl EligibilityDecision {
    fn allow(reason: EligibilityReason) -> Self {
        Self { eligible: true, reason }
    }

    fn deny(reason: EligibilityReason) -> Self {
        Self { eligible: false, reason }
    }
}

/// Ordered rule chain deciding whether a notification may be sent right now.
///
/// 1. channel disabled denies;
/// 2. an explicit `false` for the type on that channel denies;
/// 3. urgent types pass when the user keeps urgent alerts on;
/// 4. quiet hours deny;
/// 5. everything else passes.
///
/// The caller supplies `now`; the evaluator never reads the clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct NotificationEligibilityEvaluator;

impl NotificationEligibilityEvaluator {
    pub fn evaluate(
        &self,
        preference: &NotificationPreference,
        channel: NotificationChannel,
        notification_type: NotificationType,
        now: DateTime<Utc>,
    ) -> EligibilityDecision {
        if !preference.channel_enabled(channel) {
            return EligibilityDecision::deny(EligibilityReason::ChannelDisabled);
        }
        if !preference.type_enabled(channel, notification_type) {
            return EligibilityDecision::deny(EligibilityReason::TypeDisabled);
        }
        if preference.urgent_always_enabled && notification_type.is_urgent() {
            return EligibilityDecision::allow(EligibilityReason::UrgentOverride);
        }
        if preference.quiet_hours.contains(now) {
            return EligibilityDecision::deny(EligibilityReason::QuietHours);
        }
        EligibilityDecision::allow(EligibilityReason::Allowed)
    }

    pub fn is_eligible(
        &self,
        preference: &NotificationPreference,
        channel: NotificationChannel,
        notification_type: NotificationType,
        now: DateTime<Utc>,
    ) -> bool {
        self.evaluate(preference, channel, notification_type, now).eligible
    }
}

pub fn is_eligible(
    preference: &NotificationPreference,
    channel: NotificationChannel,
    notification_type: NotificationType,
    now: DateTime<Utc>,
) -> bool {
    NotificationEligibilityEvaluator.is_eligible(preference, channel, notification_type, now)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveTime, TimeZone, Utc};

    use super::{is_eligible, EligibilityReason, NotificationEligibilityEvaluator};
    use crate::domain::notification::{
        NotificationChannel, NotificationPreference, NotificationType, QuietHours,
    };

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, hour, minute, 0).single().expect("valid instant")
    }

    fn night_window() -> QuietHours {
        QuietHours::new(
            NaiveTime::from_hms_opt(22, 0, 0).expect("valid time"),
            NaiveTime::from_hms_opt(7, 0, 0).expect("valid time"),
        )
    }

    #[test]
    fn disabled_type_blocks_regardless_of_quiet_hours() {
        let preference = NotificationPreference::default().with_type(
            NotificationChannel::Sms,
            NotificationType::Promotions,
            false,
        );

        let sms = NotificationChannel::Sms;
        let promotions = NotificationType::Promotions;
        assert!(!is_eligible(&preference, sms, promotions, at(12, 0)));
        assert!(!is_eligible(&preference, sms, promotions, at(23, 0)));
        assert!(is_eligible(&preference, NotificationChannel::Email, promotions, at(12, 0)));
    }

    #[test]
    fn quiet_hours_hold_back_non_urgent_notifications() {
        let preference = NotificationPreference::default().with_quiet_hours(night_window());
        let evaluator = NotificationEligibilityEvaluator;

        let decision = evaluator.evaluate(
            &preference,
            NotificationChannel::Push,
            NotificationType::BookingUpdates,
            at(23, 30),
        );
        assert!(!decision.eligible);
        assert_eq!(decision.reason, EligibilityReason::QuietHours);
        assert!(evaluator.is_eligible(
            &preference,
            NotificationChannel::Push,
            NotificationType::BookingUpdates,
            at(12, 0),
        ));
    }

    #[test]
    fn urgent_alerts_bypass_quiet_hours_when_allowed() {
        let preference = NotificationPreference::default().with_quiet_hours(night_window());
        let evaluator = NotificationEligibilityEvaluator;

        let decision = evaluator.evaluate(
            &preference,
            NotificationChannel::Push,
            NotificationType::SecurityAlerts,
            at(23, 30),
        );
        assert!(decision.eligible);
        assert_eq!(decision.reason, EligibilityReason::UrgentOverride);

        let strict = preference.with_urgent_always_enabled(false);
        assert!(!evaluator.is_eligible(
            &strict,
            NotificationChannel::Push,
            NotificationType::SecurityAlerts,
            at(23, 30),
        ));
    }

    #[test]
    fn disabled_channel_beats_urgent_override() {
        let preference = NotificationPreference::default()
            .with_channel(NotificationChannel::Sms, false)
            .with_quiet_hours(night_window());

        let decision = NotificationEligibilityEvaluator.evaluate(
            &preference,
            NotificationChannel::Sms,
            NotificationType::CareAlerts,
            at(3, 0),
        );
        assert!(!decision.eligible);
        assert_eq!(decision.reason, EligibilityReason::ChannelDisabled);
    }

    #[test]
    fn explicitly_disabled_urgent_type_is_not_overridden() {
        let preference = NotificationPreference::default().with_type(
            NotificationChannel::Email,
            NotificationType::CareAlerts,
            false,
        );

        let decision = NotificationEligibilityEvaluator.evaluate(
            &preference,
            NotificationChannel::Email,
            NotificationType::CareAlerts,
            at(12, 0),
        );
        assert_eq!(decision.reason, EligibilityReason::TypeDisabled);
    }

    #[test]
    fn missing_preferences_default_to_allowed() {
        let decision = NotificationEligibilityEvaluator.evaluate(
            &NotificationPreference::default(),
            NotificationChannel::InApp,
            NotificationType::PaymentUpdates,
            at(23, 30),
        );
        assert!(decision.eligible);
        assert_eq!(decision.reason, EligibilityReason::Allowed);
    }
}

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::entity::EntityRef;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
    InApp,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
            Self::InApp => "in_app",
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    BookingUpdates,
    AppointmentReminders,
    ExpertCallUpdates,
    PaymentUpdates,
    PrescriptionUpdates,
    Promotions,
    SecurityAlerts,
    CareAlerts,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookingUpdates => "booking_updates",
            Self::AppointmentReminders => "appointment_reminders",
            Self::ExpertCallUpdates => "expert_call_updates",
            Self::PaymentUpdates => "payment_updates",
            Self::PrescriptionUpdates => "prescription_updates",
            Self::Promotions => "promotions",
            Self::SecurityAlerts => "security_alerts",
            Self::CareAlerts => "care_alerts",
        }
    }

    /// Urgent types may bypass quiet hours when the user allows it.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::SecurityAlerts | Self::CareAlerts)
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPreference {
    pub enabled: bool,
    #[serde(default)]
    pub types: BTreeMap<NotificationType, bool>,
}

impl Default for ChannelPreference {
    fn default() -> Self {
        Self { enabled: true, types: BTreeMap::new() }
    }
}

/// Window in the user's local time during which non-urgent notifications are held back.
///
/// A window whose end is earlier than its start wraps past midnight; the part after
/// midnight counts against the weekday on which the window opened. An empty `days`
/// list applies the window every day, and `start == end` describes an empty window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    pub days: Vec<Weekday>,
    #[serde(default = "utc", rename = "utc_offset_minutes", with = "offset_minutes")]
    offset: FixedOffset,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { enabled: true, start, end, days: Vec::new(), offset: utc() }
    }

    pub fn on_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days = days.into_iter().collect();
        self
    }

    /// Offsets must stay strictly within one day of UTC.
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Result<Self, DomainError> {
        self.offset = offset_from_minutes(minutes)?;
        Ok(self)
    }

    pub fn utc_offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.start == self.end {
            return false;
        }

        let local = now.with_timezone(&self.offset);
        let time = local.time();
        let weekday = local.weekday();

        if self.start < self.end {
            return time >= self.start && time < self.end && self.applies_on(weekday);
        }

        if time >= self.start {
            self.applies_on(weekday)
        } else if time < self.end {
            self.applies_on(weekday.pred())
        } else {
            false
        }
    }

    fn applies_on(&self, weekday: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&weekday)
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            days: Vec::new(),
            offset: utc(),
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, DomainError> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt).ok_or_else(|| {
        DomainError::InvalidState {
            subject: "quiet hours utc offset".to_owned(),
            value: format!("{minutes} minutes"),
        }
    })
}

/// Stores the offset as whole minutes east of UTC.
mod offset_minutes {
    use chrono::FixedOffset;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(offset: &FixedOffset, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(offset.local_minus_utc() / 60)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<FixedOffset, D::Error>
    where
        D: Deserializer<'de>,
    {
        let minutes = i32::deserialize(deserializer)?;
        super::offset_from_minutes(minutes).map_err(de::Error::custom)
    }
}

/// Per-user notification matrix. Channels and types without an explicit entry are enabled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    #[serde(default)]
    pub channels: BTreeMap<NotificationChannel, ChannelPreference>,
    #[serde(default)]
    pub quiet_hours: QuietHours,
    pub urgent_always_enabled: bool,
}

impl Default for NotificationPreference {
    fn default() -> Self {
        Self {
            channels: BTreeMap::new(),
            quiet_hours: QuietHours::default(),
            urgent_always_enabled: true,
        }
    }
}

impl NotificationPreference {
    pub fn channel_enabled(&self, channel: NotificationChannel) -> bool {
        self.channels.get(&channel).map(|preference| preference.enabled).unwrap_or(true)
    }

    pub fn type_enabled(
        &self,
        channel: NotificationChannel,
        notification_type: NotificationType,
    ) -> bool {
        self.channels
            .get(&channel)
            .and_then(|preference| preference.types.get(&notification_type).copied())
            .unwrap_or(true)
    }

    pub fn with_channel(mut self, channel: NotificationChannel, enabled: bool) -> Self {
        self.channels.entry(channel).or_default().enabled = enabled;
        self
    }

    pub fn with_type(
        mut self,
        channel: NotificationChannel,
        notification_type: NotificationType,
        enabled: bool,
    ) -> Self {
        self.channels.entry(channel).or_default().types.insert(notification_type, enabled);
        self
    }

    pub fn with_quiet_hours(mut self, quiet_hours: QuietHours) -> Self {
        self.quiet_hours = quiet_hours;
        self
    }

    pub fn with_urgent_always_enabled(mut self, enabled: bool) -> Self {
        self.urgent_always_enabled = enabled;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub entity: Option<EntityRef>,
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeZone, Utc, Weekday};

    use super::{NotificationChannel, NotificationPreference, NotificationType, QuietHours};
    use crate::errors::DomainError;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
    }

    #[test]
    fn wrapping_window_covers_late_evening_and_early_morning() {
        let window = QuietHours::new(hm(22, 0), hm(7, 0));

        // 2026-03-04 is a Wednesday.
        assert!(window.contains(Utc.with_ymd_and_hms(2026, 3, 4, 23, 30, 0).unwrap()));
        assert!(window.contains(Utc.with_ymd_and_hms(2026, 3, 5, 6, 59, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2026, 3, 5, 7, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()));
    }

    #[test]
    fn after_midnight_part_belongs_to_the_opening_day() {
        let window = QuietHours::new(hm(22, 0), hm(7, 0)).on_days([Weekday::Fri]);

        // Saturday 02:00 falls in Friday night's window.
        assert!(window.contains(Utc.with_ymd_and_hms(2026, 3, 7, 2, 0, 0).unwrap()));
        // Friday 02:00 belongs to Thursday night, which is not configured.
        assert!(!window.contains(Utc.with_ymd_and_hms(2026, 3, 6, 2, 0, 0).unwrap()));
    }

    #[test]
    fn utc_offset_shifts_the_local_clock() {
        let window = QuietHours::new(hm(22, 0), hm(7, 0))
            .with_utc_offset_minutes(180)
            .expect("offset within a day");

        // 20:00 UTC is 23:00 at UTC+3.
        assert!(window.contains(Utc.with_ymd_and_hms(2026, 3, 4, 20, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2026, 3, 4, 17, 0, 0).unwrap()));
    }

    #[test]
    fn offsets_of_a_full_day_or_more_are_rejected() {
        let window = QuietHours::new(hm(22, 0), hm(7, 0));

        for minutes in [1440, -1440, i32::MAX, i32::MIN] {
            let error = window.clone().with_utc_offset_minutes(minutes).expect_err("out of range");
            assert_eq!(
                error,
                DomainError::InvalidState {
                    subject: "quiet hours utc offset".to_owned(),
                    value: format!("{minutes} minutes"),
                }
            );
        }
        let edge = window.with_utc_offset_minutes(-1439).expect("just inside a day");
        assert_eq!(edge.utc_offset_minutes(), -1439);
    }

    #[test]
    fn stored_offset_is_validated_when_loaded() {
        let loaded: QuietHours = toml::from_str(
            "enabled = true\nstart = \"22:00:00\"\nend = \"07:00:00\"\nutc_offset_minutes = -300\n",
        )
        .expect("valid window");
        assert_eq!(loaded.utc_offset_minutes(), -300);
        // 04:00 UTC is 23:00 at UTC-5.
        assert!(loaded.contains(Utc.with_ymd_and_hms(2026, 3, 5, 4, 0, 0).unwrap()));

        let rejected = toml::from_str::<QuietHours>(
            "enabled = true\nstart = \"22:00:00\"\nend = \"07:00:00\"\nutc_offset_minutes = 1440\n",
        );
        let message = rejected.expect_err("a full day is out of range").to_string();
        assert!(message.contains("quiet hours utc offset"), "unexpected error: {message}");

        let defaulted: QuietHours =
            toml::from_str("enabled = true\nstart = \"22:00:00\"\nend = \"07:00:00\"\n")
                .expect("offset is optional");
        assert_eq!(defaulted.utc_offset_minutes(), 0);
    }

    #[test]
    fn disabled_or_empty_window_never_matches() {
        let mut window = QuietHours::new(hm(9, 0), hm(9, 0));
        assert!(!window.contains(Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap()));

        window = QuietHours::new(hm(8, 0), hm(18, 0));
        window.enabled = false;
        assert!(!window.contains(Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()));
    }

    #[test]
    fn absent_entries_default_to_enabled() {
        let preference = NotificationPreference::default()
            .with_type(NotificationChannel::Sms, NotificationType::Promotions, false);

        assert!(preference.channel_enabled(NotificationChannel::Email));
        assert!(preference.channel_enabled(NotificationChannel::Sms));
        assert!(preference.type_enabled(NotificationChannel::Sms, NotificationType::BookingUpdates));
        assert!(!preference.type_enabled(NotificationChannel::Sms, NotificationType::Promotions));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Booking,
    Appointment,
    ExpertCall,
    Payment,
    Prescription,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Booking,
        EntityKind::Appointment,
        EntityKind::ExpertCall,
        EntityKind::Payment,
        EntityKind::Prescription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Appointment => "appointment",
            Self::ExpertCall => "expert_call",
            Self::Payment => "payment",
            Self::Prescription => "prescription",
        }
    }

    /// Accepts `expert_call`, `expert-call` and `expertcall` spellings.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "booking" => Ok(Self::Booking),
            "appointment" => Ok(Self::Appointment),
            "expert_call" | "expertcall" => Ok(Self::ExpertCall),
            "payment" => Ok(Self::Payment),
            "prescription" => Ok(Self::Prescription),
            _ => Err(DomainError::InvalidState {
                subject: "entity kind".to_owned(),
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    OnHold,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::OnHold => "on_hold",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = normalize(value);
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 7] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
        Self::Rescheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
            Self::Rescheduled => "rescheduled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = normalize(value);
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertCallStatus {
    Pending,
    Scheduled,
    ReminderSent,
    Ongoing,
    Completed,
    Cancelled,
    Rescheduled,
    NoShow,
}

impl ExpertCallStatus {
    pub const ALL: [ExpertCallStatus; 8] = [
        Self::Pending,
        Self::Scheduled,
        Self::ReminderSent,
        Self::Ongoing,
        Self::Completed,
        Self::Cancelled,
        Self::Rescheduled,
        Self::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::ReminderSent => "reminder_sent",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
            Self::NoShow => "no_show",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = normalize(value);
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    PartiallyRefunded,
    Cancelled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 7] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
        Self::Refunded,
        Self::PartiallyRefunded,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = normalize(value);
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
    Expired,
}

impl PrescriptionStatus {
    pub const ALL: [PrescriptionStatus; 5] =
        [Self::Pending, Self::Active, Self::Completed, Self::Cancelled, Self::Expired];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = normalize(value);
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

/// A status tagged with the entity kind it belongs to.
///
/// Statuses of different kinds never compare equal, so a booking `pending`
/// cannot be mistaken for a payment `pending` inside a transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum Status {
    Booking(BookingStatus),
    Appointment(AppointmentStatus),
    ExpertCall(ExpertCallStatus),
    Payment(PaymentStatus),
    Prescription(PrescriptionStatus),
}

impl Status {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Booking(_) => EntityKind::Booking,
            Self::Appointment(_) => EntityKind::Appointment,
            Self::ExpertCall(_) => EntityKind::ExpertCall,
            Self::Payment(_) => EntityKind::Payment,
            Self::Prescription(_) => EntityKind::Prescription,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booking(status) => status.as_str(),
            Self::Appointment(status) => status.as_str(),
            Self::ExpertCall(status) => status.as_str(),
            Self::Payment(status) => status.as_str(),
            Self::Prescription(status) => status.as_str(),
        }
    }

    pub fn parse(kind: EntityKind, value: &str) -> Result<Self, DomainError> {
        let parsed = match kind {
            EntityKind::Booking => BookingStatus::parse(value).map(Self::Booking),
            EntityKind::Appointment => AppointmentStatus::parse(value).map(Self::Appointment),
            EntityKind::ExpertCall => ExpertCallStatus::parse(value).map(Self::ExpertCall),
            EntityKind::Payment => PaymentStatus::parse(value).map(Self::Payment),
            EntityKind::Prescription => PrescriptionStatus::parse(value).map(Self::Prescription),
        };

        parsed.ok_or_else(|| DomainError::InvalidState {
            subject: format!("{kind} status"),
            value: value.to_owned(),
        })
    }

    pub fn all(kind: EntityKind) -> Vec<Status> {
        match kind {
            EntityKind::Booking => BookingStatus::ALL.into_iter().map(Self::Booking).collect(),
            EntityKind::Appointment => {
                AppointmentStatus::ALL.into_iter().map(Self::Appointment).collect()
            }
            EntityKind::ExpertCall => {
                ExpertCallStatus::ALL.into_iter().map(Self::ExpertCall).collect()
            }
            EntityKind::Payment => PaymentStatus::ALL.into_iter().map(Self::Payment).collect(),
            EntityKind::Prescription => {
                PrescriptionStatus::ALL.into_iter().map(Self::Prescription).collect()
            }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BookingStatus> for Status {
    fn from(value: BookingStatus) -> Self {
        Self::Booking(value)
    }
}

impl From<AppointmentStatus> for Status {
    fn from(value: AppointmentStatus) -> Self {
        Self::Appointment(value)
    }
}

impl From<ExpertCallStatus> for Status {
    fn from(value: ExpertCallStatus) -> Self {
        Self::ExpertCall(value)
    }
}

impl From<PaymentStatus> for Status {
    fn from(value: PaymentStatus) -> Self {
        Self::Payment(value)
    }
}

impl From<PrescriptionStatus> for Status {
    fn from(value: PrescriptionStatus) -> Self {
        Self::Prescription(value)
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase().replace('-', "_")
}

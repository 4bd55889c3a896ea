//! Built-in transition tables. Adding an entity kind means adding a table here.

use crate::domain::status::{
    AppointmentStatus, BookingStatus, EntityKind, ExpertCallStatus, PaymentStatus,
    PrescriptionStatus,
};
use crate::lifecycle::registry::TransitionTable;

pub fn booking() -> TransitionTable {
    use BookingStatus::*;

    TransitionTable::assemble::<BookingStatus>(
        EntityKind::Booking,
        Pending,
        &[
            (Pending, &[Confirmed, Cancelled, OnHold]),
            (Confirmed, &[InProgress, Cancelled, OnHold]),
            (OnHold, &[Pending, Confirmed, Cancelled]),
            (InProgress, &[Completed, Cancelled, OnHold]),
            (Completed, &[]),
            (Cancelled, &[]),
        ],
        &[],
    )
}

pub fn appointment() -> TransitionTable {
    use AppointmentStatus::*;

    TransitionTable::assemble::<AppointmentStatus>(
        EntityKind::Appointment,
        Scheduled,
        &[
            (Scheduled, &[Confirmed, Cancelled, Rescheduled, NoShow]),
            (Confirmed, &[InProgress, Cancelled, Rescheduled, NoShow]),
            (Rescheduled, &[Scheduled, Confirmed, Cancelled]),
            (InProgress, &[Completed]),
            (Completed, &[]),
            (Cancelled, &[]),
            (NoShow, &[]),
        ],
        &[],
    )
}

pub fn expert_call() -> TransitionTable {
    use ExpertCallStatus::*;

    TransitionTable::assemble::<ExpertCallStatus>(
        EntityKind::ExpertCall,
        Pending,
        &[
            (Pending, &[Scheduled, Cancelled]),
            (Scheduled, &[ReminderSent, Ongoing, Cancelled, Rescheduled, NoShow]),
            (ReminderSent, &[Ongoing, Cancelled, Rescheduled, NoShow]),
            (Rescheduled, &[Scheduled, Cancelled]),
            (Ongoing, &[Completed]),
            (Completed, &[]),
            (Cancelled, &[]),
            (NoShow, &[]),
        ],
        &[(Cancelled, Rescheduled)],
    )
}

pub fn payment() -> TransitionTable {
    use PaymentStatus::*;

    TransitionTable::assemble::<PaymentStatus>(
        EntityKind::Payment,
        Pending,
        &[
            (Pending, &[Processing, Failed, Cancelled]),
            (Processing, &[Completed, Failed]),
            (Failed, &[Pending]),
            (Completed, &[Refunded, PartiallyRefunded]),
            (PartiallyRefunded, &[Refunded]),
            (Refunded, &[]),
            (Cancelled, &[]),
        ],
        &[],
    )
}

pub fn prescription() -> TransitionTable {
    use PrescriptionStatus::*;

    TransitionTable::assemble::<PrescriptionStatus>(
        EntityKind::Prescription,
        Pending,
        &[
            (Pending, &[Active, Cancelled]),
            (Active, &[Completed, Cancelled, Expired]),
            (Completed, &[]),
            (Cancelled, &[]),
            (Expired, &[]),
        ],
        &[],
    )
}

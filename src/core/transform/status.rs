//! Appointment status remapping
//!
//! The single place remote appointment statuses are mapped onto the local
//! session status enumeration. The table is closed; anything unrecognized
//! lands on `scheduled`.

use crate::domain::SessionStatus;

/// Map a remote appointment status onto the local enumeration
///
/// | remote | local |
/// |---|---|
/// | proposed, pending, booked, waitlist | scheduled |
/// | arrived, checked-in | confirmed |
/// | fulfilled | completed |
/// | cancelled, entered-in-error | cancelled |
/// | noshow | no_show |
/// | (anything else) | scheduled |
pub fn map_appointment_status(remote_status: &str) -> SessionStatus {
    match remote_status {
        "proposed" | "pending" | "booked" | "waitlist" => SessionStatus::Scheduled,
        "arrived" | "checked-in" => SessionStatus::Confirmed,
        "fulfilled" => SessionStatus::Completed,
        "cancelled" | "entered-in-error" => SessionStatus::Cancelled,
        "noshow" => SessionStatus::NoShow,
        _ => SessionStatus::Scheduled,
    }
}

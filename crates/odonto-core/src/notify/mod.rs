//! Appointment notification boundary.
//!
//! Delivery (WhatsApp or otherwise) lives outside this crate. The core
//! fires a notification after a confirmed appointment is written and moves
//! on: a failed send is logged and never rolls back the booking.

use crate::models::Appointment;

/// Outbound notification hook for confirmed appointments.
pub trait AppointmentNotifier {
    /// Attempt to notify the patient about a confirmed appointment.
    fn appointment_confirmed(&self, appointment: &Appointment) -> Result<(), String>;
}

/// Notifier that delivers nothing. Default for tests and headless use.
pub struct NullNotifier;

impl AppointmentNotifier for NullNotifier {
    fn appointment_confirmed(&self, _appointment: &Appointment) -> Result<(), String> {
        Ok(())
    }
}

/// Invoke the notifier, swallowing and logging any failure.
pub fn notify_confirmed(notifier: &dyn AppointmentNotifier, appointment: &Appointment) {
    if let Err(reason) = notifier.appointment_confirmed(appointment) {
        tracing::warn!(
            appointment = appointment.id.as_str(),
            reason = reason.as_str(),
            "appointment notification failed"
        );
    }
}

//! Appointment scheduling: per-practitioner conflict detection and
//! validated create/update.
//!
//! Overlap rule: two bookings conflict iff `existing.start < end AND
//! existing.end > start` (half-open intervals, so back-to-back bookings are
//! allowed). The check and the write run while the caller holds the single
//! database handle, so concurrent bookings for the same practitioner cannot
//! both pass the check.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{Appointment, AppointmentInput};

/// Scheduling errors.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid time range: start must be before end")]
    InvalidTimeRange,

    #[error("The practitioner already has an appointment in that time slot in another clinic")]
    PractitionerDoubleBooked,
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Scheduling validator and appointment writer.
pub struct Scheduler<'a> {
    db: &'a Database,
}

impl<'a> Scheduler<'a> {
    /// Create a new scheduler.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Whether a proposed booking conflicts with an existing one.
    ///
    /// Unassigned appointments (no practitioner) never conflict. Cancelled
    /// appointments still count: a cancelled slot blocks the calendar until
    /// it is edited or deleted.
    pub fn check_conflict(
        &self,
        practitioner_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<&str>,
    ) -> ScheduleResult<bool> {
        let Some(practitioner_id) = practitioner_id else {
            return Ok(false);
        };
        Ok(self
            .db
            .has_overlapping_appointment(practitioner_id, start, end, exclude_appointment_id)?)
    }

    /// Validate and create an appointment. No partial write on rejection.
    pub fn create_appointment(&self, input: AppointmentInput) -> ScheduleResult<Appointment> {
        self.validate_input(&input)?;

        if self.check_conflict(input.practitioner_id.as_deref(), input.start, input.end, None)? {
            tracing::debug!(
                practitioner = input.practitioner_id.as_deref().unwrap_or(""),
                "rejected double-booking"
            );
            return Err(ScheduleError::PractitionerDoubleBooked);
        }

        let appointment = Appointment::from_input(input);
        self.db.insert_appointment(&appointment)?;
        Ok(appointment)
    }

    /// Validate and update an appointment, excluding itself from the
    /// conflict check.
    pub fn update_appointment(
        &self,
        appointment_id: &str,
        input: AppointmentInput,
    ) -> ScheduleResult<Appointment> {
        let existing = self
            .db
            .get_appointment(appointment_id)?
            .ok_or_else(|| ScheduleError::NotFound(format!("Appointment {}", appointment_id)))?;

        self.validate_input(&input)?;

        if self.check_conflict(
            input.practitioner_id.as_deref(),
            input.start,
            input.end,
            Some(appointment_id),
        )? {
            return Err(ScheduleError::PractitionerDoubleBooked);
        }

        let updated = Appointment {
            id: existing.id,
            patient_id: input.patient_id,
            clinic_id: input.clinic_id,
            practitioner_id: input.practitioner_id,
            treatment_id: input.treatment_id,
            start: input.start,
            end: input.end,
            status: input.status,
            category: input.category,
            notes: input.notes,
            created_at: existing.created_at,
        };
        self.db.update_appointment(&updated)?;
        Ok(updated)
    }

    /// Referential and time-range validation, before any write.
    fn validate_input(&self, input: &AppointmentInput) -> ScheduleResult<()> {
        if input.start >= input.end {
            return Err(ScheduleError::InvalidTimeRange);
        }
        if self.db.get_patient(&input.patient_id)?.is_none() {
            return Err(ScheduleError::NotFound(format!("Patient {}", input.patient_id)));
        }
        if self.db.get_clinic(&input.clinic_id)?.is_none() {
            return Err(ScheduleError::NotFound(format!("Clinic {}", input.clinic_id)));
        }
        if let Some(treatment_id) = &input.treatment_id {
            if self.db.get_treatment(treatment_id)?.is_none() {
                return Err(ScheduleError::NotFound(format!("Treatment {}", treatment_id)));
            }
        }
        if let Some(practitioner_id) = &input.practitioner_id {
            if self.db.get_practitioner(practitioner_id)?.is_none() {
                return Err(ScheduleError::NotFound(format!(
                    "Practitioner {}",
                    practitioner_id
                )));
            }
        }
        Ok(())
    }
}

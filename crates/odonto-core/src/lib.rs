//! Odonto Core Library
//!
//! Local-first dental clinic management core: patients, appointment
//! scheduling with double-booking prevention, an event-sourced odontogram,
//! duplicate patient detection/merge, medical records, leads and material
//! stock.
//!
//! # Architecture
//!
//! ```text
//!                    API / UI layer (out of crate)
//!                              │
//!                ┌─────────────┼─────────────────┐
//!                ▼             ▼                 ▼
//!          Scheduler    OdontogramEngine   DuplicateResolver
//!        (conflict           (event +          + merge
//!         check)          state projection)
//!                │             │                 │
//!                └─────────────┼─────────────────┘
//!                              ▼
//!                      Database (SQLite)
//!                              │
//!                  confirmed appointment?
//!                              ▼
//!                   AppointmentNotifier (fire-and-forget)
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer (schema, row mapping, transactions)
//! - [`models`]: Domain types (Patient, Appointment, ToothEvent, ...)
//! - [`scheduling`]: Per-practitioner overlap validation
//! - [`odontogram`]: Append-only tooth-event log + current-state projection
//! - [`dedup`]: Duplicate patient detection and transactional merge
//! - [`notify`]: Outbound notification boundary

pub mod db;
pub mod dedup;
pub mod models;
pub mod notify;
pub mod odontogram;
pub mod scheduling;

// Re-export commonly used types
pub use db::Database;
pub use dedup::{DuplicateGroup, DuplicateResolver, MergeSummary, DEFAULT_SIMILARITY_THRESHOLD};
pub use models::{
    Appointment, AppointmentInput, AppointmentStatus, Clinic, Lead, Material, MedicalRecord,
    MovementType, Patient, Practitioner, Role, StockMovement, ToothChartEntry, ToothEvent,
    ToothEventInput, ToothEventKind, ToothState, Treatment,
};
pub use notify::{AppointmentNotifier, NullNotifier};
pub use odontogram::OdontogramEngine;
pub use scheduling::Scheduler;

use std::sync::{Arc, Mutex};

// =========================================================================
// Error Type
// =========================================================================

/// Error taxonomy surfaced to callers. Conflict-class errors may be retried
/// after the user resolves the condition; `InvalidInput`/`Forbidden` must
/// not be retried blindly.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<db::DbError> for ClinicError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(msg) => ClinicError::NotFound(msg),
            db::DbError::Constraint(msg) => ClinicError::Conflict(msg),
            other => ClinicError::Internal(other.to_string()),
        }
    }
}

impl From<scheduling::ScheduleError> for ClinicError {
    fn from(e: scheduling::ScheduleError) -> Self {
        use scheduling::ScheduleError::*;
        match e {
            Database(db_err) => db_err.into(),
            NotFound(_) => ClinicError::NotFound(e.to_string()),
            InvalidTimeRange => ClinicError::InvalidInput(e.to_string()),
            PractitionerDoubleBooked => ClinicError::Conflict(e.to_string()),
        }
    }
}

impl From<odontogram::OdontogramError> for ClinicError {
    fn from(e: odontogram::OdontogramError) -> Self {
        use odontogram::OdontogramError::*;
        match e {
            Database(db_err) => db_err.into(),
            PatientNotFound(_) | ReferenceNotFound(_) => ClinicError::NotFound(e.to_string()),
            InvalidToothNumber(_) | CrossPatientReference { .. } | InvalidEventDate(_) => {
                ClinicError::InvalidInput(e.to_string())
            }
            Forbidden { .. } => ClinicError::Forbidden(e.to_string()),
        }
    }
}

impl From<dedup::MergeError> for ClinicError {
    fn from(e: dedup::MergeError) -> Self {
        use dedup::MergeError::*;
        match e {
            Database(db_err) => db_err.into(),
            MainNotFound(_) | DuplicateNotFound(_) => ClinicError::NotFound(e.to_string()),
            GroupTooSmall | MainNotInGroup(_) => ClinicError::InvalidInput(e.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicError::Internal(format!("Lock poisoned: {}", e))
    }
}

pub type ClinicResult<T> = Result<T, ClinicError>;

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe clinic service over a single database handle.
///
/// Each operation takes the lock for its whole duration, so multi-step
/// sequences (conflict-check-then-write, event-insert-then-projection,
/// merge) are serialized against concurrent callers.
pub struct ClinicCore {
    db: Arc<Mutex<Database>>,
    notifier: Box<dyn AppointmentNotifier + Send + Sync>,
}

impl ClinicCore {
    /// Open or create a database at the given path.
    pub fn open(path: &str) -> ClinicResult<Self> {
        let db = Database::open(path)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            notifier: Box::new(NullNotifier),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> ClinicResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            notifier: Box::new(NullNotifier),
        })
    }

    /// Replace the notifier invoked on confirmed appointments.
    pub fn with_notifier(mut self, notifier: Box<dyn AppointmentNotifier + Send + Sync>) -> Self {
        self.notifier = notifier;
        self
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Create a new patient.
    pub fn create_patient(&self, patient: Patient) -> ClinicResult<Patient> {
        let db = self.db.lock()?;
        db.insert_patient(&patient)?;
        Ok(patient)
    }

    /// Update a patient.
    pub fn update_patient(&self, patient: &Patient) -> ClinicResult<()> {
        let db = self.db.lock()?;
        if !db.update_patient(patient)? {
            return Err(ClinicError::NotFound(format!("Patient {}", patient.id)));
        }
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> ClinicResult<Option<Patient>> {
        let db = self.db.lock()?;
        Ok(db.get_patient(id)?)
    }

    /// Search patients by name prefix.
    pub fn search_patients(&self, query: &str, limit: u32) -> ClinicResult<Vec<Patient>> {
        let db = self.db.lock()?;
        Ok(db.search_patients(query, limit as usize)?)
    }

    /// List all patients in creation order.
    pub fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        let db = self.db.lock()?;
        Ok(db.list_patients()?)
    }

    /// Delete a patient and everything it owns.
    pub fn delete_patient(&self, id: &str) -> ClinicResult<()> {
        let db = self.db.lock()?;
        if !db.delete_patient(id)? {
            return Err(ClinicError::NotFound(format!("Patient {}", id)));
        }
        Ok(())
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Validate and book an appointment. Confirmed bookings trigger the
    /// notifier after the write; notification failures are logged, never
    /// propagated.
    pub fn schedule_appointment(&self, input: AppointmentInput) -> ClinicResult<Appointment> {
        let appointment = {
            let db = self.db.lock()?;
            Scheduler::new(&db).create_appointment(input)?
        };
        if appointment.status == AppointmentStatus::Confirmed {
            notify::notify_confirmed(self.notifier.as_ref(), &appointment);
        }
        Ok(appointment)
    }

    /// Validate and rewrite an appointment, excluding itself from the
    /// conflict check.
    pub fn reschedule_appointment(
        &self,
        appointment_id: &str,
        input: AppointmentInput,
    ) -> ClinicResult<Appointment> {
        let appointment = {
            let db = self.db.lock()?;
            Scheduler::new(&db).update_appointment(appointment_id, input)?
        };
        if appointment.status == AppointmentStatus::Confirmed {
            notify::notify_confirmed(self.notifier.as_ref(), &appointment);
        }
        Ok(appointment)
    }

    /// Whether a proposed booking would double-book the practitioner.
    pub fn check_conflict(
        &self,
        practitioner_id: Option<&str>,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
        exclude_appointment_id: Option<&str>,
    ) -> ClinicResult<bool> {
        let db = self.db.lock()?;
        Ok(Scheduler::new(&db).check_conflict(practitioner_id, start, end, exclude_appointment_id)?)
    }

    /// Get an appointment by ID.
    pub fn get_appointment(&self, id: &str) -> ClinicResult<Option<Appointment>> {
        let db = self.db.lock()?;
        Ok(db.get_appointment(id)?)
    }

    /// A practitioner's appointments within a window.
    pub fn appointments_for_practitioner(
        &self,
        practitioner_id: &str,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> ClinicResult<Vec<Appointment>> {
        let db = self.db.lock()?;
        Ok(db.list_appointments_for_practitioner(practitioner_id, from, to)?)
    }

    /// A patient's appointments.
    pub fn appointments_for_patient(&self, patient_id: &str) -> ClinicResult<Vec<Appointment>> {
        let db = self.db.lock()?;
        Ok(db.list_appointments_for_patient(patient_id)?)
    }

    /// Delete an appointment.
    pub fn delete_appointment(&self, id: &str) -> ClinicResult<()> {
        let db = self.db.lock()?;
        if !db.delete_appointment(id)? {
            return Err(ClinicError::NotFound(format!("Appointment {}", id)));
        }
        Ok(())
    }

    // =========================================================================
    // Odontogram Operations
    // =========================================================================

    /// Record a tooth event as the given role and project the new state.
    pub fn record_tooth_event(
        &self,
        input: ToothEventInput,
        actor_role: Role,
    ) -> ClinicResult<ToothEvent> {
        let mut db = self.db.lock()?;
        Ok(OdontogramEngine::new(&mut db).record_event(input, actor_role)?)
    }

    /// Full 32-tooth chart for a patient; unmaterialized teeth read healthy.
    pub fn tooth_chart(&self, patient_id: &str) -> ClinicResult<Vec<ToothChartEntry>> {
        let db = self.db.lock()?;
        Ok(odontogram::full_chart(&db, patient_id)?)
    }

    /// Event history for a patient, optionally narrowed to one tooth.
    pub fn tooth_events(
        &self,
        patient_id: &str,
        tooth_number: Option<u8>,
    ) -> ClinicResult<Vec<ToothEvent>> {
        let db = self.db.lock()?;
        Ok(db.list_tooth_events(patient_id, tooth_number)?)
    }

    // =========================================================================
    // Duplicate Resolution Operations
    // =========================================================================

    /// Scan the patient set for duplicate groups.
    pub fn find_duplicate_groups(
        &self,
        similarity_threshold: Option<f64>,
    ) -> ClinicResult<Vec<DuplicateGroup>> {
        let db = self.db.lock()?;
        let threshold = similarity_threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        Ok(DuplicateResolver::new(&db).find_duplicate_groups(threshold)?)
    }

    /// Merge a duplicate group into its main patient, or report what would
    /// change when `dry_run` is set.
    pub fn merge_patients(
        &self,
        main_patient_id: &str,
        group_ids: &[String],
        dry_run: bool,
    ) -> ClinicResult<MergeSummary> {
        let mut db = self.db.lock()?;
        Ok(dedup::merge_patients(&mut db, main_patient_id, group_ids, dry_run)?)
    }

    // =========================================================================
    // Reference Entities
    // =========================================================================

    pub fn create_clinic(&self, clinic: Clinic) -> ClinicResult<Clinic> {
        let db = self.db.lock()?;
        db.insert_clinic(&clinic)?;
        Ok(clinic)
    }

    pub fn create_practitioner(&self, practitioner: Practitioner) -> ClinicResult<Practitioner> {
        let db = self.db.lock()?;
        db.insert_practitioner(&practitioner)?;
        Ok(practitioner)
    }

    pub fn create_treatment(&self, treatment: Treatment) -> ClinicResult<Treatment> {
        let db = self.db.lock()?;
        db.insert_treatment(&treatment)?;
        Ok(treatment)
    }

    // =========================================================================
    // Medical Records & Leads
    // =========================================================================

    pub fn create_medical_record(&self, record: MedicalRecord) -> ClinicResult<MedicalRecord> {
        let db = self.db.lock()?;
        db.insert_medical_record(&record)?;
        Ok(record)
    }

    pub fn medical_records_for_patient(
        &self,
        patient_id: &str,
    ) -> ClinicResult<Vec<MedicalRecord>> {
        let db = self.db.lock()?;
        Ok(db.list_medical_records_for_patient(patient_id)?)
    }

    pub fn create_lead(&self, lead: Lead) -> ClinicResult<Lead> {
        let db = self.db.lock()?;
        db.insert_lead(&lead)?;
        Ok(lead)
    }

    pub fn leads_for_patient(&self, patient_id: &str) -> ClinicResult<Vec<Lead>> {
        let db = self.db.lock()?;
        Ok(db.list_leads_for_patient(patient_id)?)
    }

    // =========================================================================
    // Inventory Operations
    // =========================================================================

    /// Register a material. Stock starts at zero and only moves through
    /// stock movements.
    pub fn create_material(&self, material: Material) -> ClinicResult<Material> {
        let db = self.db.lock()?;
        db.insert_material(&material)?;
        db.get_material(&material.id)?
            .ok_or_else(|| ClinicError::Internal("Material vanished after insert".into()))
    }

    pub fn update_material(&self, material: &Material) -> ClinicResult<()> {
        let db = self.db.lock()?;
        if !db.update_material(material)? {
            return Err(ClinicError::NotFound(format!("Material {}", material.id)));
        }
        Ok(())
    }

    pub fn get_material(&self, id: &str) -> ClinicResult<Option<Material>> {
        let db = self.db.lock()?;
        Ok(db.get_material(id)?)
    }

    pub fn list_materials(&self) -> ClinicResult<Vec<Material>> {
        let db = self.db.lock()?;
        Ok(db.list_materials()?)
    }

    pub fn low_stock_materials(&self) -> ClinicResult<Vec<Material>> {
        let db = self.db.lock()?;
        Ok(db.list_low_stock_materials()?)
    }

    /// Apply a stock movement; outbound moves that would go negative are
    /// rejected as a conflict, and adjustments must carry a reason.
    pub fn record_stock_movement(&self, movement: StockMovement) -> ClinicResult<StockMovement> {
        if movement.movement_type == MovementType::Adjustment && movement.reason.is_none() {
            return Err(ClinicError::InvalidInput(
                "Stock adjustments must state a reason".into(),
            ));
        }
        let db = self.db.lock()?;
        db.insert_stock_movement(&movement)?;
        Ok(movement)
    }

    pub fn stock_movements(&self, material_id: &str, limit: u32) -> ClinicResult<Vec<StockMovement>> {
        let db = self.db.lock()?;
        Ok(db.list_stock_movements(material_id, limit as usize)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingNotifier {
        sent: Arc<AtomicU32>,
        fail: bool,
    }

    impl AppointmentNotifier for CountingNotifier {
        fn appointment_confirmed(&self, _appointment: &Appointment) -> Result<(), String> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("gateway down".into())
            } else {
                Ok(())
            }
        }
    }

    fn booking_input(core: &ClinicCore, status: AppointmentStatus) -> AppointmentInput {
        let patient = core
            .create_patient(Patient::new("Ana".into(), "García".into()))
            .unwrap();
        let clinic = core.create_clinic(Clinic::new("Centro".into())).unwrap();
        AppointmentInput {
            patient_id: patient.id,
            clinic_id: clinic.id,
            practitioner_id: None,
            treatment_id: None,
            start: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 6, 2, 10, 30, 0).unwrap(),
            status,
            category: None,
            notes: None,
        }
    }

    #[test]
    fn test_confirmed_booking_notifies() {
        let sent = Arc::new(AtomicU32::new(0));
        let core = ClinicCore::open_in_memory()
            .unwrap()
            .with_notifier(Box::new(CountingNotifier {
                sent: sent.clone(),
                fail: false,
            }));

        core.schedule_appointment(booking_input(&core, AppointmentStatus::Confirmed))
            .unwrap();
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notification_failure_keeps_booking() {
        let sent = Arc::new(AtomicU32::new(0));
        let core = ClinicCore::open_in_memory()
            .unwrap()
            .with_notifier(Box::new(CountingNotifier {
                sent: sent.clone(),
                fail: true,
            }));

        let appointment = core
            .schedule_appointment(booking_input(&core, AppointmentStatus::Confirmed))
            .unwrap();
        assert_eq!(sent.load(Ordering::SeqCst), 1);
        // The booking survives the failed notification
        assert!(core.get_appointment(&appointment.id).unwrap().is_some());
    }

    #[test]
    fn test_cancelled_booking_does_not_notify() {
        let sent = Arc::new(AtomicU32::new(0));
        let core = ClinicCore::open_in_memory()
            .unwrap()
            .with_notifier(Box::new(CountingNotifier {
                sent: sent.clone(),
                fail: false,
            }));

        core.schedule_appointment(booking_input(&core, AppointmentStatus::Cancelled))
            .unwrap();
        assert_eq!(sent.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_adjustment_requires_reason() {
        let core = ClinicCore::open_in_memory().unwrap();
        let material = core
            .create_material(Material::new("Gloves".into(), "boxes".into()))
            .unwrap();

        let mut movement = StockMovement {
            id: models::new_id(),
            material_id: material.id.clone(),
            movement_type: MovementType::Adjustment,
            quantity: 2.0,
            reason: None,
            created_by: None,
            created_at: models::now_utc(),
        };
        assert!(matches!(
            core.record_stock_movement(movement.clone()).unwrap_err(),
            ClinicError::InvalidInput(_)
        ));

        movement.reason = Some("inventory recount".into());
        core.record_stock_movement(movement).unwrap();
        assert_eq!(
            core.get_material(&material.id).unwrap().unwrap().current_stock,
            2.0
        );
    }

    #[test]
    fn test_error_taxonomy_mapping() {
        let core = ClinicCore::open_in_memory().unwrap();

        let err = core.delete_patient("missing").unwrap_err();
        assert!(matches!(err, ClinicError::NotFound(_)));

        let mut input = booking_input(&core, AppointmentStatus::Confirmed);
        std::mem::swap(&mut input.start, &mut input.end);
        let err = core.schedule_appointment(input).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));

        let err = core
            .merge_patients("nobody", &["nobody".to_string()], false)
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }
}

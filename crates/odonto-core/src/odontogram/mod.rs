//! Odontogram engine: append-only tooth-event log with an atomically
//! projected current-state row per (patient, tooth).
//!
//! The projection is only ever written here, in the same transaction as the
//! event insert, so it can never diverge from the log. Reads never replay
//! history.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::db::{self, Database, DbError};
use crate::models::{
    is_valid_tooth_number, new_id, now_utc, ToothChartEntry, ToothEvent, ToothEventInput,
    ToothEventKind, ToothState, ALL_TOOTH_NUMBERS,
};
use crate::models::Role;

/// Odontogram errors.
#[derive(Error, Debug)]
pub enum OdontogramError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Patient {0} not found")]
    PatientNotFound(String),

    #[error("{0} not found")]
    ReferenceNotFound(String),

    #[error("Invalid tooth number {0}: must be 11-18, 21-28, 31-38 or 41-48")]
    InvalidToothNumber(u8),

    #[error("{entity} does not belong to this patient")]
    CrossPatientReference { entity: String },

    #[error("Role {role:?} is not allowed to record '{kind}' events; ask a dentist or admin")]
    Forbidden { role: Role, kind: &'static str },

    #[error("Invalid event date '{0}': expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS")]
    InvalidEventDate(String),
}

pub type OdontogramResult<T> = Result<T, OdontogramError>;

/// Parse an event date, normalizing bare dates to midnight UTC.
fn parse_event_date(raw: &str) -> OdontogramResult<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| OdontogramError::InvalidEventDate(raw.into()))?;
        return Ok(midnight.and_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| OdontogramError::InvalidEventDate(raw.into()))
}

/// Odontogram engine over a mutable database handle (needed for the
/// event-plus-projection transaction).
pub struct OdontogramEngine<'a> {
    db: &'a mut Database,
}

impl<'a> OdontogramEngine<'a> {
    /// Create a new engine.
    pub fn new(db: &'a mut Database) -> Self {
        Self { db }
    }

    /// Record a tooth event and project the new current state, atomically.
    ///
    /// The actor role is explicit: front-desk staff may only record
    /// healthy/watch/missing; disallowed kinds are rejected, never
    /// downgraded.
    pub fn record_event(
        &mut self,
        input: ToothEventInput,
        actor_role: Role,
    ) -> OdontogramResult<ToothEvent> {
        if !is_valid_tooth_number(input.tooth_number) {
            return Err(OdontogramError::InvalidToothNumber(input.tooth_number));
        }

        if !actor_role.may_record(input.kind) {
            return Err(OdontogramError::Forbidden {
                role: actor_role,
                kind: input.kind.as_str(),
            });
        }

        let event_date = parse_event_date(&input.event_date)?;

        self.validate_references(&input)?;

        let event = ToothEvent {
            id: new_id(),
            patient_id: input.patient_id,
            tooth_number: input.tooth_number,
            kind: input.kind,
            treatment_id: input.treatment_id,
            appointment_id: input.appointment_id,
            medical_record_id: input.medical_record_id,
            note: input.note,
            event_date,
            created_by: input.created_by,
            created_at: now_utc(),
        };

        let state = ToothState {
            patient_id: event.patient_id.clone(),
            tooth_number: event.tooth_number,
            current_status: event.kind,
            last_event_id: event.id.clone(),
            updated_at: event.created_at,
        };

        // Event insert and state upsert commit together or not at all
        let tx = self.db.transaction()?;
        db::insert_tooth_event(&tx, &event)?;
        db::upsert_tooth_state(&tx, &state)?;
        tx.commit().map_err(DbError::from)?;

        Ok(event)
    }

    /// Referential validation: the patient must exist, and every supplied
    /// link must exist and belong to that same patient.
    fn validate_references(&self, input: &ToothEventInput) -> OdontogramResult<()> {
        if self.db.get_patient(&input.patient_id)?.is_none() {
            return Err(OdontogramError::PatientNotFound(input.patient_id.clone()));
        }

        if let Some(treatment_id) = &input.treatment_id {
            if self.db.get_treatment(treatment_id)?.is_none() {
                return Err(OdontogramError::ReferenceNotFound(format!(
                    "Treatment {}",
                    treatment_id
                )));
            }
        }

        if let Some(appointment_id) = &input.appointment_id {
            let appointment = self.db.get_appointment(appointment_id)?.ok_or_else(|| {
                OdontogramError::ReferenceNotFound(format!("Appointment {}", appointment_id))
            })?;
            if appointment.patient_id != input.patient_id {
                return Err(OdontogramError::CrossPatientReference {
                    entity: format!("Appointment {}", appointment_id),
                });
            }
        }

        if let Some(record_id) = &input.medical_record_id {
            let record = self.db.get_medical_record(record_id)?.ok_or_else(|| {
                OdontogramError::ReferenceNotFound(format!("Medical record {}", record_id))
            })?;
            if record.patient_id != input.patient_id {
                return Err(OdontogramError::CrossPatientReference {
                    entity: format!("Medical record {}", record_id),
                });
            }
        }

        Ok(())
    }
}

/// Full 32-tooth chart for a patient.
///
/// Teeth with no recorded events read as healthy; they are never
/// materialized until touched.
pub fn full_chart(db: &Database, patient_id: &str) -> OdontogramResult<Vec<ToothChartEntry>> {
    if db.get_patient(patient_id)?.is_none() {
        return Err(OdontogramError::PatientNotFound(patient_id.into()));
    }

    let states = db.list_tooth_states(patient_id)?;

    let chart = ALL_TOOTH_NUMBERS
        .iter()
        .map(|&tooth_number| {
            match states.iter().find(|s| s.tooth_number == tooth_number) {
                Some(state) => ToothChartEntry {
                    tooth_number,
                    current_status: state.current_status,
                    last_event_id: Some(state.last_event_id.clone()),
                    updated_at: Some(state.updated_at),
                },
                None => ToothChartEntry {
                    tooth_number,
                    current_status: ToothEventKind::Healthy,
                    last_event_id: None,
                    updated_at: None,
                },
            }
        })
        .collect();

    Ok(chart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;

    fn setup() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Ana".into(), "García".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn event_input(patient_id: &str, tooth: u8, kind: ToothEventKind) -> ToothEventInput {
        ToothEventInput {
            patient_id: patient_id.into(),
            tooth_number: tooth,
            kind,
            treatment_id: None,
            appointment_id: None,
            medical_record_id: None,
            note: None,
            event_date: "2025-06-02".into(),
            created_by: None,
        }
    }

    #[test]
    fn test_event_projects_state() {
        let (mut db, patient) = setup();
        let mut engine = OdontogramEngine::new(&mut db);

        let event = engine
            .record_event(event_input(&patient.id, 18, ToothEventKind::Caries), Role::Dentist)
            .unwrap();

        let state = db.get_tooth_state(&patient.id, 18).unwrap().unwrap();
        assert_eq!(state.current_status, ToothEventKind::Caries);
        assert_eq!(state.last_event_id, event.id);
    }

    #[test]
    fn test_second_event_updates_state_keeps_log() {
        let (mut db, patient) = setup();

        let first = OdontogramEngine::new(&mut db)
            .record_event(event_input(&patient.id, 18, ToothEventKind::Caries), Role::Dentist)
            .unwrap();
        OdontogramEngine::new(&mut db)
            .record_event(event_input(&patient.id, 18, ToothEventKind::Filled), Role::Dentist)
            .unwrap();

        let state = db.get_tooth_state(&patient.id, 18).unwrap().unwrap();
        assert_eq!(state.current_status, ToothEventKind::Filled);

        // The first event is unchanged in the log
        let logged = db.get_tooth_event(&first.id).unwrap().unwrap();
        assert_eq!(logged.kind, ToothEventKind::Caries);
        assert_eq!(db.list_tooth_events(&patient.id, Some(18)).unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_tooth_rejected() {
        let (mut db, patient) = setup();
        let mut engine = OdontogramEngine::new(&mut db);

        let result =
            engine.record_event(event_input(&patient.id, 19, ToothEventKind::Caries), Role::Dentist);
        assert!(matches!(result, Err(OdontogramError::InvalidToothNumber(19))));
    }

    #[test]
    fn test_front_desk_forbidden_kinds() {
        let (mut db, patient) = setup();
        let mut engine = OdontogramEngine::new(&mut db);

        let result = engine.record_event(
            event_input(&patient.id, 18, ToothEventKind::Extraction),
            Role::Secretary,
        );
        assert!(matches!(result, Err(OdontogramError::Forbidden { .. })));

        // Nothing was written
        assert!(db.get_tooth_state(&patient.id, 18).unwrap().is_none());
        assert!(db.list_tooth_events(&patient.id, None).unwrap().is_empty());
    }

    #[test]
    fn test_front_desk_allowed_kinds() {
        let (mut db, patient) = setup();
        let mut engine = OdontogramEngine::new(&mut db);

        engine
            .record_event(event_input(&patient.id, 11, ToothEventKind::Watch), Role::Secretary)
            .unwrap();
        let state = db.get_tooth_state(&patient.id, 11).unwrap().unwrap();
        assert_eq!(state.current_status, ToothEventKind::Watch);
    }

    #[test]
    fn test_clinical_role_can_record_extraction() {
        let (mut db, patient) = setup();
        let mut engine = OdontogramEngine::new(&mut db);

        engine
            .record_event(
                event_input(&patient.id, 18, ToothEventKind::Extraction),
                Role::Dentist,
            )
            .unwrap();
    }

    #[test]
    fn test_unknown_patient() {
        let (mut db, _) = setup();
        let mut engine = OdontogramEngine::new(&mut db);

        let result = engine.record_event(
            event_input("missing", 18, ToothEventKind::Caries),
            Role::Dentist,
        );
        assert!(matches!(result, Err(OdontogramError::PatientNotFound(_))));
    }

    #[test]
    fn test_cross_patient_reference_rejected() {
        let (mut db, patient) = setup();
        let other = Patient::new("Luis".into(), "Pérez".into());
        db.insert_patient(&other).unwrap();

        // Medical record belonging to the other patient
        let record = crate::models::MedicalRecord::new(other.id.clone(), "2025-06-01".into());
        db.insert_medical_record(&record).unwrap();

        let mut input = event_input(&patient.id, 18, ToothEventKind::Caries);
        input.medical_record_id = Some(record.id.clone());

        let result = OdontogramEngine::new(&mut db).record_event(input, Role::Dentist);
        assert!(matches!(
            result,
            Err(OdontogramError::CrossPatientReference { .. })
        ));
    }

    #[test]
    fn test_bare_date_normalizes_to_midnight() {
        let (mut db, patient) = setup();

        let event = OdontogramEngine::new(&mut db)
            .record_event(event_input(&patient.id, 18, ToothEventKind::Caries), Role::Dentist)
            .unwrap();
        assert_eq!(
            event.event_date.format("%H:%M:%S").to_string(),
            "00:00:00"
        );

        // Full timestamps pass through unchanged
        let mut timed = event_input(&patient.id, 17, ToothEventKind::Caries);
        timed.event_date = "2025-06-02 14:30:00".into();
        let event = OdontogramEngine::new(&mut db)
            .record_event(timed, Role::Dentist)
            .unwrap();
        assert_eq!(
            event.event_date.format("%H:%M:%S").to_string(),
            "14:30:00"
        );
    }

    #[test]
    fn test_bad_date_rejected() {
        let (mut db, patient) = setup();
        let mut input = event_input(&patient.id, 18, ToothEventKind::Caries);
        input.event_date = "junio 2".into();

        let result = OdontogramEngine::new(&mut db).record_event(input, Role::Dentist);
        assert!(matches!(result, Err(OdontogramError::InvalidEventDate(_))));
    }

    #[test]
    fn test_full_chart_defaults_healthy() {
        let (mut db, patient) = setup();

        OdontogramEngine::new(&mut db)
            .record_event(event_input(&patient.id, 18, ToothEventKind::Caries), Role::Dentist)
            .unwrap();

        let chart = full_chart(&db, &patient.id).unwrap();
        assert_eq!(chart.len(), 32);

        let touched = chart.iter().find(|t| t.tooth_number == 18).unwrap();
        assert_eq!(touched.current_status, ToothEventKind::Caries);
        assert!(touched.last_event_id.is_some());

        let untouched = chart.iter().find(|t| t.tooth_number == 21).unwrap();
        assert_eq!(untouched.current_status, ToothEventKind::Healthy);
        assert!(untouched.last_event_id.is_none());
    }
}

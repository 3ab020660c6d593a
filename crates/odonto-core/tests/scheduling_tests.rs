//! End-to-end scheduling tests through the public service API.

use chrono::{DateTime, TimeZone, Utc};
use odonto_core::{
    Appointment, AppointmentInput, AppointmentStatus, Clinic, ClinicCore, ClinicError, Patient,
    Practitioner, Treatment,
};

struct Fixture {
    core: ClinicCore,
    patient: Patient,
    clinic_a: Clinic,
    clinic_b: Clinic,
    practitioner: Practitioner,
}

fn setup() -> Fixture {
    let core = ClinicCore::open_in_memory().unwrap();
    let patient = core
        .create_patient(Patient::new("Ana".into(), "García".into()))
        .unwrap();
    let clinic_a = core.create_clinic(Clinic::new("Centro".into())).unwrap();
    let clinic_b = core.create_clinic(Clinic::new("Norte".into())).unwrap();
    let practitioner = core
        .create_practitioner(Practitioner::new("Dr. Ruiz".into()))
        .unwrap();
    Fixture {
        core,
        patient,
        clinic_a,
        clinic_b,
        practitioner,
    }
}

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, min, 0).unwrap()
}

fn input(f: &Fixture, clinic_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> AppointmentInput {
    AppointmentInput {
        patient_id: f.patient.id.clone(),
        clinic_id: clinic_id.into(),
        practitioner_id: Some(f.practitioner.id.clone()),
        treatment_id: None,
        start,
        end,
        status: AppointmentStatus::Confirmed,
        category: None,
        notes: None,
    }
}

#[test]
fn test_cross_clinic_double_booking() {
    let f = setup();

    // Practitioner booked 10:00-10:30 at clinic A
    f.core
        .schedule_appointment(input(&f, &f.clinic_a.id, at(10, 0), at(10, 30)))
        .unwrap();

    // 10:15-10:45 at clinic B overlaps and is rejected with a conflict
    let err = f
        .core
        .schedule_appointment(input(&f, &f.clinic_b.id, at(10, 15), at(10, 45)))
        .unwrap_err();
    match err {
        ClinicError::Conflict(msg) => {
            assert!(msg.contains("another clinic"), "message: {}", msg)
        }
        other => panic!("expected Conflict, got {:?}", other),
    }

    // Back-to-back 10:30-11:00 is accepted
    f.core
        .schedule_appointment(input(&f, &f.clinic_b.id, at(10, 30), at(11, 0)))
        .unwrap();
}

#[test]
fn test_conflict_check_is_advisory_and_half_open() {
    let f = setup();

    f.core
        .schedule_appointment(input(&f, &f.clinic_a.id, at(10, 0), at(10, 30)))
        .unwrap();

    let practitioner = Some(f.practitioner.id.as_str());
    assert!(f
        .core
        .check_conflict(practitioner, at(10, 15), at(10, 45), None)
        .unwrap());
    // Touching endpoints do not overlap
    assert!(!f
        .core
        .check_conflict(practitioner, at(10, 30), at(11, 0), None)
        .unwrap());
    assert!(!f
        .core
        .check_conflict(practitioner, at(9, 30), at(10, 0), None)
        .unwrap());
    // No practitioner, no conflict
    assert!(!f
        .core
        .check_conflict(None, at(10, 0), at(10, 30), None)
        .unwrap());
}

#[test]
fn test_reschedule_into_own_window() {
    let f = setup();

    let appointment = f
        .core
        .schedule_appointment(input(&f, &f.clinic_a.id, at(10, 0), at(10, 30)))
        .unwrap();

    let moved = f
        .core
        .reschedule_appointment(
            &appointment.id,
            input(&f, &f.clinic_a.id, at(10, 15), at(10, 45)),
        )
        .unwrap();
    assert_eq!(moved.id, appointment.id);
    assert_eq!(moved.start, at(10, 15));

    // But rescheduling onto a colleague-blocking second slot still conflicts
    f.core
        .schedule_appointment(input(&f, &f.clinic_b.id, at(12, 0), at(12, 30)))
        .unwrap();
    let err = f
        .core
        .reschedule_appointment(
            &appointment.id,
            input(&f, &f.clinic_a.id, at(12, 0), at(12, 30)),
        )
        .unwrap_err();
    assert!(matches!(err, ClinicError::Conflict(_)));
}

#[test]
fn test_validation_failures_leave_no_writes() {
    let f = setup();

    let mut inverted = input(&f, &f.clinic_a.id, at(11, 0), at(10, 0));
    inverted.notes = Some("should never persist".into());
    assert!(matches!(
        f.core.schedule_appointment(inverted).unwrap_err(),
        ClinicError::InvalidInput(_)
    ));

    let mut unknown_treatment = input(&f, &f.clinic_a.id, at(10, 0), at(10, 30));
    unknown_treatment.treatment_id = Some("missing".into());
    assert!(matches!(
        f.core.schedule_appointment(unknown_treatment).unwrap_err(),
        ClinicError::NotFound(_)
    ));

    assert!(f
        .core
        .appointments_for_patient(&f.patient.id)
        .unwrap()
        .is_empty());
}

#[test]
fn test_treatment_reference_accepted() {
    let f = setup();
    let treatment = f
        .core
        .create_treatment(Treatment::new("Cleaning".into()))
        .unwrap();

    let mut booked = input(&f, &f.clinic_a.id, at(10, 0), at(10, 30));
    booked.treatment_id = Some(treatment.id.clone());
    let appointment: Appointment = f.core.schedule_appointment(booked).unwrap();
    assert_eq!(appointment.treatment_id, Some(treatment.id));
}

#[test]
fn test_practitioner_window_listing() {
    let f = setup();

    f.core
        .schedule_appointment(input(&f, &f.clinic_a.id, at(9, 0), at(9, 30)))
        .unwrap();
    f.core
        .schedule_appointment(input(&f, &f.clinic_a.id, at(14, 0), at(14, 30)))
        .unwrap();

    let morning = f
        .core
        .appointments_for_practitioner(&f.practitioner.id, at(8, 0), at(12, 0))
        .unwrap();
    assert_eq!(morning.len(), 1);
    assert_eq!(morning[0].start, at(9, 0));

    let whole_day = f
        .core
        .appointments_for_practitioner(&f.practitioner.id, at(0, 0), at(23, 59))
        .unwrap();
    assert_eq!(whole_day.len(), 2);
}

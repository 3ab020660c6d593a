//! Appointment database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_instant, instant_from_sql, Database, DbResult};
use crate::models::{Appointment, AppointmentCategory, AppointmentStatus};

const APPOINTMENT_COLUMNS: &str = "id, patient_id, clinic_id, practitioner_id, treatment_id, \
                                   datetime_start, datetime_end, status, category, notes, \
                                   created_at";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let status: String = row.get(7)?;
    let category: Option<String> = row.get(8)?;
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        clinic_id: row.get(2)?,
        practitioner_id: row.get(3)?,
        treatment_id: row.get(4)?,
        start: instant_from_sql(5, row.get(5)?)?,
        end: instant_from_sql(6, row.get(6)?)?,
        status: AppointmentStatus::parse(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                7,
                rusqlite::types::Type::Text,
                format!("unknown appointment status: {}", status).into(),
            )
        })?,
        category: match category {
            Some(c) => Some(AppointmentCategory::parse(&c).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Text,
                    format!("unknown appointment category: {}", c).into(),
                )
            })?),
            None => None,
        },
        notes: row.get(9)?,
        created_at: instant_from_sql(10, row.get(10)?)?,
    })
}

impl Database {
    /// Insert a new appointment.
    pub fn insert_appointment(&self, appointment: &Appointment) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO appointments (
                id, patient_id, clinic_id, practitioner_id, treatment_id,
                datetime_start, datetime_end, status, category, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                appointment.id,
                appointment.patient_id,
                appointment.clinic_id,
                appointment.practitioner_id,
                appointment.treatment_id,
                format_instant(appointment.start),
                format_instant(appointment.end),
                appointment.status.as_str(),
                appointment.category.map(|c| c.as_str()),
                appointment.notes,
                format_instant(appointment.created_at),
            ],
        )?;
        Ok(())
    }

    /// Update an existing appointment in place.
    pub fn update_appointment(&self, appointment: &Appointment) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE appointments SET
                patient_id = ?2,
                clinic_id = ?3,
                practitioner_id = ?4,
                treatment_id = ?5,
                datetime_start = ?6,
                datetime_end = ?7,
                status = ?8,
                category = ?9,
                notes = ?10
            WHERE id = ?1
            "#,
            params![
                appointment.id,
                appointment.patient_id,
                appointment.clinic_id,
                appointment.practitioner_id,
                appointment.treatment_id,
                format_instant(appointment.start),
                format_instant(appointment.end),
                appointment.status.as_str(),
                appointment.category.map(|c| c.as_str()),
                appointment.notes,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an appointment by ID.
    pub fn get_appointment(&self, id: &str) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM appointments WHERE id = ?", APPOINTMENT_COLUMNS),
                [id],
                appointment_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Whether any other appointment of this practitioner overlaps the
    /// half-open window `[start, end)`.
    ///
    /// Status is deliberately not filtered: a cancelled slot still blocks
    /// the practitioner's calendar until it is edited or deleted.
    pub fn has_overlapping_appointment(
        &self,
        practitioner_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE practitioner_id = ?1
              AND datetime_start < ?2
              AND datetime_end > ?3
              AND (?4 IS NULL OR id != ?4)
            "#,
            params![
                practitioner_id,
                format_instant(end),
                format_instant(start),
                exclude_id,
            ],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Appointments for a practitioner starting inside `[from, to]`.
    pub fn list_appointments_for_practitioner(
        &self,
        practitioner_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM appointments
             WHERE practitioner_id = ?1 AND datetime_start >= ?2 AND datetime_start <= ?3
             ORDER BY datetime_start",
            APPOINTMENT_COLUMNS
        ))?;

        let rows = stmt.query_map(
            params![practitioner_id, format_instant(from), format_instant(to)],
            appointment_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All appointments of a patient, earliest first.
    pub fn list_appointments_for_patient(&self, patient_id: &str) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM appointments WHERE patient_id = ? ORDER BY datetime_start",
            APPOINTMENT_COLUMNS
        ))?;

        let rows = stmt.query_map([patient_id], appointment_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Hard delete an appointment.
    pub fn delete_appointment(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM appointments WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

/// Re-point every appointment of `from_patient` to `to_patient`.
///
/// Takes a raw connection so merge can run it inside its transaction.
pub fn repoint_appointments(
    conn: &Connection,
    from_patient: &str,
    to_patient: &str,
) -> DbResult<usize> {
    let rows = conn.execute(
        "UPDATE appointments SET patient_id = ?2 WHERE patient_id = ?1",
        params![from_patient, to_patient],
    )?;
    Ok(rows)
}

//! Patient database operations.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_instant, instant_from_sql, Database, DbResult};
use crate::models::{Patient, PatientWithCounts};

const PATIENT_COLUMNS: &str = "id, first_name, last_name, national_id, phone, email, \
                               address, birth_date, origin, notes, created_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        national_id: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        address: row.get(6)?,
        birth_date: row.get(7)?,
        origin: row.get(8)?,
        notes: row.get(9)?,
        created_at: instant_from_sql(10, row.get(10)?)?,
    })
}

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, first_name, last_name, national_id, phone, email,
                address, birth_date, origin, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name,
                patient.national_id,
                patient.phone,
                patient.email,
                patient.address,
                patient.birth_date,
                patient.origin,
                patient.notes,
                format_instant(patient.created_at),
            ],
        )?;
        Ok(())
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        update_patient_row(&self.conn, patient)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        get_patient_row(&self.conn, id)
    }

    /// Search patients by name (prefix match on first or last name).
    pub fn search_patients(&self, query: &str, limit: usize) -> DbResult<Vec<Patient>> {
        let pattern = format!("{}%", query);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients
             WHERE first_name LIKE ?1 OR last_name LIKE ?1
             ORDER BY last_name, first_name
             LIMIT ?2",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![pattern, limit as i64], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// List all patients in creation order.
    ///
    /// Duplicate detection iterates this list; the stable ordering is what
    /// makes single-link grouping deterministic.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY created_at, id",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Relation counts used to present duplicate groups.
    pub fn patient_with_counts(&self, patient: Patient) -> DbResult<PatientWithCounts> {
        let appointments_count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM appointments WHERE patient_id = ?",
            [&patient.id],
            |row| row.get(0),
        )?;
        let medical_records_count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM medical_records WHERE patient_id = ?",
            [&patient.id],
            |row| row.get(0),
        )?;
        Ok(PatientWithCounts {
            patient,
            appointments_count,
            medical_records_count,
        })
    }

    /// Delete a patient.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        delete_patient_row(&self.conn, id)
    }
}

/// Row-level operations over a raw connection, so the merge engine can run
/// them inside its transaction.
pub fn get_patient_row(conn: &Connection, id: &str) -> DbResult<Option<Patient>> {
    conn.query_row(
        &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
        [id],
        patient_from_row,
    )
    .optional()
    .map_err(Into::into)
}

pub fn update_patient_row(conn: &Connection, patient: &Patient) -> DbResult<bool> {
    let rows_affected = conn.execute(
        r#"
        UPDATE patients SET
            first_name = ?2,
            last_name = ?3,
            national_id = ?4,
            phone = ?5,
            email = ?6,
            address = ?7,
            birth_date = ?8,
            origin = ?9,
            notes = ?10
        WHERE id = ?1
        "#,
        params![
            patient.id,
            patient.first_name,
            patient.last_name,
            patient.national_id,
            patient.phone,
            patient.email,
            patient.address,
            patient.birth_date,
            patient.origin,
            patient.notes,
        ],
    )?;
    Ok(rows_affected > 0)
}

pub fn delete_patient_row(conn: &Connection, id: &str) -> DbResult<bool> {
    let rows_affected = conn.execute("DELETE FROM patients WHERE id = ?", [id])?;
    Ok(rows_affected > 0)
}

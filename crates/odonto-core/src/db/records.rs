//! Reference entities, medical records, and leads.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_instant, instant_from_sql, Database, DbResult};
use crate::models::{Clinic, Lead, MedicalRecord, Practitioner, Treatment};

impl Database {
    // =========================================================================
    // Clinics
    // =========================================================================

    pub fn insert_clinic(&self, clinic: &Clinic) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO clinics (id, name, address, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                clinic.id,
                clinic.name,
                clinic.address,
                format_instant(clinic.created_at)
            ],
        )?;
        Ok(())
    }

    pub fn get_clinic(&self, id: &str) -> DbResult<Option<Clinic>> {
        self.conn
            .query_row(
                "SELECT id, name, address, created_at FROM clinics WHERE id = ?",
                [id],
                |row| {
                    Ok(Clinic {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        address: row.get(2)?,
                        created_at: instant_from_sql(3, row.get(3)?)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    // =========================================================================
    // Practitioners
    // =========================================================================

    pub fn insert_practitioner(&self, practitioner: &Practitioner) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO practitioners (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                practitioner.id,
                practitioner.name,
                practitioner.email,
                format_instant(practitioner.created_at)
            ],
        )?;
        Ok(())
    }

    pub fn get_practitioner(&self, id: &str) -> DbResult<Option<Practitioner>> {
        self.conn
            .query_row(
                "SELECT id, name, email, created_at FROM practitioners WHERE id = ?",
                [id],
                |row| {
                    Ok(Practitioner {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        created_at: instant_from_sql(3, row.get(3)?)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    // =========================================================================
    // Treatments
    // =========================================================================

    pub fn insert_treatment(&self, treatment: &Treatment) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO treatments (id, name, duration_minutes, price, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                treatment.id,
                treatment.name,
                treatment.duration_minutes,
                treatment.price,
                format_instant(treatment.created_at)
            ],
        )?;
        Ok(())
    }

    pub fn get_treatment(&self, id: &str) -> DbResult<Option<Treatment>> {
        self.conn
            .query_row(
                "SELECT id, name, duration_minutes, price, created_at FROM treatments WHERE id = ?",
                [id],
                |row| {
                    Ok(Treatment {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        duration_minutes: row.get(2)?,
                        price: row.get(3)?,
                        created_at: instant_from_sql(4, row.get(4)?)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    // =========================================================================
    // Medical records
    // =========================================================================

    pub fn insert_medical_record(&self, record: &MedicalRecord) -> DbResult<()> {
        let attachments_json = serde_json::to_string(&record.attachments)?;
        self.conn.execute(
            r#"
            INSERT INTO medical_records (
                id, patient_id, appointment_id, treatment_id, practitioner_id,
                record_date, notes, attachments, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.id,
                record.patient_id,
                record.appointment_id,
                record.treatment_id,
                record.practitioner_id,
                record.record_date,
                record.notes,
                attachments_json,
                format_instant(record.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_medical_record(&self, id: &str) -> DbResult<Option<MedicalRecord>> {
        self.conn
            .query_row(
                "SELECT id, patient_id, appointment_id, treatment_id, practitioner_id,
                        record_date, notes, attachments, created_at
                 FROM medical_records WHERE id = ?",
                [id],
                medical_record_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_medical_records_for_patient(
        &self,
        patient_id: &str,
    ) -> DbResult<Vec<MedicalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, patient_id, appointment_id, treatment_id, practitioner_id,
                    record_date, notes, attachments, created_at
             FROM medical_records WHERE patient_id = ? ORDER BY record_date DESC",
        )?;

        let rows = stmt.query_map([patient_id], medical_record_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // =========================================================================
    // Leads
    // =========================================================================

    pub fn insert_lead(&self, lead: &Lead) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO leads (
                id, first_name, last_name, phone, email, origin, message,
                status, patient_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                lead.id,
                lead.first_name,
                lead.last_name,
                lead.phone,
                lead.email,
                lead.origin,
                lead.message,
                lead.status,
                lead.patient_id,
                format_instant(lead.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn list_leads_for_patient(&self, patient_id: &str) -> DbResult<Vec<Lead>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, first_name, last_name, phone, email, origin, message,
                    status, patient_id, created_at
             FROM leads WHERE patient_id = ? ORDER BY created_at",
        )?;

        let rows = stmt.query_map([patient_id], lead_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn medical_record_from_row(row: &Row<'_>) -> rusqlite::Result<MedicalRecord> {
    let attachments_json: String = row.get(7)?;
    let attachments: Vec<String> = serde_json::from_str(&attachments_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(MedicalRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        appointment_id: row.get(2)?,
        treatment_id: row.get(3)?,
        practitioner_id: row.get(4)?,
        record_date: row.get(5)?,
        notes: row.get(6)?,
        attachments,
        created_at: instant_from_sql(8, row.get(8)?)?,
    })
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        origin: row.get(5)?,
        message: row.get(6)?,
        status: row.get(7)?,
        patient_id: row.get(8)?,
        created_at: instant_from_sql(9, row.get(9)?)?,
    })
}

/// Re-point every medical record of `from_patient` to `to_patient`.
pub fn repoint_medical_records(
    conn: &Connection,
    from_patient: &str,
    to_patient: &str,
) -> DbResult<usize> {
    let rows = conn.execute(
        "UPDATE medical_records SET patient_id = ?2 WHERE patient_id = ?1",
        params![from_patient, to_patient],
    )?;
    Ok(rows)
}

/// Re-point every lead of `from_patient` to `to_patient`.
pub fn repoint_leads(conn: &Connection, from_patient: &str, to_patient: &str) -> DbResult<usize> {
    let rows = conn.execute(
        "UPDATE leads SET patient_id = ?2 WHERE patient_id = ?1",
        params![from_patient, to_patient],
    )?;
    Ok(rows)
}

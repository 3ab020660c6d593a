//! Odontogram database operations: event log inserts and state projection.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_instant, instant_from_sql, Database, DbResult};
use crate::models::{ToothEvent, ToothEventKind, ToothState};

const EVENT_COLUMNS: &str = "id, patient_id, tooth_number, kind, treatment_id, appointment_id, \
                             medical_record_id, note, event_date, created_by, created_at";

fn tooth_event_from_row(row: &Row<'_>) -> rusqlite::Result<ToothEvent> {
    let kind: String = row.get(3)?;
    Ok(ToothEvent {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        tooth_number: row.get(2)?,
        kind: parse_kind(3, &kind)?,
        treatment_id: row.get(4)?,
        appointment_id: row.get(5)?,
        medical_record_id: row.get(6)?,
        note: row.get(7)?,
        event_date: instant_from_sql(8, row.get(8)?)?,
        created_by: row.get(9)?,
        created_at: instant_from_sql(10, row.get(10)?)?,
    })
}

fn tooth_state_from_row(row: &Row<'_>) -> rusqlite::Result<ToothState> {
    let status: String = row.get(2)?;
    Ok(ToothState {
        patient_id: row.get(0)?,
        tooth_number: row.get(1)?,
        current_status: parse_kind(2, &status)?,
        last_event_id: row.get(3)?,
        updated_at: instant_from_sql(4, row.get(4)?)?,
    })
}

fn parse_kind(idx: usize, s: &str) -> rusqlite::Result<ToothEventKind> {
    ToothEventKind::parse(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown tooth event kind: {}", s).into(),
        )
    })
}

/// Insert a tooth event. Runs on a raw connection so the engine can pair
/// it with the state upsert inside one transaction.
pub fn insert_tooth_event(conn: &Connection, event: &ToothEvent) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO tooth_events (
            id, patient_id, tooth_number, kind, treatment_id, appointment_id,
            medical_record_id, note, event_date, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            event.id,
            event.patient_id,
            event.tooth_number,
            event.kind.as_str(),
            event.treatment_id,
            event.appointment_id,
            event.medical_record_id,
            event.note,
            format_instant(event.event_date),
            event.created_by,
            format_instant(event.created_at),
        ],
    )?;
    Ok(())
}

/// Upsert the derived state row for (patient, tooth).
///
/// The (patient, tooth) primary key makes concurrent creators collapse into
/// an update rather than a duplicate-key failure.
pub fn upsert_tooth_state(conn: &Connection, state: &ToothState) -> DbResult<()> {
    conn.execute(
        r#"
        INSERT INTO tooth_states (patient_id, tooth_number, current_status, last_event_id, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(patient_id, tooth_number) DO UPDATE SET
            current_status = excluded.current_status,
            last_event_id = excluded.last_event_id,
            updated_at = excluded.updated_at
        "#,
        params![
            state.patient_id,
            state.tooth_number,
            state.current_status.as_str(),
            state.last_event_id,
            format_instant(state.updated_at),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Current state of one tooth, if materialized.
    pub fn get_tooth_state(&self, patient_id: &str, tooth_number: u8) -> DbResult<Option<ToothState>> {
        self.conn
            .query_row(
                "SELECT patient_id, tooth_number, current_status, last_event_id, updated_at
                 FROM tooth_states WHERE patient_id = ? AND tooth_number = ?",
                params![patient_id, tooth_number],
                tooth_state_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All materialized tooth states of a patient.
    pub fn list_tooth_states(&self, patient_id: &str) -> DbResult<Vec<ToothState>> {
        let mut stmt = self.conn.prepare(
            "SELECT patient_id, tooth_number, current_status, last_event_id, updated_at
             FROM tooth_states WHERE patient_id = ? ORDER BY tooth_number",
        )?;

        let rows = stmt.query_map([patient_id], tooth_state_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Get a tooth event by ID.
    pub fn get_tooth_event(&self, id: &str) -> DbResult<Option<ToothEvent>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM tooth_events WHERE id = ?", EVENT_COLUMNS),
                [id],
                tooth_event_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Event history for a patient, optionally narrowed to one tooth.
    /// Newest first.
    pub fn list_tooth_events(
        &self,
        patient_id: &str,
        tooth_number: Option<u8>,
    ) -> DbResult<Vec<ToothEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tooth_events
             WHERE patient_id = ?1 AND (?2 IS NULL OR tooth_number = ?2)
             ORDER BY event_date DESC, created_at DESC",
            EVENT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![patient_id, tooth_number], tooth_event_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{now_utc, Patient};

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("Ana".into(), "García".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn make_event(patient_id: &str, tooth: u8, kind: ToothEventKind) -> ToothEvent {
        ToothEvent {
            id: crate::models::new_id(),
            patient_id: patient_id.into(),
            tooth_number: tooth,
            kind,
            treatment_id: None,
            appointment_id: None,
            medical_record_id: None,
            note: None,
            event_date: now_utc(),
            created_by: None,
            created_at: now_utc(),
        }
    }

    #[test]
    fn test_insert_event_and_upsert_state() {
        let (db, patient) = setup_db();

        let event = make_event(&patient.id, 18, ToothEventKind::Caries);
        insert_tooth_event(db.conn(), &event).unwrap();
        upsert_tooth_state(
            db.conn(),
            &ToothState {
                patient_id: patient.id.clone(),
                tooth_number: 18,
                current_status: event.kind,
                last_event_id: event.id.clone(),
                updated_at: now_utc(),
            },
        )
        .unwrap();

        let state = db.get_tooth_state(&patient.id, 18).unwrap().unwrap();
        assert_eq!(state.current_status, ToothEventKind::Caries);
        assert_eq!(state.last_event_id, event.id);

        // A second event on the same tooth updates, not duplicates
        let event2 = make_event(&patient.id, 18, ToothEventKind::Filled);
        insert_tooth_event(db.conn(), &event2).unwrap();
        upsert_tooth_state(
            db.conn(),
            &ToothState {
                patient_id: patient.id.clone(),
                tooth_number: 18,
                current_status: event2.kind,
                last_event_id: event2.id.clone(),
                updated_at: now_utc(),
            },
        )
        .unwrap();

        let states = db.list_tooth_states(&patient.id).unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].current_status, ToothEventKind::Filled);

        // Both events remain in the log
        let events = db.list_tooth_events(&patient.id, Some(18)).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_list_events_filter_by_tooth() {
        let (db, patient) = setup_db();

        insert_tooth_event(db.conn(), &make_event(&patient.id, 11, ToothEventKind::Watch)).unwrap();
        insert_tooth_event(db.conn(), &make_event(&patient.id, 48, ToothEventKind::Caries))
            .unwrap();

        assert_eq!(db.list_tooth_events(&patient.id, None).unwrap().len(), 2);
        assert_eq!(db.list_tooth_events(&patient.id, Some(11)).unwrap().len(), 1);
        assert_eq!(db.list_tooth_events(&patient.id, Some(21)).unwrap().len(), 0);
    }
}

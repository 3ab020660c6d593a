//! Database layer for odonto-core.

mod schema;
mod patients;
mod appointments;
mod odontogram;
mod records;
mod materials;

pub use schema::*;
#[allow(unused_imports)]
pub use patients::*;
#[allow(unused_imports)]
pub use appointments::*;
#[allow(unused_imports)]
pub use odontogram::*;
#[allow(unused_imports)]
pub use records::*;
#[allow(unused_imports)]
pub use materials::*;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Timestamp format used for every instant column.
///
/// Uniform fixed-width text so SQL range comparisons order correctly.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC instant for storage.
pub fn format_instant(ts: DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Parse a stored instant back to UTC.
pub fn parse_instant(s: &str) -> DbResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| DbError::Constraint(format!("Bad timestamp '{}': {}", s, e)))
}

/// Parse a stored instant inside a row-mapping closure.
pub(crate) fn instant_from_sql(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(&s, TS_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");
        let db = Database::open(&path);
        assert!(db.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for expected in [
            "patients",
            "appointments",
            "tooth_events",
            "tooth_states",
            "medical_records",
            "leads",
            "clinics",
            "practitioners",
            "treatments",
            "materials",
            "stock_movements",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_instant_round_trip() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap();
        let stored = format_instant(ts);
        assert_eq!(stored, "2025-03-14 10:30:00");
        assert_eq!(parse_instant(&stored).unwrap(), ts);
    }
}

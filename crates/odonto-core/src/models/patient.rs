//! Patient models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A patient record.
///
/// `national_id` should be unique across the clinic when present, but the
/// store does not enforce it: duplicate records slip in through imports
/// and re-registration, and the duplicate resolver cleans them up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Local UUID, generated on creation
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// National identity document number (unique when present)
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Birth date as `YYYY-MM-DD`
    pub birth_date: Option<String>,
    /// How the patient reached the clinic (walk-in, referral, lead, ...)
    pub origin: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(first_name: String, last_name: String) -> Self {
        Self {
            id: super::new_id(),
            first_name,
            last_name,
            national_id: None,
            phone: None,
            email: None,
            address: None,
            birth_date: None,
            origin: None,
            notes: None,
            created_at: super::now_utc(),
        }
    }

    /// Full name as displayed and as compared during duplicate detection.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A patient together with its relation counts, used when presenting
/// duplicate groups so the operator can pick the right main record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientWithCounts {
    pub patient: Patient,
    pub appointments_count: u32,
    pub medical_records_count: u32,
}

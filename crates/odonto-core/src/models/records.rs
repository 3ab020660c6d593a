//! Reference entities and patient-owned records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A clinic location. Referenced by appointments, not owned by patients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Clinic {
    pub fn new(name: String) -> Self {
        Self {
            id: super::new_id(),
            name,
            address: None,
            created_at: super::now_utc(),
        }
    }
}

/// A practitioner (dentist or other staff member holding a calendar).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Practitioner {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Practitioner {
    pub fn new(name: String) -> Self {
        Self {
            id: super::new_id(),
            name,
            email: None,
            created_at: super::now_utc(),
        }
    }
}

/// A catalog treatment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Treatment {
    pub id: String,
    pub name: String,
    pub duration_minutes: Option<u32>,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Treatment {
    pub fn new(name: String) -> Self {
        Self {
            id: super::new_id(),
            name,
            duration_minutes: None,
            price: None,
            created_at: super::now_utc(),
        }
    }
}

/// A clinical record entry for a visit. Owned by the patient and repointed
/// to the main record during a merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecord {
    pub id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub treatment_id: Option<String>,
    pub practitioner_id: Option<String>,
    /// Record date as `YYYY-MM-DD`
    pub record_date: String,
    pub notes: Option<String>,
    /// File paths of scanned attachments
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl MedicalRecord {
    pub fn new(patient_id: String, record_date: String) -> Self {
        Self {
            id: super::new_id(),
            patient_id,
            appointment_id: None,
            treatment_id: None,
            practitioner_id: None,
            record_date,
            notes: None,
            attachments: Vec::new(),
            created_at: super::now_utc(),
        }
    }
}

/// An inbound contact that may later be linked to a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub origin: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
    pub patient_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(first_name: String, last_name: String) -> Self {
        Self {
            id: super::new_id(),
            first_name,
            last_name,
            phone: None,
            email: None,
            origin: None,
            message: None,
            status: None,
            patient_id: None,
            created_at: super::now_utc(),
        }
    }
}

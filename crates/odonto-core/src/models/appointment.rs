//! Appointment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Appointment lifecycle status.
///
/// Transitions are free-form; the enum only bounds the vocabulary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
    Attended,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Attended => "attended",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "attended" => Some(AppointmentStatus::Attended),
            "no_show" => Some(AppointmentStatus::NoShow),
            _ => None,
        }
    }
}

/// Optional appointment category tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentCategory {
    Normal,
    Surgery,
    LabWork,
}

impl AppointmentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentCategory::Normal => "normal",
            AppointmentCategory::Surgery => "surgery",
            AppointmentCategory::LabWork => "lab_work",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(AppointmentCategory::Normal),
            "surgery" => Some(AppointmentCategory::Surgery),
            "lab_work" => Some(AppointmentCategory::LabWork),
            _ => None,
        }
    }
}

/// A booked appointment.
///
/// Invariant: `start < end`. For a non-null practitioner, no two
/// appointments may overlap on the half-open interval `[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub clinic_id: String,
    /// Nullable: unassigned appointments never conflict
    pub practitioner_id: Option<String>,
    pub treatment_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub category: Option<AppointmentCategory>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating or updating an appointment.
#[derive(Debug, Clone)]
pub struct AppointmentInput {
    pub patient_id: String,
    pub clinic_id: String,
    pub practitioner_id: Option<String>,
    pub treatment_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub category: Option<AppointmentCategory>,
    pub notes: Option<String>,
}

impl Appointment {
    /// Materialize a validated input as a new appointment row.
    pub fn from_input(input: AppointmentInput) -> Self {
        Self {
            id: super::new_id(),
            patient_id: input.patient_id,
            clinic_id: input.clinic_id,
            practitioner_id: input.practitioner_id,
            treatment_id: input.treatment_id,
            start: input.start,
            end: input.end,
            status: input.status,
            category: input.category,
            notes: input.notes,
            created_at: super::now_utc(),
        }
    }
}

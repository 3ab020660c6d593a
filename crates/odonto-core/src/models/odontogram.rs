//! Odontogram models: tooth events, tooth states, and role permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All 32 valid FDI tooth numbers (11-18, 21-28, 31-38, 41-48).
///
/// First digit is the quadrant, second digit the position from the midline.
pub const ALL_TOOTH_NUMBERS: [u8; 32] = [
    11, 12, 13, 14, 15, 16, 17, 18, //
    21, 22, 23, 24, 25, 26, 27, 28, //
    31, 32, 33, 34, 35, 36, 37, 38, //
    41, 42, 43, 44, 45, 46, 47, 48,
];

/// Whether `n` is a valid FDI tooth number.
pub fn is_valid_tooth_number(n: u8) -> bool {
    matches!(n, 11..=18 | 21..=28 | 31..=38 | 41..=48)
}

/// Clinical condition vocabulary for a tooth.
///
/// Any kind may follow any other kind; the domain intentionally allows
/// arbitrary corrections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToothEventKind {
    Healthy,
    Caries,
    Filled,
    Crown,
    RootCanal,
    Missing,
    Extraction,
    Implant,
    Bridge,
    Fracture,
    Watch,
}

impl ToothEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToothEventKind::Healthy => "healthy",
            ToothEventKind::Caries => "caries",
            ToothEventKind::Filled => "filled",
            ToothEventKind::Crown => "crown",
            ToothEventKind::RootCanal => "root_canal",
            ToothEventKind::Missing => "missing",
            ToothEventKind::Extraction => "extraction",
            ToothEventKind::Implant => "implant",
            ToothEventKind::Bridge => "bridge",
            ToothEventKind::Fracture => "fracture",
            ToothEventKind::Watch => "watch",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "healthy" => Some(ToothEventKind::Healthy),
            "caries" => Some(ToothEventKind::Caries),
            "filled" => Some(ToothEventKind::Filled),
            "crown" => Some(ToothEventKind::Crown),
            "root_canal" => Some(ToothEventKind::RootCanal),
            "missing" => Some(ToothEventKind::Missing),
            "extraction" => Some(ToothEventKind::Extraction),
            "implant" => Some(ToothEventKind::Implant),
            "bridge" => Some(ToothEventKind::Bridge),
            "fracture" => Some(ToothEventKind::Fracture),
            "watch" => Some(ToothEventKind::Watch),
            _ => None,
        }
    }
}

/// Actor role passed explicitly into the engines (never ambient state).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    /// Front-desk staff: may only record observational kinds
    Secretary,
    Dentist,
    Admin,
}

impl Role {
    /// Whether this role may record the given event kind.
    ///
    /// Front-desk staff are limited to healthy/watch/missing; clinical
    /// findings require a dentist or admin.
    pub fn may_record(&self, kind: ToothEventKind) -> bool {
        match self {
            Role::Secretary => matches!(
                kind,
                ToothEventKind::Healthy | ToothEventKind::Watch | ToothEventKind::Missing
            ),
            Role::Dentist | Role::Admin => true,
        }
    }
}

/// An immutable tooth-state-changing fact.
///
/// Never updated or deleted after creation; the event log is the source of
/// truth for the odontogram. Enforced at the store level by triggers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToothEvent {
    pub id: String,
    pub patient_id: String,
    pub tooth_number: u8,
    pub kind: ToothEventKind,
    pub treatment_id: Option<String>,
    pub appointment_id: Option<String>,
    pub medical_record_id: Option<String>,
    pub note: Option<String>,
    pub event_date: DateTime<Utc>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for recording a tooth event.
#[derive(Debug, Clone)]
pub struct ToothEventInput {
    pub patient_id: String,
    pub tooth_number: u8,
    pub kind: ToothEventKind,
    pub treatment_id: Option<String>,
    pub appointment_id: Option<String>,
    pub medical_record_id: Option<String>,
    pub note: Option<String>,
    /// Either `YYYY-MM-DD` (normalized to midnight UTC) or
    /// `YYYY-MM-DD HH:MM:SS`
    pub event_date: String,
    pub created_by: Option<String>,
}

/// Derived current state of one tooth: a mutable projection of the event
/// log, one row per (patient, tooth).
///
/// Invariant: `current_status` equals the kind of the event referenced by
/// `last_event_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToothState {
    pub patient_id: String,
    pub tooth_number: u8,
    pub current_status: ToothEventKind,
    pub last_event_id: String,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the full 32-tooth chart; unmaterialized teeth read as
/// healthy with no backing event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToothChartEntry {
    pub tooth_number: u8,
    pub current_status: ToothEventKind,
    pub last_event_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tooth_numbers() {
        for n in ALL_TOOTH_NUMBERS {
            assert!(is_valid_tooth_number(n), "{} should be valid", n);
        }
        for n in [0, 10, 19, 20, 29, 30, 39, 40, 49, 55, 99] {
            assert!(!is_valid_tooth_number(n), "{} should be invalid", n);
        }
        assert_eq!(ALL_TOOTH_NUMBERS.len(), 32);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ToothEventKind::Healthy,
            ToothEventKind::Caries,
            ToothEventKind::Filled,
            ToothEventKind::Crown,
            ToothEventKind::RootCanal,
            ToothEventKind::Missing,
            ToothEventKind::Extraction,
            ToothEventKind::Implant,
            ToothEventKind::Bridge,
            ToothEventKind::Fracture,
            ToothEventKind::Watch,
        ] {
            assert_eq!(ToothEventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ToothEventKind::parse("cavity"), None);
    }

    #[test]
    fn test_secretary_permissions() {
        assert!(Role::Secretary.may_record(ToothEventKind::Healthy));
        assert!(Role::Secretary.may_record(ToothEventKind::Watch));
        assert!(Role::Secretary.may_record(ToothEventKind::Missing));
        assert!(!Role::Secretary.may_record(ToothEventKind::Extraction));
        assert!(!Role::Secretary.may_record(ToothEventKind::Caries));
    }

    #[test]
    fn test_clinical_permissions() {
        for role in [Role::Dentist, Role::Admin] {
            assert!(role.may_record(ToothEventKind::Extraction));
            assert!(role.may_record(ToothEventKind::RootCanal));
        }
    }
}

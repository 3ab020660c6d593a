//! Domain types.

mod appointment;
mod material;
mod odontogram;
mod patient;
mod records;

pub use appointment::*;
pub use material::*;
pub use odontogram::*;
pub use patient::*;
pub use records::*;

use chrono::{DateTime, TimeZone, Utc};

/// Current UTC time truncated to whole seconds.
///
/// The store keeps timestamps as `YYYY-MM-DD HH:MM:SS` TEXT, so anything
/// finer than a second would not round-trip.
pub fn now_utc() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_opt(now.timestamp(), 0).single().unwrap_or(now)
}

/// Generate a fresh local UUID string.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

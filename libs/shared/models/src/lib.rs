// libs/shared/models/src/lib.rs
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// PROVIDER MODELS
// ==============================================================================

/// A service provider with a fixed weekly schedule expressed in local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub display_name: String,
    /// IANA timezone identifier, e.g. "Europe/Berlin".
    pub timezone: String,
    /// Fixed appointment length in minutes, at least 15.
    pub slot_duration_minutes: i32,
    pub schedule: Vec<WeeklyScheduleEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    /// Working window for a given weekday, if the provider works that day.
    pub fn schedule_entry_for(&self, day: Weekday) -> Option<&WeeklyScheduleEntry> {
        self.schedule.iter().find(|entry| entry.day_of_week == day)
    }

    pub fn slot_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.slot_duration_minutes as i64)
    }
}

/// One weekday's working hours in the provider's local time.
/// At most one entry per weekday; a missing weekday means the provider
/// does not work that day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyScheduleEntry {
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
    Rescheduled,
    NoShow,
}

impl AppointmentStatus {
    /// Cancelled is the only terminal status; nothing transitions out of it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled)
    }

    /// Whether an appointment in this status occupies its time slot.
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

// ==============================================================================
// BOOKED INTERVALS
// ==============================================================================

/// A half-open `[start, end)` interval occupied by a non-cancelled appointment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookedInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BookedInterval {
    /// Half-open overlap test: two intervals are disjoint exactly when one
    /// entirely precedes the other.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        !(self.end <= start || end <= self.start)
    }
}

// ==============================================================================
// ERROR TAXONOMY
// ==============================================================================

/// Coarse error class every cell error maps onto, so the transport layer can
/// translate uniformly without matching on cell-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    BadRequest,
    Conflict,
    Internal,
}

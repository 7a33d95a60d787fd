// libs/shared/database/src/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use shared_models::{
    Appointment, AppointmentStatus, BookedInterval, ErrorClass, Provider, WeeklyScheduleEntry,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("uniqueness violation: {0}")]
    UniqueViolation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to decode store response: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::NotFound => ErrorClass::NotFound,
            StoreError::UniqueViolation(_) => ErrorClass::Conflict,
            StoreError::Unavailable(_) | StoreError::Serialization(_) => ErrorClass::Internal,
        }
    }
}

/// Persistence contract consumed by the availability and booking cells.
///
/// Implementations are the final authority on the per-provider appointment
/// uniqueness invariant: a write that would put two non-cancelled
/// appointments on the same (provider, start_time) must fail with
/// [`StoreError::UniqueViolation`].
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn create_provider(
        &self,
        display_name: String,
        timezone: String,
        slot_duration_minutes: i32,
        schedule: Vec<WeeklyScheduleEntry>,
    ) -> Result<Provider, StoreError>;

    /// Replace a provider's weekly schedule wholesale.
    async fn replace_schedule(
        &self,
        provider_id: Uuid,
        entries: Vec<WeeklyScheduleEntry>,
    ) -> Result<Provider, StoreError>;

    async fn find_provider_with_schedule(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<Provider>, StoreError>;

    /// Intervals of non-cancelled appointments overlapping the query range,
    /// ordered by start ascending.
    async fn find_booked_intervals(
        &self,
        provider_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BookedInterval>, StoreError>;

    async fn create_appointment(
        &self,
        patient_id: Uuid,
        provider_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;

    async fn update_appointment_time(
        &self,
        appointment_id: Uuid,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError>;

    async fn find_appointment_by_id(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Appointment>, StoreError>;
}

use chrono::NaiveDate;
use thiserror::Error;

use shared_database::StoreError;
use shared_models::ErrorClass;

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("provider not found")]
    ProviderNotFound,

    #[error("invalid timezone identifier: {0}")]
    InvalidTimezone(String),

    #[error("appointment duration must be at least {min} minutes, got {got}")]
    InvalidDuration { min: i32, got: i32 },

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AvailabilityError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AvailabilityError::ProviderNotFound => ErrorClass::NotFound,
            AvailabilityError::InvalidTimezone(_)
            | AvailabilityError::InvalidDuration { .. }
            | AvailabilityError::InvalidSchedule(_)
            | AvailabilityError::InvalidRange { .. } => ErrorClass::BadRequest,
            AvailabilityError::Store(e) => e.class(),
        }
    }
}

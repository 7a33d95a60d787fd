// libs/booking-cell/src/error.rs
use thiserror::Error;

use availability_cell::AvailabilityError;
use shared_database::StoreError;
use shared_models::{AppointmentStatus, ErrorClass};

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("appointment not found")]
    AppointmentNotFound,

    #[error("provider not found")]
    ProviderNotFound,

    #[error("requested slot is not available")]
    SlotNotAvailable,

    #[error("slot was booked by a concurrent request")]
    DoubleBooked,

    #[error("slot is locked by another in-flight operation")]
    LockUnavailable,

    #[error("appointment is {0} and can no longer be modified")]
    AppointmentNotActive(AppointmentStatus),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl BookingError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BookingError::AppointmentNotFound | BookingError::ProviderNotFound => {
                ErrorClass::NotFound
            }
            BookingError::SlotNotAvailable
            | BookingError::DoubleBooked
            | BookingError::LockUnavailable => ErrorClass::Conflict,
            BookingError::AppointmentNotActive(_) => ErrorClass::BadRequest,
            BookingError::Availability(e) => e.class(),
            BookingError::Store(e) => e.class(),
        }
    }
}

// Uniqueness violations reach the coordinator only when a write slipped past
// the lock, so they surface as the conflict the lock would have reported.
impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(_) => BookingError::DoubleBooked,
            other => BookingError::Store(other),
        }
    }
}

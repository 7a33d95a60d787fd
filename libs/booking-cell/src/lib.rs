pub mod error;
pub mod services;

pub use error::BookingError;
pub use services::*;

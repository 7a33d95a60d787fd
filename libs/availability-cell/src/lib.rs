pub mod error;
pub mod models;
pub mod services;

pub use error::AvailabilityError;
pub use models::*;
pub use services::*;

pub mod availability;
pub mod schedule;
pub mod slots;
pub mod time;

pub use availability::AvailabilityService;
pub use schedule::ScheduleService;

pub mod booking;
pub mod events;
pub mod lock;

pub use booking::BookingCoordinator;
pub use events::{
    publisher_from_config, BookingEvent, BookingEventKind, EventPublisher, TracingPublisher,
    WebhookPublisher,
};
pub use lock::{run_exclusive, InMemoryLockManager, LockKey, LockManager};

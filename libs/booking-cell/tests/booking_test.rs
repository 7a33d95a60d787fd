// libs/booking-cell/tests/booking_test.rs
use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use booking_cell::{
    BookingCoordinator, BookingError, BookingEvent, BookingEventKind, EventPublisher,
    InMemoryLockManager, LockKey, LockManager,
};
use shared_database::{InMemoryStore, SchedulingStore};
use shared_models::{AppointmentStatus, ErrorClass, Provider, WeeklyScheduleEntry};

/// Publisher that records everything it is handed.
#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<BookingEvent>>,
}

impl RecordingPublisher {
    async fn kinds(&self) -> Vec<BookingEventKind> {
        self.events.lock().await.iter().map(|e| e.kind).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &BookingEvent) -> anyhow::Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

struct Fixture {
    locks: Arc<InMemoryLockManager>,
    publisher: Arc<RecordingPublisher>,
    coordinator: BookingCoordinator,
    provider: Provider,
}

/// Berlin provider working Mondays 09:00-17:00 with 30-minute slots.
async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let provider = store
        .create_provider(
            "Dr. Weber".to_string(),
            "Europe/Berlin".to_string(),
            30,
            vec![WeeklyScheduleEntry {
                day_of_week: Weekday::Mon,
                start_time: NaiveTime::parse_from_str("09:00", "%H:%M").unwrap(),
                end_time: NaiveTime::parse_from_str("17:00", "%H:%M").unwrap(),
            }],
        )
        .await
        .unwrap();

    let locks = Arc::new(InMemoryLockManager::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let coordinator = BookingCoordinator::new(
        store.clone() as Arc<dyn SchedulingStore>,
        locks.clone() as Arc<dyn LockManager>,
        publisher.clone() as Arc<dyn EventPublisher>,
        Duration::from_secs(30),
    );

    Fixture { locks, publisher, coordinator, provider }
}

/// Local 10:00 in Berlin on Monday 2025-06-16, which is 08:00 UTC in CEST.
fn ten_am_berlin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 16, 8, 0, 0).unwrap()
}

#[tokio::test]
async fn booking_confirms_and_publishes() {
    let fx = fixture().await;

    let appointment = fx
        .coordinator
        .book(Uuid::new_v4(), fx.provider.id, ten_am_berlin())
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert_eq!(appointment.end_time - appointment.start_time, chrono::Duration::minutes(30));
    assert_eq!(fx.publisher.kinds().await, vec![BookingEventKind::Confirmed]);
}

#[tokio::test]
async fn concurrent_bookings_of_same_slot_yield_exactly_one_success() {
    let fx = fixture().await;
    let start = ten_am_berlin();

    let (a, b) = futures::join!(
        fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start),
        fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start),
    );

    let (ok, err) = match (a, b) {
        (Ok(apt), Err(e)) | (Err(e), Ok(apt)) => (apt, e),
        other => panic!("expected exactly one success, got {:?}", other.0.is_ok()),
    };
    assert_eq!(ok.status, AppointmentStatus::Confirmed);
    // The loser sees contention or a consumed slot; both are conflicts.
    assert_eq!(err.class(), ErrorClass::Conflict);
    assert_eq!(fx.publisher.kinds().await, vec![BookingEventKind::Confirmed]);
}

#[tokio::test]
async fn sequential_rebooking_of_taken_slot_is_slot_not_available() {
    let fx = fixture().await;
    let start = ten_am_berlin();

    fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start).await.unwrap();
    let result = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start).await;

    assert_matches!(result, Err(BookingError::SlotNotAvailable));
}

#[tokio::test]
async fn booking_outside_working_hours_is_rejected() {
    let fx = fixture().await;
    // Local 07:00, before the 09:00 window opens.
    let early = Utc.with_ymd_and_hms(2025, 6, 16, 5, 0, 0).unwrap();

    let result = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, early).await;
    assert_matches!(result, Err(BookingError::SlotNotAvailable));
}

#[tokio::test]
async fn booking_for_unknown_provider_is_not_found() {
    let fx = fixture().await;

    let result = fx.coordinator.book(Uuid::new_v4(), Uuid::new_v4(), ten_am_berlin()).await;
    assert_matches!(result, Err(BookingError::ProviderNotFound));
}

#[tokio::test]
async fn held_lock_fails_booking_fast() {
    let fx = fixture().await;
    let start = ten_am_berlin();

    let key = LockKey::slot(fx.provider.id, start);
    assert!(fx.locks.acquire(&key, Duration::from_secs(30)).await);

    let result = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start).await;
    assert_matches!(result, Err(BookingError::LockUnavailable));
}

#[tokio::test]
async fn distinct_slots_book_concurrently() {
    let fx = fixture().await;
    let first = ten_am_berlin();
    let second = first + chrono::Duration::minutes(30);

    let (a, b) = futures::join!(
        fx.coordinator.book(Uuid::new_v4(), fx.provider.id, first),
        fx.coordinator.book(Uuid::new_v4(), fx.provider.id, second),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
}

#[tokio::test]
async fn reschedule_moves_appointment_and_frees_old_slot() {
    let fx = fixture().await;
    let old_start = ten_am_berlin();
    let new_start = old_start + chrono::Duration::hours(2);

    let appointment = fx
        .coordinator
        .book(Uuid::new_v4(), fx.provider.id, old_start)
        .await
        .unwrap();
    let moved = fx.coordinator.reschedule(appointment.id, new_start).await.unwrap();

    assert_eq!(moved.start_time, new_start);
    assert_eq!(moved.status, AppointmentStatus::Confirmed);

    let events = fx.publisher.events.lock().await;
    let rescheduled = events.last().unwrap();
    assert_eq!(rescheduled.kind, BookingEventKind::Rescheduled);
    assert_eq!(rescheduled.previous_start_time, Some(old_start));
    drop(events);

    // The vacated slot can be booked again.
    let rebooked = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, old_start).await;
    assert!(rebooked.is_ok());
}

#[tokio::test]
async fn reschedule_to_current_start_is_a_no_op() {
    let fx = fixture().await;
    let start = ten_am_berlin();

    let appointment = fx
        .coordinator
        .book(Uuid::new_v4(), fx.provider.id, start)
        .await
        .unwrap();
    let unchanged = fx.coordinator.reschedule(appointment.id, start).await.unwrap();

    assert_eq!(unchanged.start_time, start);
    // No write happened, so the record is byte-for-byte what booking stored.
    assert_eq!(unchanged.updated_at, appointment.updated_at);
    assert_eq!(fx.publisher.kinds().await, vec![BookingEventKind::Confirmed]);
}

#[tokio::test]
async fn reschedule_of_cancelled_appointment_is_bad_request() {
    let fx = fixture().await;
    let start = ten_am_berlin();

    let appointment = fx
        .coordinator
        .book(Uuid::new_v4(), fx.provider.id, start)
        .await
        .unwrap();
    fx.coordinator.cancel(appointment.id, None).await.unwrap();

    let result = fx
        .coordinator
        .reschedule(appointment.id, start + chrono::Duration::hours(1))
        .await;

    assert_matches!(result, Err(BookingError::AppointmentNotActive(_)));
    assert_eq!(result.unwrap_err().class(), ErrorClass::BadRequest);
}

#[tokio::test]
async fn reschedule_onto_taken_slot_is_a_conflict() {
    let fx = fixture().await;
    let first = ten_am_berlin();
    let second = first + chrono::Duration::minutes(30);

    fx.coordinator.book(Uuid::new_v4(), fx.provider.id, first).await.unwrap();
    let movable = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, second).await.unwrap();

    let result = fx.coordinator.reschedule(movable.id, first).await;
    assert_matches!(result, Err(BookingError::SlotNotAvailable));
}

#[tokio::test]
async fn cancel_is_idempotent_and_publishes_once() {
    let fx = fixture().await;

    let appointment = fx
        .coordinator
        .book(Uuid::new_v4(), fx.provider.id, ten_am_berlin())
        .await
        .unwrap();

    let first = fx
        .coordinator
        .cancel(appointment.id, Some("patient request".to_string()))
        .await
        .unwrap();
    assert_eq!(first.status, AppointmentStatus::Cancelled);

    let second = fx.coordinator.cancel(appointment.id, None).await.unwrap();
    assert_eq!(second.status, AppointmentStatus::Cancelled);

    assert_eq!(
        fx.publisher.kinds().await,
        vec![BookingEventKind::Confirmed, BookingEventKind::Cancelled]
    );
}

#[tokio::test]
async fn cancelled_slot_becomes_bookable_again() {
    let fx = fixture().await;
    let start = ten_am_berlin();

    let appointment = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start).await.unwrap();
    fx.coordinator.cancel(appointment.id, None).await.unwrap();

    let rebooked = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start).await;
    assert!(rebooked.is_ok());
}

#[tokio::test]
async fn no_show_keeps_the_slot_consumed() {
    let fx = fixture().await;
    let start = ten_am_berlin();

    let appointment = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start).await.unwrap();
    let flagged = fx.coordinator.mark_no_show(appointment.id).await.unwrap();
    assert_eq!(flagged.status, AppointmentStatus::NoShow);

    let rebooked = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start).await;
    assert_matches!(rebooked, Err(BookingError::SlotNotAvailable));
}

#[tokio::test]
async fn only_confirmed_appointments_can_become_no_shows() {
    let fx = fixture().await;
    let start = ten_am_berlin();

    let appointment = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start).await.unwrap();
    let flagged = fx.coordinator.mark_no_show(appointment.id).await.unwrap();

    // Re-flagging must not churn the record a second time.
    let again = fx.coordinator.mark_no_show(appointment.id).await;
    assert_matches!(again, Err(BookingError::AppointmentNotActive(AppointmentStatus::NoShow)));

    let stored = fx.coordinator.get_by_id(appointment.id).await.unwrap();
    assert_eq!(stored.updated_at, flagged.updated_at);

    let cancelled = fx.coordinator.book(Uuid::new_v4(), fx.provider.id, start + chrono::Duration::hours(1)).await.unwrap();
    fx.coordinator.cancel(cancelled.id, None).await.unwrap();
    let result = fx.coordinator.mark_no_show(cancelled.id).await;
    assert_matches!(result, Err(BookingError::AppointmentNotActive(AppointmentStatus::Cancelled)));
}

#[tokio::test]
async fn get_by_id_round_trips_and_misses_are_not_found() {
    let fx = fixture().await;

    let appointment = fx
        .coordinator
        .book(Uuid::new_v4(), fx.provider.id, ten_am_berlin())
        .await
        .unwrap();

    let found = fx.coordinator.get_by_id(appointment.id).await.unwrap();
    assert_eq!(found.id, appointment.id);

    let missing = fx.coordinator.get_by_id(Uuid::new_v4()).await;
    assert_matches!(missing, Err(BookingError::AppointmentNotFound));
}

/// Publisher that always fails, to pin down that publish errors never undo a
/// committed decision.
struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _event: &BookingEvent) -> anyhow::Result<()> {
        anyhow::bail!("downstream unavailable")
    }
}

#[tokio::test]
async fn publish_failure_does_not_fail_the_booking() {
    let store = Arc::new(InMemoryStore::new());
    let provider = store
        .create_provider(
            "Dr. Weber".to_string(),
            "Europe/Berlin".to_string(),
            30,
            vec![WeeklyScheduleEntry {
                day_of_week: Weekday::Mon,
                start_time: NaiveTime::parse_from_str("09:00", "%H:%M").unwrap(),
                end_time: NaiveTime::parse_from_str("17:00", "%H:%M").unwrap(),
            }],
        )
        .await
        .unwrap();

    let coordinator = BookingCoordinator::new(
        store.clone() as Arc<dyn SchedulingStore>,
        Arc::new(InMemoryLockManager::new()),
        Arc::new(FailingPublisher),
        Duration::from_secs(30),
    );

    let appointment = coordinator
        .book(Uuid::new_v4(), provider.id, ten_am_berlin())
        .await
        .unwrap();

    let stored = store.find_appointment_by_id(appointment.id).await.unwrap();
    assert!(stored.is_some());
}

// libs/booking-cell/src/services/booking.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use availability_cell::services::time;
use availability_cell::AvailabilityService;
use shared_database::SchedulingStore;
use shared_models::{Appointment, AppointmentStatus, Provider};

use crate::error::BookingError;
use crate::services::events::{BookingEvent, EventPublisher};
use crate::services::lock::{run_exclusive, LockKey, LockManager};

/// Orchestrates booking, rescheduling and cancellation, serializing every
/// slot-consuming decision through the lock manager.
pub struct BookingCoordinator {
    store: Arc<dyn SchedulingStore>,
    availability: AvailabilityService,
    locks: Arc<dyn LockManager>,
    publisher: Arc<dyn EventPublisher>,
    lock_ttl: Duration,
}

impl BookingCoordinator {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        locks: Arc<dyn LockManager>,
        publisher: Arc<dyn EventPublisher>,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            availability: AvailabilityService::new(store.clone()),
            store,
            locks,
            publisher,
            lock_ttl,
        }
    }

    pub fn from_config(
        config: &shared_config::AppConfig,
        store: Arc<dyn SchedulingStore>,
        locks: Arc<dyn LockManager>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self::new(store, locks, publisher, Duration::from_secs(config.lock_ttl_seconds))
    }

    /// Book the slot starting at `start_time` for `patient_id`.
    ///
    /// The availability check runs inside the lock; an earlier unlocked
    /// check a caller may have done is inherently racy and never trusted.
    pub async fn book(
        &self,
        patient_id: Uuid,
        provider_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        let key = LockKey::slot(provider_id, start_time);
        let appointment = run_exclusive(self.locks.as_ref(), key, self.lock_ttl, || async move {
            let provider = self.load_provider(provider_id).await?;
            self.ensure_slot_open(&provider, start_time).await?;

            let end_time = start_time + provider.slot_duration();
            self.store
                .create_appointment(patient_id, provider_id, start_time, end_time)
                .await
                .map_err(BookingError::from)
        })
        .await?;

        info!(
            "Booked appointment {} for provider {} at {}",
            appointment.id, provider_id, start_time
        );
        self.publish(BookingEvent::confirmed(&appointment)).await;
        Ok(appointment)
    }

    /// Move an existing appointment to `new_start`, locking only the target
    /// slot. Rescheduling to the current start time is a no-op.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_start: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        let existing = self.load_appointment(appointment_id).await?;
        if existing.status == AppointmentStatus::Cancelled {
            return Err(BookingError::AppointmentNotActive(existing.status));
        }
        if existing.start_time == new_start {
            debug!("Appointment {} already starts at {}", appointment_id, new_start);
            return Ok(existing);
        }

        let provider_id = existing.provider_id;
        let old_start = existing.start_time;

        let key = LockKey::slot(provider_id, new_start);
        let updated = run_exclusive(self.locks.as_ref(), key, self.lock_ttl, || async move {
            let provider = self.load_provider(provider_id).await?;
            self.ensure_slot_open(&provider, new_start).await?;

            let new_end = new_start + provider.slot_duration();
            self.store
                .update_appointment_time(appointment_id, new_start, new_end)
                .await
                .map_err(BookingError::from)
        })
        .await?;

        info!(
            "Rescheduled appointment {} from {} to {}",
            appointment_id, old_start, new_start
        );
        self.publish(BookingEvent::rescheduled(&updated, old_start)).await;
        Ok(updated)
    }

    /// Cancel an appointment. Cancelling twice returns the record unchanged.
    /// No lock is taken; cancellation never competes for a slot.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        reason: Option<String>,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.load_appointment(appointment_id).await?;
        if appointment.status == AppointmentStatus::Cancelled {
            debug!("Appointment {} is already cancelled", appointment_id);
            return Ok(appointment);
        }

        let updated = self
            .store
            .update_appointment_status(appointment_id, AppointmentStatus::Cancelled)
            .await?;

        info!("Cancelled appointment {}", appointment_id);
        self.publish(BookingEvent::cancelled(&updated, reason)).await;
        Ok(updated)
    }

    /// Flag a missed appointment. The slot stays consumed, so no lock and no
    /// downstream event are involved. Only a confirmed appointment may
    /// transition.
    pub async fn mark_no_show(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let appointment = self.load_appointment(appointment_id).await?;
        if appointment.status != AppointmentStatus::Confirmed {
            return Err(BookingError::AppointmentNotActive(appointment.status));
        }

        let updated = self
            .store
            .update_appointment_status(appointment_id, AppointmentStatus::NoShow)
            .await?;
        info!("Marked appointment {} as no-show", appointment_id);
        Ok(updated)
    }

    pub async fn get_by_id(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.load_appointment(appointment_id).await
    }

    async fn load_provider(&self, provider_id: Uuid) -> Result<Provider, BookingError> {
        self.store
            .find_provider_with_schedule(provider_id)
            .await
            .map_err(BookingError::from)?
            .ok_or(BookingError::ProviderNotFound)
    }

    async fn load_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.store
            .find_appointment_by_id(appointment_id)
            .await
            .map_err(BookingError::from)?
            .ok_or(BookingError::AppointmentNotFound)
    }

    async fn ensure_slot_open(
        &self,
        provider: &Provider,
        instant: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let tz = time::validate_timezone(&provider.timezone)
            .map_err(BookingError::Availability)?;
        let local_date = time::utc_to_local_date(instant, tz);

        let open = self.availability.available_starts(provider, tz, local_date).await?;
        if !open.contains(&instant) {
            return Err(BookingError::SlotNotAvailable);
        }
        Ok(())
    }

    async fn publish(&self, event: BookingEvent) {
        if let Err(e) = self.publisher.publish(&event).await {
            warn!(
                "Failed to publish {} event for appointment {}: {:#}",
                event.kind, event.appointment_id, e
            );
        }
    }
}

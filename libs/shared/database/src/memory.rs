// libs/shared/database/src/memory.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::{
    Appointment, AppointmentStatus, BookedInterval, Provider, WeeklyScheduleEntry,
};

use crate::store::{SchedulingStore, StoreError};

/// Single-process, in-memory implementation of [`SchedulingStore`].
///
/// Enforces the same per-provider appointment uniqueness invariant a
/// SQL-backed store would carry as a partial unique index.
#[derive(Default)]
pub struct InMemoryStore {
    providers: RwLock<HashMap<Uuid, Provider>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_taken(
        appointments: &HashMap<Uuid, Appointment>,
        provider_id: Uuid,
        start_time: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> bool {
        appointments.values().any(|apt| {
            apt.provider_id == provider_id
                && apt.start_time == start_time
                && apt.status.blocks_slot()
                && Some(apt.id) != exclude
        })
    }
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn create_provider(
        &self,
        display_name: String,
        timezone: String,
        slot_duration_minutes: i32,
        schedule: Vec<WeeklyScheduleEntry>,
    ) -> Result<Provider, StoreError> {
        let now = Utc::now();
        let provider = Provider {
            id: Uuid::new_v4(),
            display_name,
            timezone,
            slot_duration_minutes,
            schedule,
            created_at: now,
            updated_at: now,
        };

        self.providers
            .write()
            .await
            .insert(provider.id, provider.clone());

        debug!("Provider {} created", provider.id);
        Ok(provider)
    }

    async fn replace_schedule(
        &self,
        provider_id: Uuid,
        entries: Vec<WeeklyScheduleEntry>,
    ) -> Result<Provider, StoreError> {
        let mut providers = self.providers.write().await;
        let provider = providers.get_mut(&provider_id).ok_or(StoreError::NotFound)?;
        provider.schedule = entries;
        provider.updated_at = Utc::now();
        Ok(provider.clone())
    }

    async fn find_provider_with_schedule(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<Provider>, StoreError> {
        Ok(self.providers.read().await.get(&provider_id).cloned())
    }

    async fn find_booked_intervals(
        &self,
        provider_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BookedInterval>, StoreError> {
        let appointments = self.appointments.read().await;

        let mut intervals: Vec<BookedInterval> = appointments
            .values()
            .filter(|apt| apt.provider_id == provider_id && apt.status.blocks_slot())
            .map(|apt| BookedInterval { start: apt.start_time, end: apt.end_time })
            .filter(|interval| interval.overlaps(range_start, range_end))
            .collect();

        intervals.sort_by_key(|interval| interval.start);
        Ok(intervals)
    }

    async fn create_appointment(
        &self,
        patient_id: Uuid,
        provider_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;

        if Self::slot_taken(&appointments, provider_id, start_time, None) {
            return Err(StoreError::UniqueViolation(format!(
                "provider {} already has a non-cancelled appointment at {}",
                provider_id, start_time
            )));
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            provider_id,
            start_time,
            end_time,
            status: AppointmentStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };

        appointments.insert(appointment.id, appointment.clone());
        debug!("Appointment {} created at {}", appointment.id, start_time);
        Ok(appointment)
    }

    async fn update_appointment_time(
        &self,
        appointment_id: Uuid,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;

        let provider_id = appointments
            .get(&appointment_id)
            .ok_or(StoreError::NotFound)?
            .provider_id;

        if Self::slot_taken(&appointments, provider_id, new_start, Some(appointment_id)) {
            return Err(StoreError::UniqueViolation(format!(
                "provider {} already has a non-cancelled appointment at {}",
                provider_id, new_start
            )));
        }

        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(StoreError::NotFound)?;
        appointment.start_time = new_start;
        appointment.end_time = new_end;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&appointment_id)
            .ok_or(StoreError::NotFound)?;
        appointment.status = status;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn find_appointment_by_id(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }
}

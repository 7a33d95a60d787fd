// libs/availability-cell/src/services/schedule.rs
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use shared_database::{SchedulingStore, StoreError};
use shared_models::{Provider, WeeklyScheduleEntry};

use crate::error::AvailabilityError;
use crate::models::CreateProviderRequest;
use crate::services::time;

pub const MIN_SLOT_DURATION_MINUTES: i32 = 15;

/// Provider and weekly-schedule management.
pub struct ScheduleService {
    store: Arc<dyn SchedulingStore>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    pub async fn create_provider(
        &self,
        request: CreateProviderRequest,
    ) -> Result<Provider, AvailabilityError> {
        time::validate_timezone(&request.timezone)?;
        if request.slot_duration_minutes < MIN_SLOT_DURATION_MINUTES {
            return Err(AvailabilityError::InvalidDuration {
                min: MIN_SLOT_DURATION_MINUTES,
                got: request.slot_duration_minutes,
            });
        }
        validate_entries(&request.schedule)?;

        let provider = self
            .store
            .create_provider(
                request.display_name,
                request.timezone,
                request.slot_duration_minutes,
                request.schedule,
            )
            .await?;

        info!("Created provider {} ({})", provider.id, provider.timezone);
        Ok(provider)
    }

    pub async fn replace_schedule(
        &self,
        provider_id: Uuid,
        entries: Vec<WeeklyScheduleEntry>,
    ) -> Result<Provider, AvailabilityError> {
        validate_entries(&entries)?;

        let provider = self
            .store
            .replace_schedule(provider_id, entries)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AvailabilityError::ProviderNotFound,
                other => AvailabilityError::Store(other),
            })?;

        info!("Replaced schedule for provider {}", provider.id);
        Ok(provider)
    }
}

fn validate_entries(entries: &[WeeklyScheduleEntry]) -> Result<(), AvailabilityError> {
    let mut seen_days = HashSet::new();
    for entry in entries {
        if entry.end_time <= entry.start_time {
            return Err(AvailabilityError::InvalidSchedule(format!(
                "end time {} is not after start time {} on {:?}",
                entry.end_time, entry.start_time, entry.day_of_week
            )));
        }
        if !seen_days.insert(entry.day_of_week) {
            return Err(AvailabilityError::InvalidSchedule(format!(
                "duplicate schedule entry for {:?}",
                entry.day_of_week
            )));
        }
    }
    Ok(())
}

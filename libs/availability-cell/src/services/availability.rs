// libs/availability-cell/src/services/availability.rs
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::Provider;

use crate::error::AvailabilityError;
use crate::services::{slots, time};

/// Computes bookable slots by filtering generated candidates against the
/// store's booked intervals.
pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Available slots on a local calendar date, as local "HH:MM" strings in
    /// chronological order.
    pub async fn available_slots_for_date(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<String>, AvailabilityError> {
        let provider = self
            .store
            .find_provider_with_schedule(provider_id)
            .await?
            .ok_or(AvailabilityError::ProviderNotFound)?;
        let tz = time::validate_timezone(&provider.timezone)?;

        let starts = self.available_starts(&provider, tz, date).await?;
        Ok(starts
            .into_iter()
            .map(|start| time::utc_to_local_time(start, tz))
            .collect())
    }

    /// Available slot start instants for an already-loaded provider.
    ///
    /// This is the form the booking coordinator re-checks inside its critical
    /// section, against the same provider row it locked with.
    pub async fn available_starts(
        &self,
        provider: &Provider,
        tz: Tz,
        date: NaiveDate,
    ) -> Result<Vec<DateTime<Utc>>, AvailabilityError> {
        let Some(entry) = provider.schedule_entry_for(date.weekday()) else {
            // Day off: no candidates, so the store is never queried.
            debug!("Provider {} has no schedule entry for {}", provider.id, date.weekday());
            return Ok(Vec::new());
        };

        let candidates = slots::generate_slots(
            entry.start_time,
            entry.end_time,
            date,
            provider.slot_duration_minutes,
            tz,
        );
        let (Some(&first), Some(&last)) = (candidates.first(), candidates.last()) else {
            return Ok(Vec::new());
        };

        let duration = provider.slot_duration();
        let booked = self
            .store
            .find_booked_intervals(provider.id, first, last + duration)
            .await?;

        let available: Vec<DateTime<Utc>> = candidates
            .into_iter()
            .filter(|&start| {
                let end = start + duration;
                !booked.iter().any(|interval| interval.overlaps(start, end))
            })
            .collect();

        debug!(
            "Provider {} has {} available slots on {}",
            provider.id,
            available.len(),
            date
        );
        Ok(available)
    }

    /// Availability per date over an inclusive local-calendar range. Dates
    /// with zero available slots are omitted from the mapping.
    pub async fn available_slots_for_range(
        &self,
        provider_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, Vec<String>>, AvailabilityError> {
        if start_date > end_date {
            return Err(AvailabilityError::InvalidRange { start: start_date, end: end_date });
        }

        let provider = self
            .store
            .find_provider_with_schedule(provider_id)
            .await?
            .ok_or(AvailabilityError::ProviderNotFound)?;
        let tz = time::validate_timezone(&provider.timezone)?;

        let mut result = BTreeMap::new();
        let mut date = start_date;
        while date <= end_date {
            let starts = self.available_starts(&provider, tz, date).await?;
            if !starts.is_empty() {
                let local: Vec<String> = starts
                    .into_iter()
                    .map(|start| time::utc_to_local_time(start, tz))
                    .collect();
                result.insert(date, local);
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        Ok(result)
    }
}

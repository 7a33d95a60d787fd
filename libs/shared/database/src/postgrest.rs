// libs/shared/database/src/postgrest.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{
    Appointment, AppointmentStatus, BookedInterval, Provider, WeeklyScheduleEntry,
};

use crate::store::{SchedulingStore, StoreError};

/// [`SchedulingStore`] implementation against a PostgREST-style REST interface.
///
/// The database is the final authority on appointment uniqueness: a partial
/// unique index on (provider_id, start_time) over non-cancelled rows surfaces
/// here as HTTP 409, translated to [`StoreError::UniqueViolation`].
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(config.postgrest_url.clone(), config.postgrest_api_key.clone())
    }

    pub fn with_base_url(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    fn get_headers(&self, representation: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.api_key).unwrap());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).unwrap(),
        );
        if representation {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        headers
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        representation: bool,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.get_headers(representation));

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store API error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::CONFLICT => StoreError::UniqueViolation(error_text),
                StatusCode::NOT_FOUND => StoreError::NotFound,
                _ => StoreError::Unavailable(format!("API error ({}): {}", status, error_text)),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Single-row helper for writes made with `Prefer: return=representation`.
    async fn request_one<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let mut rows: Vec<T> = self.request(method, path, body, true).await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(rows.remove(0))
    }
}

// PostgREST serializes time columns as "HH:MM:SS" and weekdays as 0..=6
// with 0 = Sunday, so providers cross the wire in row form.

#[derive(Debug, Deserialize)]
struct ProviderRow {
    id: Uuid,
    display_name: String,
    timezone: String,
    slot_duration_minutes: i32,
    #[serde(default)]
    weekly_schedules: Vec<ScheduleRow>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    day_of_week: i32,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
struct IntervalRow {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

fn weekday_index(day: Weekday) -> i32 {
    day.num_days_from_sunday() as i32
}

fn weekday_from_index(index: i32) -> Result<Weekday, StoreError> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        other => Err(StoreError::Serialization(format!(
            "day_of_week out of range: {}",
            other
        ))),
    }
}

impl TryFrom<ProviderRow> for Provider {
    type Error = StoreError;

    fn try_from(row: ProviderRow) -> Result<Self, StoreError> {
        let schedule = row
            .weekly_schedules
            .into_iter()
            .map(|entry| {
                Ok(WeeklyScheduleEntry {
                    day_of_week: weekday_from_index(entry.day_of_week)?,
                    start_time: entry.start_time,
                    end_time: entry.end_time,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Provider {
            id: row.id,
            display_name: row.display_name,
            timezone: row.timezone,
            slot_duration_minutes: row.slot_duration_minutes,
            schedule,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn schedule_rows(provider_id: Uuid, entries: &[WeeklyScheduleEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|entry| {
                json!({
                    "provider_id": provider_id,
                    "day_of_week": weekday_index(entry.day_of_week),
                    "start_time": entry.start_time.format("%H:%M:%S").to_string(),
                    "end_time": entry.end_time.format("%H:%M:%S").to_string(),
                })
            })
            .collect(),
    )
}

#[async_trait]
impl SchedulingStore for PostgrestStore {
    async fn create_provider(
        &self,
        display_name: String,
        timezone: String,
        slot_duration_minutes: i32,
        schedule: Vec<WeeklyScheduleEntry>,
    ) -> Result<Provider, StoreError> {
        let provider_id = Uuid::new_v4();
        let now = Utc::now();

        let provider_data = json!({
            "id": provider_id,
            "display_name": display_name,
            "timezone": timezone,
            "slot_duration_minutes": slot_duration_minutes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let row: ProviderRow = self
            .request_one(Method::POST, "/providers", Some(provider_data))
            .await?;

        if !schedule.is_empty() {
            let _: Vec<Value> = self
                .request(
                    Method::POST,
                    "/weekly_schedules",
                    Some(schedule_rows(provider_id, &schedule)),
                    true,
                )
                .await?;
        }

        let mut provider = Provider::try_from(row)?;
        provider.schedule = schedule;
        debug!("Provider {} created", provider.id);
        Ok(provider)
    }

    async fn replace_schedule(
        &self,
        provider_id: Uuid,
        entries: Vec<WeeklyScheduleEntry>,
    ) -> Result<Provider, StoreError> {
        // Existence check up front so a missing provider is NotFound rather
        // than a silent no-row delete.
        let provider = self
            .find_provider_with_schedule(provider_id)
            .await?
            .ok_or(StoreError::NotFound)?;

        let delete_path = format!("/weekly_schedules?provider_id=eq.{}", provider_id);
        let _: Vec<Value> = self.request(Method::DELETE, &delete_path, None, true).await?;

        if !entries.is_empty() {
            let _: Vec<Value> = self
                .request(
                    Method::POST,
                    "/weekly_schedules",
                    Some(schedule_rows(provider_id, &entries)),
                    true,
                )
                .await?;
        }

        let touch_path = format!("/providers?id=eq.{}", provider_id);
        let _: Vec<Value> = self
            .request(
                Method::PATCH,
                &touch_path,
                Some(json!({ "updated_at": Utc::now().to_rfc3339() })),
                true,
            )
            .await?;

        Ok(Provider { schedule: entries, ..provider })
    }

    async fn find_provider_with_schedule(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<Provider>, StoreError> {
        let path = format!(
            "/providers?id=eq.{}&select=*,weekly_schedules(*)",
            provider_id
        );
        let rows: Vec<ProviderRow> = self.request(Method::GET, &path, None, false).await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(Provider::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn find_booked_intervals(
        &self,
        provider_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BookedInterval>, StoreError> {
        // Overlap-inclusive: any appointment with start < range_end and
        // end > range_start. RFC3339 timestamps are URL-encoded for PostgREST.
        let path = format!(
            "/appointments?provider_id=eq.{}&status=neq.cancelled&start_time=lt.{}&end_time=gt.{}&select=start_time,end_time&order=start_time.asc",
            provider_id,
            urlencoding::encode(&range_end.to_rfc3339()),
            urlencoding::encode(&range_start.to_rfc3339()),
        );

        let rows: Vec<IntervalRow> = self.request(Method::GET, &path, None, false).await?;
        Ok(rows
            .into_iter()
            .map(|row| BookedInterval { start: row.start_time, end: row.end_time })
            .collect())
    }

    async fn create_appointment(
        &self,
        patient_id: Uuid,
        provider_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let now = Utc::now();
        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "provider_id": provider_id,
            "start_time": start_time.to_rfc3339(),
            "end_time": end_time.to_rfc3339(),
            "status": AppointmentStatus::Confirmed.to_string(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        self.request_one(Method::POST, "/appointments", Some(appointment_data))
            .await
    }

    async fn update_appointment_time(
        &self,
        appointment_id: Uuid,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let path = format!("/appointments?id=eq.{}", appointment_id);
        let update_data = json!({
            "start_time": new_start.to_rfc3339(),
            "end_time": new_end.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        self.request_one(Method::PATCH, &path, Some(update_data)).await
    }

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let path = format!("/appointments?id=eq.{}", appointment_id);
        let update_data = json!({
            "status": status.to_string(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        self.request_one(Method::PATCH, &path, Some(update_data)).await
    }

    async fn find_appointment_by_id(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Appointment>, StoreError> {
        let path = format!("/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self.request(Method::GET, &path, None, false).await?;
        Ok(rows.into_iter().next())
    }
}

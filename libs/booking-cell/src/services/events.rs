// libs/booking-cell/src/services/events.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::info;
use uuid::Uuid;

use shared_models::Appointment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Confirmed,
    Cancelled,
    Rescheduled,
}

impl fmt::Display for BookingEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingEventKind::Confirmed => write!(f, "confirmed"),
            BookingEventKind::Cancelled => write!(f, "cancelled"),
            BookingEventKind::Rescheduled => write!(f, "rescheduled"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub appointment_id: Uuid,
    pub provider_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl BookingEvent {
    fn from_appointment(kind: BookingEventKind, appointment: &Appointment) -> Self {
        Self {
            kind,
            appointment_id: appointment.id,
            provider_id: appointment.provider_id,
            patient_id: appointment.patient_id,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            previous_start_time: None,
            reason: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn confirmed(appointment: &Appointment) -> Self {
        Self::from_appointment(BookingEventKind::Confirmed, appointment)
    }

    pub fn cancelled(appointment: &Appointment, reason: Option<String>) -> Self {
        Self {
            reason,
            ..Self::from_appointment(BookingEventKind::Cancelled, appointment)
        }
    }

    pub fn rescheduled(appointment: &Appointment, previous_start: DateTime<Utc>) -> Self {
        Self {
            previous_start_time: Some(previous_start),
            ..Self::from_appointment(BookingEventKind::Rescheduled, appointment)
        }
    }
}

/// Downstream notification sink. Failures are the caller's to log; they never
/// roll back a committed booking decision.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &BookingEvent) -> anyhow::Result<()>;
}

/// Publisher that emits events to the log stream only.
#[derive(Default)]
pub struct TracingPublisher;

#[async_trait]
impl EventPublisher for TracingPublisher {
    async fn publish(&self, event: &BookingEvent) -> anyhow::Result<()> {
        info!(
            "Booking event {} for appointment {}: {}",
            event.kind,
            event.appointment_id,
            serde_json::to_string(event)?
        );
        Ok(())
    }
}

/// Webhook publisher when an endpoint is configured, log-only otherwise.
pub fn publisher_from_config(config: &shared_config::AppConfig) -> std::sync::Arc<dyn EventPublisher> {
    match &config.event_webhook_url {
        Some(url) => std::sync::Arc::new(WebhookPublisher::new(url.clone())),
        None => std::sync::Arc::new(TracingPublisher),
    }
}

/// Publisher that POSTs each event as JSON to a configured webhook.
pub struct WebhookPublisher {
    client: reqwest::Client,
    url: String,
}

impl WebhookPublisher {
    pub fn new(url: String) -> Self {
        Self { client: reqwest::Client::new(), url }
    }
}

#[async_trait]
impl EventPublisher for WebhookPublisher {
    async fn publish(&self, event: &BookingEvent) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

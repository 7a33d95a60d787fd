// libs/booking-cell/tests/events_test.rs
use chrono::{TimeZone, Utc};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::{BookingEvent, EventPublisher, WebhookPublisher};
use shared_models::{Appointment, AppointmentStatus};

fn appointment() -> Appointment {
    let start = Utc.with_ymd_and_hms(2025, 6, 16, 8, 0, 0).unwrap();
    let now = Utc::now();
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        start_time: start,
        end_time: start + chrono::Duration::minutes(30),
        status: AppointmentStatus::Confirmed,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn webhook_receives_confirmed_event_as_json() {
    let server = MockServer::start().await;
    let appointment = appointment();

    Mock::given(method("POST"))
        .and(path("/events"))
        .and(body_partial_json(serde_json::json!({
            "kind": "confirmed",
            "appointment_id": appointment.id,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let publisher = WebhookPublisher::new(format!("{}/events", server.uri()));
    let result = publisher.publish(&BookingEvent::confirmed(&appointment)).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn webhook_error_status_surfaces_as_publish_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let publisher = WebhookPublisher::new(format!("{}/events", server.uri()));
    let result = publisher.publish(&BookingEvent::confirmed(&appointment())).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn rescheduled_event_carries_both_instants() {
    let appointment = appointment();
    let previous = appointment.start_time - chrono::Duration::hours(1);

    let event = BookingEvent::rescheduled(&appointment, previous);
    let body = serde_json::to_value(&event).unwrap();

    assert_eq!(body["kind"], "rescheduled");
    assert_eq!(
        body["previous_start_time"],
        serde_json::to_value(previous).unwrap()
    );
    assert_eq!(body["start_time"], serde_json::to_value(appointment.start_time).unwrap());
}

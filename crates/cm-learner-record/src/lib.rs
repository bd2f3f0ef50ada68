//! Learner-record client.
//!
//! The learner-record service tracks who has booked onto face-to-face
//! events. The course manager views an event's bookings and confirms or
//! cancels them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use cm_common::{Credentials, RestClient, TransportError};
use cm_config::BackendConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearnerRecordError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode learner-record payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LearnerRecordError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Requested,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: u64,

    /// Learner identifier as reported by the learner-record service.
    pub learner: String,

    #[serde(default)]
    pub learner_email: String,

    pub status: BookingStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

pub struct LearnerRecord {
    rest: RestClient,
}

impl LearnerRecord {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            rest: RestClient::new(
                config.url.clone(),
                Duration::from_millis(config.timeout_ms),
                Credentials::None,
            ),
        }
    }

    /// Every booking taken against one event.
    pub async fn event_bookings(&self, token: &str, event_id: &str) -> Result<Vec<Booking>> {
        let raw = self
            .rest
            .with_bearer(token)
            .get(&format!("/event/{event_id}/booking"))
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Update one booking's status (confirm or cancel).
    pub async fn update_booking(
        &self,
        token: &str,
        event_id: &str,
        booking_id: u64,
        status: BookingStatus,
        cancellation_reason: Option<&str>,
    ) -> Result<()> {
        self.rest
            .with_bearer(token)
            .patch(
                &format!("/event/{event_id}/booking/{booking_id}"),
                &json!({
                    "status": status,
                    "cancellationReason": cancellation_reason,
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn bookings_deserialize_from_the_event_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/event/ev1/booking"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 7,
                "learner": "learner-id",
                "learnerEmail": "learner@example.gov.uk",
                "status": "Requested"
            }])))
            .mount(&server)
            .await;

        let record = LearnerRecord::new(&BackendConfig {
            url: server.uri(),
            timeout_ms: 5_000,
        });

        let bookings = record.event_bookings("tok", "ev1").await.unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].status, BookingStatus::Requested);
    }

    #[tokio::test]
    async fn booking_update_patches_the_status() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(url_path("/event/ev1/booking/7"))
            .and(body_json(json!({
                "status": "Cancelled",
                "cancellationReason": "Course withdrawn"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let record = LearnerRecord::new(&BackendConfig {
            url: server.uri(),
            timeout_ms: 5_000,
        });

        record
            .update_booking("tok", "ev1", 7, BookingStatus::Cancelled, Some("Course withdrawn"))
            .await
            .unwrap();
    }
}

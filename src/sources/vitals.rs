//! Vitals source: readings from the remote vitals HTTP service.
//!
//! `GET {base_url}/{patient_id}` returns every reading for the patient;
//! the window is applied here, closed on both ends.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::{EventSource, SourceError};
use crate::timeline::{parse_timestamp, DataSource, EventKind, Payload, TimelineEvent};

const ORIGIN: DataSource = DataSource::Vitals;

/// One reading as served by the vitals service.
#[derive(Debug, Deserialize)]
struct VitalsReading {
    #[serde(default)]
    bpm: Option<Value>,
    #[serde(default)]
    bp: Option<Value>,
    timestamp: String,
}

/// HTTP client for the vitals service.
pub struct VitalsSource {
    base_url: String,
    client: reqwest::Client,
}

impl VitalsSource {
    /// Create a client for `base_url` (e.g. `http://mock-vitals:3001/vitals`).
    /// `timeout` bounds each whole request.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::unavailable(ORIGIN, format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn classify(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout { origin: ORIGIN }
        } else if err.is_connect() {
            SourceError::unavailable(ORIGIN, format!("cannot connect to {}", self.base_url))
        } else if err.is_decode() {
            SourceError::malformed(ORIGIN, err)
        } else {
            SourceError::unavailable(ORIGIN, err)
        }
    }
}

#[async_trait]
impl EventSource for VitalsSource {
    fn origin(&self) -> DataSource {
        ORIGIN
    }

    async fn fetch(
        &self,
        patient_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimelineEvent>, SourceError> {
        let url = format!("{}/{patient_id}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::unavailable(
                ORIGIN,
                format!("vitals service answered {}", status.as_u16()),
            ));
        }

        let readings: Vec<VitalsReading> = response.json().await.map_err(|e| self.classify(e))?;

        let mut events = Vec::with_capacity(readings.len());
        for reading in readings {
            let taken = parse_instant(&reading.timestamp)?;
            if taken < start || taken > end {
                continue;
            }

            let mut payload = Payload::new();
            payload.insert("bpm".into(), reading.bpm.unwrap_or(Value::Null));
            payload.insert("bp".into(), reading.bp.unwrap_or(Value::Null));

            events.push(TimelineEvent::point(
                taken.timestamp().to_string(),
                EventKind::Vitals,
                ORIGIN,
                patient_id,
                taken,
                payload,
            ));
        }

        Ok(events)
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, SourceError> {
    parse_timestamp(raw)
        .ok_or_else(|| SourceError::malformed(ORIGIN, format!("bad timestamp {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::TimeZone;
    use serde_json::json;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    async fn readings(Path(patient_id): Path<i64>) -> Json<Value> {
        if patient_id != 42 {
            return Json(json!([]));
        }
        Json(json!([
            { "bpm": 72, "bp": "120/80", "timestamp": "2024-01-15T10:00:00Z" },
            { "bpm": 65, "bp": "110/70", "timestamp": "2024-01-15T09:59:00Z" },
            { "bpm": 68, "bp": "115/75", "timestamp": "2024-01-15T12:00:00+00:00" },
            { "bpm": 70, "timestamp": "2024-01-15T12:01:00Z" }
        ]))
    }

    async fn mock_vitals_service() -> String {
        let app = Router::new()
            .route("/vitals/:patient_id", get(readings))
            .route(
                "/broken/:patient_id",
                get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            )
            .route("/garbage/:patient_id", get(|| async { "not json" }))
            .route(
                "/naive/:patient_id",
                get(|| async {
                    Json(json!([
                        { "bpm": 80, "bp": "125/85", "timestamp": "2024-01-15T10:30:00" },
                        { "bpm": 81, "bp": "126/86", "timestamp": "2024-01-15T10:45:00.250" }
                    ]))
                }),
            )
            .route(
                "/bad-time/:patient_id",
                get(|| async { Json(json!([{ "bpm": 1, "timestamp": "yesterday" }])) }),
            )
            .route(
                "/slow/:patient_id",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!([]))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn source(base: &str, path: &str) -> VitalsSource {
        VitalsSource::new(&format!("{base}/{path}"), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn keeps_readings_inside_closed_window() {
        let base = mock_vitals_service().await;
        let events = source(&base, "vitals/")
            .fetch(42, at(10, 0), at(12, 0))
            .await
            .unwrap();

        let times: Vec<DateTime<Utc>> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![at(10, 0), at(12, 0)]);

        let first = &events[0];
        assert_eq!(first.kind, EventKind::Vitals);
        assert_eq!(first.origin, DataSource::Vitals);
        assert_eq!(first.patient_id, 42);
        assert_eq!(first.id, at(10, 0).timestamp().to_string());
        assert_eq!(first.payload["bpm"], 72);
        assert_eq!(first.payload["bp"], "120/80");
    }

    #[tokio::test]
    async fn missing_fields_become_null() {
        let base = mock_vitals_service().await;
        let events = source(&base, "vitals")
            .fetch(42, at(12, 1), at(12, 1))
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["bp"], Value::Null);
    }

    #[tokio::test]
    async fn error_status_is_unavailable() {
        let base = mock_vitals_service().await;
        let err = source(&base, "broken")
            .fetch(42, at(0, 0), at(23, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let base = mock_vitals_service().await;
        let err = source(&base, "garbage")
            .fetch(42, at(0, 0), at(23, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[tokio::test]
    async fn unparseable_timestamp_is_malformed() {
        let base = mock_vitals_service().await;
        let err = source(&base, "bad-time")
            .fetch(42, at(0, 0), at(23, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[tokio::test]
    async fn naive_timestamps_are_read_as_utc() {
        let base = mock_vitals_service().await;
        let events = source(&base, "naive")
            .fetch(42, at(10, 0), at(12, 0))
            .await
            .unwrap();

        let times: Vec<DateTime<Utc>> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(
            times,
            vec![
                at(10, 30),
                at(10, 45) + chrono::Duration::milliseconds(250)
            ]
        );
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let base = mock_vitals_service().await;
        let slow = VitalsSource::new(&format!("{base}/slow"), Duration::from_millis(100)).unwrap();

        let err = slow.fetch(42, at(0, 0), at(23, 0)).await.unwrap_err();
        assert!(matches!(err, SourceError::Timeout { .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = VitalsSource::new(&format!("http://{addr}/vitals"), Duration::from_secs(2))
            .unwrap()
            .fetch(42, at(0, 0), at(23, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }
}

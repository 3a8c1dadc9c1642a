//! Timeline endpoint.
//!
//! `GET /api/timeline?patientId=&from=&to=[&types=]` with `X-User-Role`.
//! Answers `206 Partial Content` when a source could not contribute.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerRole};
use crate::authorization::retain_visible;
use crate::timeline::{parse_timestamp, EventKind, TimelineData};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineQuery {
    pub patient_id: i64,
    pub from: String,
    pub to: String,
    /// Comma-separated event kinds to keep, e.g. `surgery,vitals`.
    pub types: Option<String>,
}

/// `GET /api/timeline`: role-filtered timeline for one patient.
pub async fn get_timeline(
    State(ctx): State<ApiContext>,
    Extension(role): Extension<CallerRole>,
    query: Result<Query<TimelineQuery>, QueryRejection>,
) -> Result<(StatusCode, Json<TimelineData>), ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if query.patient_id <= 0 {
        return Err(ApiError::BadRequest("patientId must be positive".into()));
    }
    let from = parse_instant("from", &query.from)?;
    let to = parse_instant("to", &query.to)?;
    let kinds = query.types.as_deref().map(parse_kinds).transpose()?;

    // A panic during assembly becomes a 500
    let engine = ctx.engine.clone();
    let patient_id = query.patient_id;
    let mut data = tokio::spawn(async move {
        engine
            .get_patient_timeline(patient_id, from, to, &role.0)
            .await
    })
    .await
    .map_err(|e| ApiError::Internal(format!("timeline assembly failed: {e}")))??;

    if let Some(kinds) = kinds {
        data = retain_visible(&data, |event| kinds.contains(&event.kind));
    }

    let status = if data.partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    Ok((status, Json(data)))
}

fn parse_instant(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    parse_timestamp(raw)
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is not a valid datetime: {raw:?}")))
}

fn parse_kinds(raw: &str) -> Result<Vec<EventKind>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            EventKind::from_str(s)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown event type: {s}")))
        })
        .collect()
}

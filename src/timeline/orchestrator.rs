use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;

use super::types::*;
use crate::sources::{EventSource, SourceError};

/// Everything the sources returned for one request, split by shape.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Events carrying a `[start, end]` interval.
    pub episodes: Vec<TimelineEvent>,
    /// Single-instant events, in source order then record order.
    pub points: Vec<TimelineEvent>,
    /// Sources that failed and contributed nothing.
    pub failed: Vec<DataSource>,
}

impl FetchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Queries every source concurrently over the same window and waits for all
/// of them. A failing source contributes zero events and is recorded in
/// `failed`; it never cancels or fails the others.
///
/// Each fetch runs in its own task, so a source that panics is reported as
/// unavailable instead of taking the request down with it.
pub async fn fetch_all_sources(
    sources: &[Arc<dyn EventSource>],
    patient_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> FetchOutcome {
    let fetches = sources.iter().map(|source| {
        let origin = source.origin();
        let source = Arc::clone(source);
        let task = tokio::spawn(async move { source.fetch(patient_id, start, end).await });

        async move {
            let result = match task.await {
                Ok(fetched) => {
                    fetched.and_then(|events| validate_batch(origin, patient_id, events))
                }
                Err(e) => Err(SourceError::unavailable(
                    origin,
                    format!("fetch task failed: {e}"),
                )),
            };
            (origin, result)
        }
    });

    let mut outcome = FetchOutcome::default();

    for (origin, result) in join_all(fetches).await {
        match result {
            Ok(events) => {
                for event in events {
                    if event.is_episode() {
                        outcome.episodes.push(event);
                    } else {
                        outcome.points.push(event);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(source = %origin, error = %err, patient_id, "Source failed, timeline will be partial");
                outcome.failed.push(origin);
            }
        }
    }

    tracing::debug!(
        patient_id,
        episodes = outcome.episodes.len(),
        points = outcome.points.len(),
        failed = outcome.failed.len(),
        "Sources fetched"
    );

    outcome
}

/// Rejects a batch that breaks the event model. One bad record
/// fails the whole source, never part of it.
fn validate_batch(
    origin: DataSource,
    patient_id: i64,
    events: Vec<TimelineEvent>,
) -> Result<Vec<TimelineEvent>, SourceError> {
    for event in &events {
        if let Some(reason) = model_violation(event, patient_id) {
            return Err(SourceError::malformed(
                origin,
                format!("event {}: {reason}", event.id),
            ));
        }
    }
    Ok(events)
}

fn model_violation(event: &TimelineEvent, patient_id: i64) -> Option<String> {
    if event.patient_id != patient_id {
        return Some(format!(
            "belongs to patient {} not {patient_id}",
            event.patient_id
        ));
    }
    if !event.children.is_empty() {
        return Some("arrived with children".into());
    }

    match (event.kind.is_episode(), event.start, event.end) {
        (true, Some(start), Some(end)) => {
            if start > end {
                Some("starts after it ends".into())
            } else if event.timestamp != start {
                Some("episode timestamp differs from start".into())
            } else {
                None
            }
        }
        (true, _, _) => Some(format!("{} without a complete interval", event.kind)),
        (false, None, None) => None,
        (false, _, _) => Some(format!("{} carries an interval", event.kind)),
    }
}

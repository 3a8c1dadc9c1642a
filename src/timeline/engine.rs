use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::merge::attach_points;
use super::orchestrator::{fetch_all_sources, FetchOutcome};
use super::sequence::sequence_episodes;
use super::types::*;
use crate::authorization::{filter_for_role, Role};
use crate::sources::EventSource;

/// Failures that cross the engine boundary. Source failures never do:
/// they surface as `TimelineData::partial`.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Start of range {from} is after end of range {to}")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

/// Aggregation engine: holds the injected sources and nothing else, so one
/// instance can serve any number of concurrent requests.
#[derive(Clone)]
pub struct TimelineEngine {
    sources: Vec<Arc<dyn EventSource>>,
}

impl TimelineEngine {
    pub fn new(sources: Vec<Arc<dyn EventSource>>) -> Self {
        Self { sources }
    }

    /// The role-filtered timeline for `patient_id` over `[from, to]`.
    pub async fn get_patient_timeline(
        &self,
        patient_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        role: &str,
    ) -> Result<TimelineData, TimelineError> {
        let role = Role::parse(role);
        let data = self.assemble(patient_id, from, to).await?;
        Ok(filter_for_role(&data, role))
    }

    /// The unfiltered timeline: fetch, merge, sequence.
    pub async fn assemble(
        &self,
        patient_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<TimelineData, TimelineError> {
        if from > to {
            tracing::debug!(patient_id, %from, %to, "Rejected inverted range");
            return Err(TimelineError::InvalidRange { from, to });
        }

        let outcome = fetch_all_sources(&self.sources, patient_id, from, to).await;
        Ok(build_timeline(outcome))
    }
}

/// Merge and sequence already-fetched events. Pure: the same outcome always
/// yields the same timeline.
pub fn build_timeline(outcome: FetchOutcome) -> TimelineData {
    let partial = outcome.is_partial();
    let merged = attach_points(outcome.episodes, outcome.points);

    let mut episodes = merged.episodes;
    sequence_episodes(&mut episodes);

    TimelineData {
        episodes,
        standalone: merged.standalone,
        partial,
        unavailable_sources: outcome.failed,
    }
}

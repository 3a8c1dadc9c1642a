//! Source ports: the record systems a timeline is assembled from.
//!
//! Each source returns the events of one patient inside a closed time window,
//! or a single classified [`SourceError`]. Sources never share mutable state,
//! so the orchestrator can query all of them at once.

mod imaging;
mod registry;
mod vitals;

pub use imaging::ImagingSource;
pub use registry::RegistrySource;
pub use vitals::VitalsSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::timeline::{DataSource, TimelineEvent};

/// Driven port implemented by every record source.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Which system this source reads from.
    fn origin(&self) -> DataSource;

    /// Events for `patient_id` anchored inside `[start, end]`.
    async fn fetch(
        &self,
        patient_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimelineEvent>, SourceError>;
}

/// Classified failure of a single source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{origin} unavailable: {reason}")]
    Unavailable { origin: DataSource, reason: String },
    #[error("{origin} timed out")]
    Timeout { origin: DataSource },
    #[error("{origin} returned malformed data: {reason}")]
    Malformed { origin: DataSource, reason: String },
}

impl SourceError {
    pub fn origin(&self) -> DataSource {
        match self {
            SourceError::Unavailable { origin, .. }
            | SourceError::Timeout { origin }
            | SourceError::Malformed { origin, .. } => *origin,
        }
    }

    pub(crate) fn unavailable(origin: DataSource, reason: impl ToString) -> Self {
        SourceError::Unavailable {
            origin,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(origin: DataSource, reason: impl ToString) -> Self {
        SourceError::Malformed {
            origin,
            reason: reason.to_string(),
        }
    }
}

/// Convert a stored millisecond timestamp, rejecting out-of-range values.
pub(crate) fn instant_from_millis(
    origin: DataSource,
    millis: i64,
) -> Result<DateTime<Utc>, SourceError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| SourceError::malformed(origin, format!("timestamp out of range: {millis}")))
}

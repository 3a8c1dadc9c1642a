//! Fixtures shared by the timeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use super::types::*;
use crate::sources::{EventSource, SourceError};

pub const PATIENT: i64 = 42;

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
}

pub fn episode(id: &str, kind: EventKind, start: DateTime<Utc>, end: DateTime<Utc>) -> TimelineEvent {
    TimelineEvent::episode(id, kind, DataSource::Registry, PATIENT, start, end, Payload::new())
}

pub fn point(id: &str, kind: EventKind, timestamp: DateTime<Utc>) -> TimelineEvent {
    let origin = match kind {
        EventKind::Imaging => DataSource::Pacs,
        _ => DataSource::Vitals,
    };
    TimelineEvent::point(id, kind, origin, PATIENT, timestamp, Payload::new())
}

pub fn ids(events: &[TimelineEvent]) -> Vec<&str> {
    events.iter().map(|e| e.id.as_str()).collect()
}

enum Behavior {
    Succeed(Vec<TimelineEvent>),
    Fail,
    Sleep(Duration),
    Panic,
}

/// In-process source that records how often it was called.
pub struct StubSource {
    origin: DataSource,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn ok(origin: DataSource, events: Vec<TimelineEvent>) -> Arc<Self> {
        Self::with(origin, Behavior::Succeed(events))
    }

    pub fn failing(origin: DataSource) -> Arc<Self> {
        Self::with(origin, Behavior::Fail)
    }

    pub fn slow(origin: DataSource, delay: Duration) -> Arc<Self> {
        Self::with(origin, Behavior::Sleep(delay))
    }

    pub fn panicking(origin: DataSource) -> Arc<Self> {
        Self::with(origin, Behavior::Panic)
    }

    fn with(origin: DataSource, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            origin,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for StubSource {
    fn origin(&self) -> DataSource {
        self.origin
    }

    async fn fetch(
        &self,
        _patient_id: i64,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<TimelineEvent>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(events) => Ok(events.clone()),
            Behavior::Fail => Err(SourceError::unavailable(self.origin, "connection refused")),
            Behavior::Sleep(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Vec::new())
            }
            Behavior::Panic => panic!("stub source defect"),
        }
    }
}

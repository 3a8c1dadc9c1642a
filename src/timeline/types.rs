use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category-specific attributes carried by an event.
pub type Payload = Map<String, Value>;

/// A single event on the timeline, normalized from any source.
///
/// Episode events carry both `start` and `end` and may own `children`.
/// Point events carry neither and never own children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "source")]
    pub origin: DataSource,
    pub timestamp: DateTime<Utc>,
    pub patient_id: i64,
    #[serde(rename = "data")]
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub children: Vec<TimelineEvent>,
}

impl TimelineEvent {
    /// Build an episode anchored at `start`.
    pub fn episode(
        id: impl Into<String>,
        kind: EventKind,
        origin: DataSource,
        patient_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        payload: Payload,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            origin,
            timestamp: start,
            patient_id,
            payload,
            start: Some(start),
            end: Some(end),
            children: Vec::new(),
        }
    }

    /// Build a point event at `timestamp`.
    pub fn point(
        id: impl Into<String>,
        kind: EventKind,
        origin: DataSource,
        patient_id: i64,
        timestamp: DateTime<Utc>,
        payload: Payload,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            origin,
            timestamp,
            patient_id,
            payload,
            start: None,
            end: None,
            children: Vec::new(),
        }
    }

    /// The `[start, end]` interval, if this event carries one.
    pub fn interval(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Copy of this event with no children attached.
    pub fn clone_without_children(&self) -> Self {
        Self {
            id: self.id.clone(),
            kind: self.kind,
            origin: self.origin,
            timestamp: self.timestamp,
            patient_id: self.patient_id,
            payload: self.payload.clone(),
            start: self.start,
            end: self.end,
            children: Vec::new(),
        }
    }

    pub fn is_episode(&self) -> bool {
        self.interval().is_some()
    }

    /// Inclusive on both ends.
    pub fn encloses(&self, instant: DateTime<Utc>) -> bool {
        self.interval()
            .is_some_and(|(start, end)| start <= instant && instant <= end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Surgery,
    EmergencyRoom,
    Vitals,
    Imaging,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Surgery,
        EventKind::EmergencyRoom,
        EventKind::Vitals,
        EventKind::Imaging,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Surgery => "surgery",
            EventKind::EmergencyRoom => "emergency_room",
            EventKind::Vitals => "vitals",
            EventKind::Imaging => "imaging",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "surgery" => Some(EventKind::Surgery),
            "emergency_room" => Some(EventKind::EmergencyRoom),
            "vitals" => Some(EventKind::Vitals),
            "imaging" => Some(EventKind::Imaging),
            _ => None,
        }
    }

    /// Episode kinds carry an interval and may own point events.
    pub fn is_episode(self) -> bool {
        match self {
            EventKind::Surgery | EventKind::EmergencyRoom => true,
            EventKind::Vitals | EventKind::Imaging => false,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which system produced an event. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Registry,
    Pacs,
    Vitals,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::Registry => "registry",
            DataSource::Pacs => "pacs",
            DataSource::Vitals => "vitals",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete timeline for one patient and window: single response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineData {
    /// Most recent episode first.
    pub episodes: Vec<TimelineEvent>,
    /// Points enclosed by no episode, in source-fetch order.
    pub standalone: Vec<TimelineEvent>,
    /// At least one source failed to contribute.
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_sources: Vec<DataSource>,
}

/// Parse an ISO-8601 instant: RFC 3339 with an offset, or a naive
/// datetime/date taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc());
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

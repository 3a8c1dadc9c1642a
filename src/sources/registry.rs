//! Registry source: surgeries and emergency-room stays from the relational store.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;

use super::{instant_from_millis, EventSource, SourceError};
use crate::db::{self, DatabaseError};
use crate::timeline::{DataSource, EventKind, Payload, TimelineEvent};

const ORIGIN: DataSource = DataSource::Registry;

/// Episodes whose start lies inside the window, both tables in one pass.
const EPISODES_SQL: &str = "
    SELECT id, 'surgery' AS kind, start_ms, end_ms,
           surgeon_name AS first_field, procedure AS second_field
    FROM surgeries
    WHERE patient_id = ?1 AND start_ms BETWEEN ?2 AND ?3
    UNION ALL
    SELECT id, 'emergency_room' AS kind, start_ms, end_ms,
           attending_physician AS first_field, chief_complaint AS second_field
    FROM emergency_rooms
    WHERE patient_id = ?1 AND start_ms BETWEEN ?2 AND ?3";

/// Reads episode events from a SQLite registry file.
///
/// A read-only connection is opened per fetch on the blocking pool, so the
/// source holds no handle between requests. The store must already exist.
pub struct RegistrySource {
    db_path: PathBuf,
}

impl RegistrySource {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

#[async_trait]
impl EventSource for RegistrySource {
    fn origin(&self) -> DataSource {
        ORIGIN
    }

    async fn fetch(
        &self,
        patient_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimelineEvent>, SourceError> {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn =
                db::open_read_only(&path).map_err(|e| SourceError::unavailable(ORIGIN, e))?;
            query_episodes(&conn, patient_id, start, end)
        })
        .await
        .map_err(|e| SourceError::unavailable(ORIGIN, format!("registry task failed: {e}")))?
    }
}

struct EpisodeRow {
    id: i64,
    kind: String,
    start_ms: i64,
    end_ms: i64,
    first_field: Option<String>,
    second_field: Option<String>,
}

fn query_episodes(
    conn: &Connection,
    patient_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<TimelineEvent>, SourceError> {
    let rows = read_rows(conn, patient_id, start, end)
        .map_err(|e| SourceError::unavailable(ORIGIN, e))?;

    rows.into_iter()
        .map(|row| row_to_event(row, patient_id))
        .collect()
}

fn read_rows(
    conn: &Connection,
    patient_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<EpisodeRow>, DatabaseError> {
    let mut stmt = conn.prepare(EPISODES_SQL)?;
    let rows = stmt.query_map(
        params![patient_id, start.timestamp_millis(), end.timestamp_millis()],
        |row| {
            Ok(EpisodeRow {
                id: row.get("id")?,
                kind: row.get("kind")?,
                start_ms: row.get("start_ms")?,
                end_ms: row.get("end_ms")?,
                first_field: row.get("first_field")?,
                second_field: row.get("second_field")?,
            })
        },
    )?;

    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

fn row_to_event(row: EpisodeRow, patient_id: i64) -> Result<TimelineEvent, SourceError> {
    let kind = EventKind::from_str(&row.kind)
        .ok_or_else(|| SourceError::malformed(ORIGIN, format!("unknown kind {}", row.kind)))?;

    let (first_key, second_key) = match kind {
        EventKind::Surgery => ("surgeonName", "procedure"),
        EventKind::EmergencyRoom => ("attendingPhysician", "chiefComplaint"),
        EventKind::Vitals | EventKind::Imaging => {
            return Err(SourceError::malformed(
                ORIGIN,
                format!("{kind} is not an episode kind"),
            ))
        }
    };

    let mut payload = Payload::new();
    payload.insert(first_key.into(), optional_text(row.first_field));
    payload.insert(second_key.into(), optional_text(row.second_field));

    Ok(TimelineEvent::episode(
        format!("{}-{}", kind, row.id),
        kind,
        ORIGIN,
        patient_id,
        instant_from_millis(ORIGIN, row.start_ms)?,
        instant_from_millis(ORIGIN, row.end_ms)?,
        payload,
    ))
}

fn optional_text(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

//! Imaging source: PACS studies kept as JSON documents.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;

use super::{instant_from_millis, EventSource, SourceError};
use crate::db::{self, DatabaseError};
use crate::timeline::{DataSource, EventKind, Payload, TimelineEvent};

const ORIGIN: DataSource = DataSource::Pacs;

/// Document keys surfaced on the timeline. Everything else stays in the store.
const SURFACED_KEYS: &[&str] = &["modality", "radiologistNote"];

/// Reads imaging studies from a SQLite-backed document collection.
pub struct ImagingSource {
    db_path: PathBuf,
}

impl ImagingSource {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

#[async_trait]
impl EventSource for ImagingSource {
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
            query_studies(&conn, patient_id, start, end)
        })
        .await
        .map_err(|e| SourceError::unavailable(ORIGIN, format!("imaging task failed: {e}")))?
    }
}

fn query_studies(
    conn: &Connection,
    patient_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<TimelineEvent>, SourceError> {
    let rows = read_documents(conn, patient_id, start, end)
        .map_err(|e| SourceError::unavailable(ORIGIN, e))?;

    rows.into_iter()
        .map(|(id, taken_ms, document)| {
            let payload = surface_document(&id, &document)?;
            Ok(TimelineEvent::point(
                id,
                EventKind::Imaging,
                ORIGIN,
                patient_id,
                instant_from_millis(ORIGIN, taken_ms)?,
                payload,
            ))
        })
        .collect()
}

fn read_documents(
    conn: &Connection,
    patient_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<(String, i64, String)>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, taken_ms, document
         FROM imaging_studies
         WHERE patient_id = ?1 AND taken_ms BETWEEN ?2 AND ?3
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map(
        params![patient_id, start.timestamp_millis(), end.timestamp_millis()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Decode a stored study and keep only the surfaced keys.
fn surface_document(id: &str, raw: &str) -> Result<Payload, SourceError> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|e| SourceError::malformed(ORIGIN, format!("study {id}: {e}")))?;

    let Value::Object(fields) = document else {
        return Err(SourceError::malformed(
            ORIGIN,
            format!("study {id} is not a JSON object"),
        ));
    };

    Ok(SURFACED_KEYS
        .iter()
        .map(|key| {
            let value = fields.get(*key).cloned().unwrap_or(Value::Null);
            (key.to_string(), value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    fn insert_study(conn: &Connection, id: &str, patient_id: i64, taken: DateTime<Utc>, doc: &str) {
        conn.execute(
            "INSERT INTO imaging_studies (id, patient_id, taken_ms, document) VALUES (?1, ?2, ?3, ?4)",
            params![id, patient_id, taken.timestamp_millis(), doc],
        )
        .unwrap();
    }

    fn setup() -> (tempfile::TempDir, PathBuf, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pacs.db");
        let conn = db::open_database(&path, Store::Imaging).unwrap();
        (dir, path, conn)
    }

    #[tokio::test]
    async fn returns_studies_in_window_as_points() {
        let (_dir, path, conn) = setup();
        insert_study(
            &conn,
            "img-1",
            42,
            at(10, 0),
            r#"{"modality":"CT","radiologistNote":"Pre-operative scan.","createdAt":"2024-01-15"}"#,
        );
        insert_study(&conn, "img-2", 42, at(14, 0), r#"{"modality":"MRI"}"#);
        insert_study(&conn, "img-3", 42, at(18, 0), r#"{"modality":"X-Ray"}"#);
        insert_study(&conn, "img-4", 7, at(10, 0), r#"{"modality":"CT"}"#);

        let source = ImagingSource::new(path);
        let events = source.fetch(42, at(10, 0), at(14, 0)).await.unwrap();

        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["img-1", "img-2"]);

        let first = &events[0];
        assert_eq!(first.kind, EventKind::Imaging);
        assert_eq!(first.origin, DataSource::Pacs);
        assert_eq!(first.timestamp, at(10, 0));
        assert!(first.interval().is_none());
        assert_eq!(first.payload["modality"], "CT");
        assert_eq!(first.payload["radiologistNote"], "Pre-operative scan.");
        assert!(!first.payload.contains_key("createdAt"));

        assert_eq!(events[1].payload["radiologistNote"], Value::Null);
    }

    #[tokio::test]
    async fn non_object_document_fails_whole_fetch() {
        let (_dir, path, conn) = setup();
        insert_study(&conn, "img-1", 42, at(10, 0), r#"{"modality":"CT"}"#);
        insert_study(&conn, "img-2", 42, at(11, 0), r#"["CT"]"#);

        let err = ImagingSource::new(path)
            .fetch(42, at(0, 0), at(23, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
        assert!(err.to_string().contains("img-2"));
    }

    #[tokio::test]
    async fn invalid_json_is_malformed() {
        let (_dir, path, conn) = setup();
        insert_study(&conn, "img-1", 42, at(10, 0), "{modality: CT");

        let err = ImagingSource::new(path)
            .fetch(42, at(0, 0), at(23, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[tokio::test]
    async fn missing_store_is_unavailable_and_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pacs.db");
        let source = ImagingSource::new(path.clone());

        let err = source.fetch(42, at(0, 0), at(23, 0)).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
        assert_eq!(err.origin(), DataSource::Pacs);
        assert!(!path.exists());
    }
}

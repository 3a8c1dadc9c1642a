use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use super::DatabaseError;

/// Which record store a SQLite file holds. Each store has its own migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Store {
    Registry,
    Imaging,
}

impl Store {
    fn migrations(self) -> &'static [(i64, &'static str)] {
        match self {
            Store::Registry => &[(
                1,
                include_str!("../../resources/migrations/registry/001_initial.sql"),
            )],
            Store::Imaging => &[(
                1,
                include_str!("../../resources/migrations/imaging/001_initial.sql"),
            )],
        }
    }
}

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path, store: Store) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn, store)?;
    Ok(conn)
}

/// Open an existing store for reading. Never creates the file and never
/// migrates: a missing or unprepared store is an error.
pub fn open_read_only(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
#[cfg(test)]
pub fn open_memory_database(store: Store) -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn, store)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection, store: Store) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    for &(version, sql) in store.migrations() {
        if version > current_version {
            tracing::info!(?store, "Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    #[test]
    fn registry_store_has_episode_tables() {
        let conn = open_memory_database(Store::Registry).unwrap();
        assert!(table_exists(&conn, "surgeries"));
        assert!(table_exists(&conn, "emergency_rooms"));
        assert!(!table_exists(&conn, "imaging_studies"));
    }

    #[test]
    fn imaging_store_has_document_table() {
        let conn = open_memory_database(Store::Imaging).unwrap();
        assert!(table_exists(&conn, "imaging_studies"));
        assert!(!table_exists(&conn, "surgeries"));
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database(Store::Registry).unwrap();
        assert_eq!(get_current_version(&conn), 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database(Store::Imaging).unwrap();
        // Second run is a no-op
        assert!(run_migrations(&conn, Store::Imaging).is_ok());
        assert_eq!(get_current_version(&conn), 1);
    }

    #[test]
    fn reopening_file_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");
        drop(open_database(&path, Store::Registry).unwrap());
        let conn = open_database(&path, Store::Registry).unwrap();
        assert_eq!(get_current_version(&conn), 1);
    }

    #[test]
    fn read_only_open_never_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(open_read_only(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn read_only_open_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");
        drop(open_database(&path, Store::Registry).unwrap());

        let conn = open_read_only(&path).unwrap();
        assert!(table_exists(&conn, "surgeries"));
        assert!(conn.execute("DELETE FROM surgeries", []).is_err());
    }
}

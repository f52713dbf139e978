use super::{ImportHistory, ImportMetadata};
use crate::error::Error;
use crate::hasher::{ContentIdentity, FileFingerprint};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

const SCHEMA_VERSION: i64 = 1;

/// Import history persisted in a SQLite database.
pub struct SqliteImportHistory {
    conn: Mutex<Connection>,
}

impl SqliteImportHistory {
    pub fn open(path: &str) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, Error> {
        configure_pragmas(&conn)?;
        migrate_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Remove every record. Returns the number of rows deleted.
    pub fn clear(&self) -> Result<usize, Error> {
        let rows = self.conn.lock().execute("DELETE FROM import_record", [])?;
        debug!("Import history cleared ({} rows)", rows);
        Ok(rows)
    }

    /// Total rows, counting the same identity once per recorded source.
    pub fn record_count(&self) -> Result<usize, Error> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM import_record", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn configure_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    debug!("SQLite pragmas configured (WAL mode)");
    Ok(())
}

/// A database written by a newer layout is refused rather than rewritten.
fn migrate_schema(conn: &Connection) -> Result<(), Error> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(Error::Other(format!(
            "import history schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }

    conn.execute_batch(include_str!("schema.sql"))?;
    debug!("SQLite schema initialized (version {})", SCHEMA_VERSION);
    Ok(())
}

fn lookup_error(e: rusqlite::Error) -> Error {
    Error::HistoryLookup(e.to_string())
}

impl ImportHistory for SqliteImportHistory {
    fn contains(&self, identity: &ContentIdentity) -> Result<bool, Error> {
        self.conn
            .lock()
            .query_row(
                "SELECT 1 FROM import_record WHERE identity = ?1 LIMIT 1",
                params![identity.to_string()],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(lookup_error)
    }

    fn record(&self, identity: &ContentIdentity, metadata: &ImportMetadata) -> Result<(), Error> {
        self.conn.lock().execute(
            "INSERT INTO import_record \
             (identity, source_path, modified_ns, file_size, imported_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                identity.to_string(),
                metadata.source_path.to_string_lossy().into_owned(),
                metadata.modified_ns,
                metadata.size as i64,
                metadata.imported_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn find_identity(&self, fingerprint: &FileFingerprint) -> Result<Option<ContentIdentity>, Error> {
        let identity: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT identity FROM import_record \
                 WHERE source_path = ?1 AND modified_ns = ?2 AND file_size = ?3 \
                 ORDER BY id DESC LIMIT 1",
                params![
                    fingerprint.path.to_string_lossy().into_owned(),
                    fingerprint.modified_ns,
                    fingerprint.size as i64,
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(lookup_error)?;

        identity
            .map(|text| text.parse::<ContentIdentity>())
            .transpose()
    }

    fn len(&self) -> Result<usize, Error> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(DISTINCT identity) FROM import_record",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

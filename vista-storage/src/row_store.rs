//! SQLite row store
//!
//! One row per identity pair. Each row holds the fingerprint, the views
//! document for that single entry, and the time of the last write. The
//! table is created on first save; until then every load is a miss.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, warn};

use vista_core::{
    ConfigError, Document, EntryFragment, IdentityPair, RowStoreConfig, StorageError,
    ValidationError, VistaError, VistaResult, PRIMARY_ATTR, SECONDARY_ATTR,
};

use crate::codec::{parse_document, write_document};
use crate::traits::{DocumentStore, SaveOutcome};

/// Longest identity string a row key accepts, in characters.
pub const MAX_KEY_LENGTH: usize = 255;

/// One stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub fingerprint: String,
    pub view_definitions: String,
    pub last_updated: DateTime<Utc>,
}

/// Row store on a SQLite database.
pub struct SqliteRowStore {
    conn: Mutex<Connection>,
    config: RowStoreConfig,
}

fn db_error(e: rusqlite::Error) -> VistaError {
    VistaError::Storage(StorageError::Database {
        reason: e.to_string(),
    })
}

impl SqliteRowStore {
    /// Open (or create) the database named by `config`.
    pub fn open(config: RowStoreConfig) -> VistaResult<Self> {
        config.validate()?;
        let conn = Connection::open(&config.database_path).map_err(|e| {
            VistaError::Storage(StorageError::Database {
                reason: format!(
                    "cannot open {}: {}",
                    config.database_path.display(),
                    e
                ),
            })
        })?;
        Self::from_connection(conn, config)
    }

    /// In-memory database, mostly for tests.
    pub fn in_memory() -> VistaResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Self::from_connection(conn, RowStoreConfig::new(":memory:"))
    }

    pub fn from_connection(conn: Connection, config: RowStoreConfig) -> VistaResult<Self> {
        config.validate()?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(db_error)?;
        ensure_schema_attached(&conn, &config.schema_name)?;
        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    pub fn config(&self) -> &RowStoreConfig {
        &self.config
    }

    pub fn database_path(&self) -> &Path {
        &self.config.database_path
    }

    fn connection(&self) -> VistaResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VistaError::Storage(StorageError::LockPoisoned))
    }

    fn qualified_table(&self) -> String {
        format!("\"{}\".\"{}\"", self.config.schema_name, self.config.table_name)
    }

    fn table_exists(&self, conn: &Connection) -> VistaResult<bool> {
        let sql = format!(
            "SELECT COUNT(1) FROM \"{}\".sqlite_master WHERE type = 'table' AND name = ?1",
            self.config.schema_name
        );
        let count: i64 = conn
            .query_row(&sql, params![self.config.table_name], |row| row.get(0))
            .map_err(db_error)?;
        Ok(count > 0)
    }

    fn create_table(&self, conn: &Connection) -> VistaResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                conceptual_container TEXT NOT NULL CHECK (length(conceptual_container) <= {max}),
                store_container TEXT NOT NULL CHECK (length(store_container) <= {max}),
                fingerprint TEXT NOT NULL,
                view_definitions TEXT NOT NULL,
                last_updated INTEGER NOT NULL,
                PRIMARY KEY (conceptual_container, store_container)
            )",
            table = self.qualified_table(),
            max = MAX_KEY_LENGTH,
        );
        conn.execute_batch(&sql).map_err(db_error)?;
        info!(table = %self.qualified_table(), "created view cache table");
        Ok(())
    }

    /// Point lookup of the row for `identity`. A missing table reads as no row.
    pub fn find_row(&self, identity: &IdentityPair) -> VistaResult<Option<StoredRow>> {
        let conn = self.connection()?;
        if !self.table_exists(&conn)? {
            return Ok(None);
        }

        let sql = format!(
            "SELECT fingerprint, view_definitions, last_updated FROM {}
             WHERE conceptual_container = ?1 AND store_container = ?2",
            self.qualified_table()
        );
        let row = conn
            .query_row(
                &sql,
                params![identity.primary(), identity.secondary()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(db_error)?;

        row.map(|(fingerprint, view_definitions, micros)| {
            let last_updated = DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
                VistaError::Storage(StorageError::Database {
                    reason: format!("invalid last_updated value {}", micros),
                })
            })?;
            Ok(StoredRow {
                fingerprint,
                view_definitions,
                last_updated,
            })
        })
        .transpose()
    }

    /// Number of stored rows; zero when the table does not exist yet.
    pub fn row_count(&self) -> VistaResult<usize> {
        let conn = self.connection()?;
        if !self.table_exists(&conn)? {
            return Ok(0);
        }
        let sql = format!("SELECT COUNT(1) FROM {}", self.qualified_table());
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(db_error)?;
        Ok(count as usize)
    }
}

/// The schema name must be one of the connection's attached databases.
fn ensure_schema_attached(conn: &Connection, schema_name: &str) -> VistaResult<()> {
    let mut stmt = conn.prepare("PRAGMA database_list").map_err(db_error)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;

    if names.iter().any(|name| name.eq_ignore_ascii_case(schema_name)) {
        return Ok(());
    }
    Err(VistaError::Config(ConfigError::InvalidValue {
        field: "schema_name".to_string(),
        value: schema_name.to_string(),
        reason: format!("no attached database with this name (attached: {})", names.join(", ")),
    }))
}

/// Identity of a fragment as row keys, checked against the key limit.
fn row_key(fragment: &EntryFragment) -> VistaResult<Option<(&str, &str)>> {
    let (primary, secondary) = match (
        fragment.attribute(PRIMARY_ATTR),
        fragment.attribute(SECONDARY_ATTR),
    ) {
        (Some(primary), Some(secondary)) => (primary, secondary),
        _ => return Ok(None),
    };
    for (field, value) in [("primary_id", primary), ("secondary_id", secondary)] {
        let length = value.chars().count();
        if length > MAX_KEY_LENGTH {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                length,
                limit: MAX_KEY_LENGTH,
            }
            .into());
        }
    }
    Ok(Some((primary, secondary)))
}

impl DocumentStore for SqliteRowStore {
    fn load(&self, identity: &IdentityPair) -> VistaResult<Option<Document>> {
        let row = match self.find_row(identity)? {
            Some(row) => row,
            None => return Ok(None),
        };

        match parse_document(&row.view_definitions) {
            Ok(document) => Ok(Some(document)),
            Err(e) => {
                warn!(
                    primary = identity.primary(),
                    secondary = identity.secondary(),
                    error = %e,
                    "stored views row is unreadable; treating as absent"
                );
                Ok(None)
            }
        }
    }

    /// Upsert one row per entry. Entries without both identity attributes
    /// have no row key and are skipped.
    fn save(&self, document: &Document) -> VistaResult<SaveOutcome> {
        let mut rows = Vec::with_capacity(document.len());
        for fragment in document.entries() {
            match row_key(fragment)? {
                Some((primary, secondary)) => {
                    let payload =
                        write_document(&Document::from_entries(vec![fragment.clone()]))?;
                    rows.push((primary, secondary, fragment.fingerprint().unwrap_or(""), payload));
                }
                None => debug!("skipping views entry without identity attributes"),
            }
        }

        let mut conn = self.connection()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;

        if !self.table_exists(&tx)? {
            self.create_table(&tx)?;
        }

        let select = format!(
            "SELECT last_updated FROM {} WHERE conceptual_container = ?1 AND store_container = ?2",
            self.qualified_table()
        );
        let update = format!(
            "UPDATE {} SET fingerprint = ?3, view_definitions = ?4, last_updated = ?5
             WHERE conceptual_container = ?1 AND store_container = ?2",
            self.qualified_table()
        );
        let insert = format!(
            "INSERT INTO {} (conceptual_container, store_container, fingerprint, view_definitions, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            self.qualified_table()
        );

        for (primary, secondary, fingerprint, payload) in &rows {
            let previous: Option<i64> = tx
                .query_row(&select, params![primary, secondary], |row| row.get(0))
                .optional()
                .map_err(db_error)?;
            let now = Utc::now().timestamp_micros();

            match previous {
                Some(previous) => {
                    let stamp = now.max(previous + 1);
                    tx.execute(&update, params![primary, secondary, fingerprint, payload, stamp])
                        .map_err(db_error)?;
                    debug!(primary, secondary, "updated views row");
                }
                None => {
                    tx.execute(&insert, params![primary, secondary, fingerprint, payload, now])
                        .map_err(db_error)?;
                    debug!(primary, secondary, "inserted views row");
                }
            }
        }

        tx.commit().map_err(db_error)?;
        Ok(SaveOutcome::Saved)
    }
}

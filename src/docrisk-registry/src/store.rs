//! Registry backends.
//!
//! Two on-disk formats are supported:
//! - JSON: an array of `{name, registration_number}` objects.
//! - SQLite: a `brokers` table with a unique `registration_no` column.
//!
//! Loaders only ever read. Writes go through [`SqliteStore::import`], which
//! is the administrative ingestion path.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::snapshot::{BrokerRecord, BrokerRegistry, MatchPolicy};

/// On-disk registry format, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryFormat {
    /// `.json`
    Json,
    /// `.sqlite`, `.sqlite3`, `.db`
    Sqlite,
}

impl RegistryFormat {
    /// Detect the format of a registry path.
    pub fn detect(path: &Path) -> Result<Self, RegistryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("sqlite" | "sqlite3" | "db") => Ok(Self::Sqlite),
            _ => Err(RegistryError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Load a registry snapshot from disk.
pub fn load_registry(path: &Path, policy: MatchPolicy) -> Result<BrokerRegistry, RegistryError> {
    if !path.exists() {
        return Err(RegistryError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let records = match RegistryFormat::detect(path)? {
        RegistryFormat::Json => read_json_records(path)?,
        RegistryFormat::Sqlite => SqliteStore::open_read_only(path)?.records()?,
    };

    info!(
        path = %path.display(),
        records = records.len(),
        "Loaded broker registry"
    );

    Ok(BrokerRegistry::with_policy(records, policy))
}

/// Read broker records from a JSON array file.
pub fn read_json_records(path: &Path) -> Result<Vec<BrokerRecord>, RegistryError> {
    let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<BrokerRecord> = serde_json::from_str(&raw)?;
    validate_records(&records)?;
    Ok(records)
}

/// Write broker records as a pretty-printed JSON array.
pub fn write_json_records(path: &Path, records: &[BrokerRecord]) -> Result<(), RegistryError> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_records(records: &[BrokerRecord]) -> Result<(), RegistryError> {
    for (idx, record) in records.iter().enumerate() {
        if record.name.trim().is_empty() {
            return Err(RegistryError::Malformed {
                reason: format!("record {} has an empty name", idx),
            });
        }
        if record.registration_number.trim().is_empty() {
            return Err(RegistryError::Malformed {
                reason: format!("record {} has an empty registration number", idx),
            });
        }
    }
    Ok(())
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows newly inserted.
    pub inserted: usize,
    /// Rows skipped because the registration number already existed.
    pub ignored: usize,
}

/// SQLite-backed broker store.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) a writable store and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an existing store without write access.
    pub fn open_read_only(path: &Path) -> Result<Self, RegistryError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Create the `brokers` table if it is missing.
    pub fn init_schema(&self) -> Result<(), RegistryError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS brokers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                registration_no TEXT NOT NULL UNIQUE
            );",
        )?;
        Ok(())
    }

    /// Insert records, skipping any whose registration number is already stored.
    ///
    /// Runs in a single transaction: readers of the file never observe a
    /// partially imported batch.
    pub fn import(&mut self, records: &[BrokerRecord]) -> Result<ImportSummary, RegistryError> {
        validate_records(records)?;

        let tx = self.conn.transaction()?;
        let mut summary = ImportSummary::default();
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO brokers (name, registration_no) VALUES (?1, ?2)",
            )?;
            for record in records {
                let changed = stmt.execute(params![record.name, record.registration_number])?;
                if changed == 0 {
                    summary.ignored += 1;
                } else {
                    summary.inserted += 1;
                }
            }
        }
        tx.commit()?;

        info!(
            path = %self.path.display(),
            inserted = summary.inserted,
            ignored = summary.ignored,
            "Broker import committed"
        );
        Ok(summary)
    }

    /// All records ordered by insertion.
    pub fn records(&self) -> Result<Vec<BrokerRecord>, RegistryError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, registration_no FROM brokers ORDER BY id ASC")
            .map_err(|e| RegistryError::Malformed {
                reason: format!("missing or invalid brokers table: {}", e),
            })?;
        let rows = stmt.query_map([], |row| {
            Ok(BrokerRecord {
                name: row.get(0)?,
                registration_number: row.get(1)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        debug!(path = %self.path.display(), count = records.len(), "Read broker rows");
        Ok(records)
    }

    /// Number of stored brokers.
    pub fn count(&self) -> Result<usize, RegistryError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM brokers", [], |r| r.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

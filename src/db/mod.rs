//! Database module for DevStudio
//!
//! Owns the single live SQLite connection for the process: path resolution,
//! pre-open integrity verification, corruption quarantine, durability pragmas,
//! schema migrations, and whole-database backup.

pub mod migrations;
pub mod repos;

use crate::db::migrations::MigrationRunner;
use rusqlite::{Connection, DatabaseName, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database not initialized")]
    NotInitialized,
    #[error("Database corruption detected")]
    Corruption,
    #[error("Migration {version} ({name}) failed: {source}")]
    MigrationFailed {
        version: i64,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Duplicate migration version {0} in registry")]
    DuplicateVersion(i64),
    #[error("Database initialization failed: {0}")]
    Initialize(#[source] Box<DbError>),
    #[error("{0}")]
    Conflict(String),
}

/// Database manager for DevStudio
///
/// Exclusively owns the live connection. Repositories and the migration
/// runner borrow it per call; nothing else holds it.
pub struct DatabaseManager {
    db_path: PathBuf,
    conn: Option<Connection>,
}

impl DatabaseManager {
    /// Create a manager for the given database file. No file access happens
    /// until `initialize` is called.
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            conn: None,
        }
    }

    /// Initialize the database
    /// - Ensures the containing directory exists
    /// - Verifies integrity of a pre-existing file, quarantining it on failure
    /// - Opens the connection and configures WAL, foreign keys, busy timeout
    /// - Runs all pending schema migrations
    ///
    /// Any failure past the quarantine step is fatal: the connection is
    /// closed and discarded, and a wrapped error is returned.
    pub fn initialize(&mut self) -> Result<(), DbError> {
        if self.conn.is_some() {
            tracing::debug!("database already initialized");
            return Ok(());
        }

        tracing::info!(path = %self.db_path.display(), "initializing database");

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // First-run detection must happen before any access to the file
        let first_run = !self.db_path.exists();
        if first_run {
            tracing::info!("first run detected, database will be created");
        } else if !check_integrity_at(&self.db_path) {
            tracing::warn!(
                path = %self.db_path.display(),
                "integrity check failed, quarantining database file"
            );
            quarantine(&self.db_path);
            // A fresh file is created by the open call below
        }

        let conn = open_and_migrate(&self.db_path)
            .map_err(|e| DbError::Initialize(Box::new(e)))?;

        self.conn = Some(conn);
        tracing::info!("database initialized");
        Ok(())
    }

    /// Get the active database connection
    ///
    /// Calling this before a successful `initialize` is a programming error
    /// and fails immediately with `DbError::NotInitialized`.
    pub fn connection(&self) -> Result<&Connection, DbError> {
        self.conn.as_ref().ok_or(DbError::NotInitialized)
    }

    /// Whether `initialize` has completed successfully
    pub fn is_initialized(&self) -> bool {
        self.conn.is_some()
    }

    /// Close the database connection. No-op if already closed.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::info!("closing database connection");
            if let Err((_conn, e)) = conn.close() {
                tracing::warn!("error closing database connection: {}", e);
            }
        }
    }

    /// Check integrity of the live connection
    pub fn check_integrity(&self) -> Result<bool, DbError> {
        let conn = self.connection()?;
        let healthy = run_integrity_scan(conn)?;
        if !healthy {
            tracing::error!("live database failed integrity check");
        }
        Ok(healthy)
    }

    /// Create a backup of the database at `destination`
    ///
    /// Uses the SQLite online backup API for an atomic snapshot; if that
    /// fails, checkpoints the WAL and falls back to a raw file copy. Either
    /// way the postcondition is the same: `destination` holds a valid,
    /// openable copy.
    pub fn backup(&self, destination: &Path) -> Result<(), DbError> {
        let conn = self.connection()?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        match conn.backup(DatabaseName::Main, destination, None) {
            Ok(()) => {
                tracing::info!(dest = %destination.display(), "database backed up");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("online backup failed ({}), using file copy fallback", e);
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                fs::copy(&self.db_path, destination)?;
                tracing::info!(dest = %destination.display(), "database backed up (file copy)");
                Ok(())
            }
        }
    }

    /// Current database file path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Open the connection, apply pragmas, and run pending migrations.
/// On migration failure the connection is closed before the error returns.
fn open_and_migrate(db_path: &Path) -> Result<Connection, DbError> {
    let conn = Connection::open(db_path)?;

    // WAL allows concurrent readers during a writer; the busy timeout
    // absorbs transient contention from e.g. a concurrent backup.
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;

    let runner = MigrationRunner::new(&conn);
    if let Err(e) = runner.run_pending() {
        drop(runner);
        let _ = conn.close();
        return Err(e);
    }

    Ok(conn)
}

/// Check integrity of a database file without opening it for real use
///
/// Opens its own read-only connection and runs the engine's consistency
/// scan. A missing file is healthy (nothing to check). The probe connection
/// is closed on every path; this function never propagates an error.
pub fn check_integrity_at(path: &Path) -> bool {
    if !path.exists() {
        return true;
    }

    let conn = match Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
    ) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("pre-open integrity probe could not open file: {}", e);
            return false;
        }
    };

    match run_integrity_scan(&conn) {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::error!("pre-open integrity scan failed: {}", e);
            false
        }
    }
}

/// Run PRAGMA integrity_check; healthy iff it reports exactly "ok"
fn run_integrity_scan(conn: &Connection) -> Result<bool, rusqlite::Error> {
    let mut stmt = conn.prepare("PRAGMA integrity_check")?;
    let rows: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;
    Ok(rows.len() == 1 && rows[0] == "ok")
}

/// Move a corrupt database file aside so a fresh one can be created
///
/// The copy is tagged with a timestamp so repeated corruption events never
/// overwrite earlier quarantines. Stale WAL/SHM side files are removed so
/// they cannot poison the replacement database. Failures are logged and
/// swallowed; losing forensic evidence is preferable to refusing to start.
pub fn quarantine(path: &Path) {
    let quarantine_path = quarantine_path_for(path, &chrono::Utc::now().to_rfc3339());

    match fs::copy(path, &quarantine_path) {
        Ok(_) => {
            tracing::info!(dest = %quarantine_path.display(), "corrupt database quarantined");
            if let Err(e) = fs::remove_file(path) {
                tracing::error!("failed to remove corrupt database: {}", e);
            }
        }
        Err(e) => {
            tracing::error!("failed to quarantine corrupt database: {}", e);
            return;
        }
    }

    // Side files belong to the corrupt database and must not survive it
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_os_string();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            if let Err(e) = fs::remove_file(&side) {
                tracing::warn!(path = %side.display(), "failed to remove side file: {}", e);
            }
        }
    }
}

/// Sibling path for a quarantined copy: `<stem>.corrupt.<timestamp>.<ext>`
/// with filesystem-unsafe characters in the timestamp replaced.
fn quarantine_path_for(path: &Path, timestamp: &str) -> PathBuf {
    let safe_timestamp = timestamp.replace([':', '.'], "-");
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".to_string());

    let file_name = match path.extension() {
        Some(ext) => format!("{}.corrupt.{}.{}", stem, safe_timestamp, ext.to_string_lossy()),
        None => format!("{}.corrupt.{}", stem, safe_timestamp),
    };

    path.with_file_name(file_name)
}

/// Get the application data directory
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("DevStudio")
}

/// Get database path
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("devstudio.db")
}

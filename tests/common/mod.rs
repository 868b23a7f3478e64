//! Common test utilities for DevStudio integration tests
//!
//! Provides helpers for creating temp-dir sandboxed databases so no test
//! ever touches the real per-user data directory.

use devstudio::db::DatabaseManager;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context holding temporary resources
#[allow(dead_code)]
pub struct TestContext {
    pub temp_dir: TempDir,
    pub manager: DatabaseManager,
    pub db_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    /// Create a new test context with an initialized database
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let mut manager = DatabaseManager::new(db_path.clone());
        manager.initialize()?;

        Ok(Self {
            temp_dir,
            manager,
            db_path,
        })
    }

    /// Create a context whose database file has NOT been initialized yet
    pub fn uninitialized() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let manager = DatabaseManager::new(db_path.clone());

        Ok(Self {
            temp_dir,
            manager,
            db_path,
        })
    }

    /// Get the temp directory path
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Names of quarantine files sitting next to the database
    pub fn quarantine_files(&self) -> Vec<String> {
        std::fs::read_dir(self.temp_path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.contains(".corrupt."))
            .collect()
    }
}

/// Whether a table exists in the connected database
#[allow(dead_code)]
pub fn table_exists(conn: &rusqlite::Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        > 0
}

/// Whether a column exists on a table
#[allow(dead_code)]
pub fn column_exists(conn: &rusqlite::Connection, table: &str, column: &str) -> bool {
    conn.prepare(&format!("PRAGMA table_info({})", table))
        .unwrap()
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .filter_map(|r| r.ok())
        .any(|name| name == column)
}

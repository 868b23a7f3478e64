//! Migration 002: index for document sorting by update time

use rusqlite::Connection;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents(updated_at DESC);",
    )
}

pub fn down(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("DROP INDEX IF EXISTS idx_documents_updated;")
}

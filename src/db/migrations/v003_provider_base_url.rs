//! Migration 003: optional base URL override per LLM provider
//!
//! Lets a provider row point at a self-hosted or proxy endpoint.

use rusqlite::Connection;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    // The column may already exist if the table was created from a newer
    // fresh schema; probe before altering.
    if !has_column(conn, "llm_providers", "base_url")? {
        conn.execute_batch("ALTER TABLE llm_providers ADD COLUMN base_url TEXT;")?;
    }
    Ok(())
}

pub fn down(conn: &Connection) -> rusqlite::Result<()> {
    if has_column(conn, "llm_providers", "base_url")? {
        conn.execute_batch("ALTER TABLE llm_providers DROP COLUMN base_url;")?;
    }
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let exists = conn
        .prepare(&format!("PRAGMA table_info({})", table))?
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|r| r.ok())
        .any(|name| name == column);
    Ok(exists)
}

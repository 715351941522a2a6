use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

const MIGRATION_BOOKS_AND_TAGS_SQL: &str = include_str!("../migrations/0000_books_and_tags.sql");

const MIGRATIONS: &[(&str, &str)] = &[("0000_books_and_tags", MIGRATION_BOOKS_AND_TAGS_SQL)];

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) the catalogue database at `db_path`.
pub fn open_db(db_path: &Path) -> Result<Connection> {
    if let Some(dir) = db_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    init_schema(&conn)?;
    log::debug!("opened catalogue database at {}", db_path.display());
    Ok(conn)
}

/// Private database that lives as long as the returned handle.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Ensure every relation exists. Safe to call on every startup.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id TEXT PRIMARY KEY NOT NULL,
            applied_at INTEGER NOT NULL
        );",
    )?;

    for (id, sql) in MIGRATIONS {
        apply_migration(conn, id, sql)?;
    }

    // Per connection, not persisted in the file.
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

fn apply_migration(conn: &Connection, id: &str, sql: &str) -> Result<()> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM schema_migrations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(());
    }

    conn.execute_batch(sql)?;
    // A second connection may have applied the same migration in the meantime.
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (id, applied_at) VALUES (?1, ?2)",
        params![id, chrono::Utc::now().timestamp_millis()],
    )?;
    log::info!("applied migration {}", id);
    Ok(())
}

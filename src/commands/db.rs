use crate::error::BugResult;
use rusqlite::{params, Connection, OptionalExtension, Result, Transaction, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_SCHEMA_VERSION: i64 = 2;
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    // Connections opened side by side must not both run a migration.
    let tx = write_transaction(conn)?;
    let mut version: i64 = tx.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(&tx)?;
        version = 1;
        tx.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(&tx)?;
        version = 2;
        tx.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        // Future schema; the key-value table stays readable.
        tx.pragma_update(None, "user_version", version)?;
    }

    tx.commit()
}

/// Takes the write lock up front so a read-modify-write cannot interleave with
/// another connection's. Waits up to the busy timeout for the lock.
pub fn write_transaction(conn: &Connection) -> Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    add_column_if_missing(conn, "kv_store", "updated_at INTEGER NOT NULL DEFAULT 0")
}

fn add_column_if_missing(conn: &Connection, table: &str, column_def: &str) -> Result<()> {
    let column_name = column_def
        .split_whitespace()
        .next()
        .unwrap_or(column_def)
        .to_string();

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|res| res.ok())
        .any(|name| name == column_name);

    if !exists {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column_def}"), [])?;
    }

    Ok(())
}

pub fn db_path(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("state.db")
}

pub fn ensure_data_dir(data_dir: &str) -> std::result::Result<(), String> {
    fs::create_dir_all(data_dir)
        .map_err(|e| format!("INIT_FAILED: Could not create data directory {data_dir}: {e}"))
}

pub fn get_db_connection(data_dir: &str) -> BugResult<Connection> {
    fs::create_dir_all(data_dir)?;
    let conn = Connection::open(db_path(data_dir))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    initialize_schema(&conn)?;
    Ok(conn)
}

pub fn get_item(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

/// Replaces the whole value stored under `key` in one statement.
pub fn set_item(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    conn.execute(
        "
        INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        ",
        params![key, value, now],
    )?;
    Ok(())
}

pub fn remove_item(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
    Ok(())
}

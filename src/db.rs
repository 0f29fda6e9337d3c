use crate::config::{is_valid_collection_name, StoreConfig};
use anyhow::{anyhow, Context};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn db_path(workspace: &Path, store: &StoreConfig) -> PathBuf {
    workspace.join(&store.database_file)
}

pub fn open_db(workspace: &Path, store: &StoreConfig) -> anyhow::Result<Connection> {
    if !is_valid_collection_name(&store.collection) {
        return Err(anyhow!("invalid collection name: {}", store.collection));
    }
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let path = db_path(workspace, store);
    let conn = Connection::open(&path)
        .with_context(|| format!("failed to open database {}", path.to_string_lossy()))?;
    conn.busy_timeout(Duration::from_millis(store.busy_timeout_ms))?;
    // journal_mode returns the resulting mode as a row.
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;

    ensure_collection(&conn, &store.collection)?;
    Ok(conn)
}

pub fn ensure_collection(conn: &Connection, collection: &str) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {}(
                student_id TEXT PRIMARY KEY,
                doc TEXT NOT NULL CHECK(json_valid(doc))
            )",
            collection
        ),
        [],
    )
    .with_context(|| format!("failed to create collection {}", collection))?;
    Ok(())
}

pub fn has_collection(conn: &Connection, collection: &str) -> anyhow::Result<bool> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [collection],
            |r| r.get(0),
        )
        .with_context(|| format!("failed to look up collection {}", collection))?;
    Ok(n > 0)
}

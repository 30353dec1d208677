//! Coverage data store collaborator.
//!
//! The harness does not collect line coverage itself; it opens, scopes,
//! and saves a per-test recording context in a store owned by the coverage
//! collaborator, tagging each test's contribution with that test's node
//! id. Workers never overlap in time, so the store needs no locking.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::core::Result;

/// Per-test recording surface of the coverage collaborator.
pub trait CoverageStore {
    /// Begin recording under the given context (a test node id).
    fn start_context(&mut self, context: &str) -> Result<()>;

    /// Stop recording the active context.
    fn stop_context(&mut self) -> Result<()>;

    /// Persist everything recorded so far.
    fn save(&mut self) -> Result<()>;
}

/// SQLite-backed store keeping one row per recorded context.
pub struct SqliteStore {
    conn: Connection,
    active: Option<i64>,
}

impl SqliteStore {
    /// Open (or create) the store file and record the source root it
    /// covers.
    pub fn open(path: &Path, source_root: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS contexts (
                 id INTEGER PRIMARY KEY,
                 context TEXT NOT NULL,
                 started_at TEXT NOT NULL,
                 ended_at TEXT
             );",
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('source_root', ?1)",
            params![source_root.display().to_string()],
        )?;

        Ok(Self { conn, active: None })
    }

    /// Number of contexts recorded so far.
    pub fn context_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM contexts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Recorded context names, in recording order.
    pub fn contexts(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT context FROM contexts ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }
}

impl CoverageStore for SqliteStore {
    fn start_context(&mut self, context: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO contexts (context, started_at) VALUES (?1, datetime('now'))",
            params![context],
        )?;
        self.active = Some(self.conn.last_insert_rowid());
        Ok(())
    }

    fn stop_context(&mut self) -> Result<()> {
        if let Some(id) = self.active.take() {
            self.conn.execute(
                "UPDATE contexts SET ended_at = datetime('now') WHERE id = ?1",
                params![id],
            )?;
        }
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        // The connection autocommits; checkpoint whatever the journal holds.
        let _busy: i64 = self
            .conn
            .query_row("PRAGMA wal_checkpoint;", [], |row| row.get(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_contexts_accumulate_across_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cov.sqlite3");

        // Each worker opens the store, records one context, and exits;
        // rows accumulate because workers never overlap.
        for node_id in ["t::a", "t::b"] {
            let mut store = SqliteStore::open(&path, dir.path()).unwrap();
            store.start_context(node_id).unwrap();
            store.stop_context().unwrap();
            store.save().unwrap();
        }

        let store = SqliteStore::open(&path, dir.path()).unwrap();
        assert_eq!(store.context_count().unwrap(), 2);
    }

    #[test]
    fn test_stop_without_start_is_harmless() {
        let dir = TempDir::new().unwrap();
        let mut store = SqliteStore::open(&dir.path().join("cov.sqlite3"), dir.path()).unwrap();
        store.stop_context().unwrap();
        store.save().unwrap();
    }
}

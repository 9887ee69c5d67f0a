//! SQLite-backed [`BigramStore`].
//!
//! One database file holds every community's edges; all queries are scoped
//! by `community_id`. The `id` column is `AUTOINCREMENT` so insertion order
//! survives deletes — eviction by oldest insertion stays correct after
//! arbitrary churn.
//!
//! Concurrency: the connection sits behind a `Mutex`, and `train` is a
//! single `INSERT ... ON CONFLICT ... DO UPDATE` statement, so the
//! increment-or-insert is atomic even with multiple store handles on the
//! same file (WAL + busy timeout cover cross-process callers).

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use super::BigramStore;
use crate::error::EngineError;

/// Database file name, created inside the directory handed to [`SqliteStore::open`].
pub const DB_FILENAME: &str = "bigrams.db";

/// Schema version stored in `PRAGMA user_version`.
/// Increment when the DDL changes; add a migration path in `open`.
const SCHEMA_VERSION: i64 = 1;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store under `dir` and apply recommended pragmas:
    /// WAL journal for concurrent readers, foreign keys on, 5 s busy timeout.
    pub fn open(dir: &Path) -> Result<Self, EngineError> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILENAME);
        let conn = Connection::open(&db_path)
            .map_err(|e| EngineError::Store(format!("open {}: {e}", db_path.display())))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| EngineError::Store(format!("set journal_mode WAL: {e}")))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| EngineError::Store(format!("set foreign_keys ON: {e}")))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| EngineError::Store(format!("set busy_timeout: {e}")))?;

        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|e| EngineError::Store(format!("read user_version: {e}")))?;
        if version < SCHEMA_VERSION {
            init_schema(&conn)?;
        }

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock means a panic mid-statement; rusqlite statements
        // don't leave the connection in a broken state, so continue.
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn init_schema(conn: &Connection) -> Result<(), EngineError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS bigram_edges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            community_id TEXT NOT NULL,
            prev TEXT NOT NULL,
            curr TEXT NOT NULL,
            next TEXT NOT NULL,
            freq INTEGER NOT NULL DEFAULT 1,
            UNIQUE(community_id, prev, curr, next)
        );

        CREATE INDEX IF NOT EXISTS idx_bigram_head
            ON bigram_edges(community_id, prev, curr);

        PRAGMA user_version = 1;
        ",
    )
    .map_err(|e| EngineError::Store(format!("initialize schema: {e}")))
}

impl BigramStore for SqliteStore {
    fn train(
        &self,
        community: &str,
        prev: &str,
        curr: &str,
        next: &str,
    ) -> Result<(), EngineError> {
        self.conn()
            .execute(
                "INSERT INTO bigram_edges (community_id, prev, curr, next, freq)
                 VALUES (?1, ?2, ?3, ?4, 1)
                 ON CONFLICT(community_id, prev, curr, next)
                 DO UPDATE SET freq = freq + 1",
                (community, prev, curr, next),
            )
            .map_err(|e| EngineError::Store(format!("train edge: {e}")))?;
        Ok(())
    }

    fn start_pairs(&self, community: &str) -> Result<Vec<(String, String)>, EngineError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT DISTINCT prev, curr FROM bigram_edges WHERE community_id = ?1",
            )
            .map_err(|e| EngineError::Store(format!("prepare start_pairs: {e}")))?;
        let rows = stmt
            .query_map([community], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| EngineError::Store(format!("query start_pairs: {e}")))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| EngineError::Store(format!("read start_pairs: {e}")))
    }

    fn next_distribution(
        &self,
        community: &str,
        prev: &str,
        curr: &str,
    ) -> Result<Vec<(String, u64)>, EngineError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT next, freq FROM bigram_edges
                 WHERE community_id = ?1 AND prev = ?2 AND curr = ?3",
            )
            .map_err(|e| EngineError::Store(format!("prepare next_distribution: {e}")))?;
        let rows = stmt
            .query_map((community, prev, curr), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })
            .map_err(|e| EngineError::Store(format!("query next_distribution: {e}")))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| EngineError::Store(format!("read next_distribution: {e}")))
    }

    fn count(&self, community: &str) -> Result<u64, EngineError> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM bigram_edges WHERE community_id = ?1",
                [community],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(|e| EngineError::Store(format!("count edges: {e}")))
    }

    fn evict_oldest(&self, community: &str, n: u64) -> Result<u64, EngineError> {
        let deleted = self
            .conn()
            .execute(
                "DELETE FROM bigram_edges WHERE id IN (
                     SELECT id FROM bigram_edges
                     WHERE community_id = ?1
                     ORDER BY id ASC
                     LIMIT ?2
                 )",
                (community, n as i64),
            )
            .map_err(|e| EngineError::Store(format!("evict edges: {e}")))?;
        Ok(deleted as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_db_file() {
        let (dir, _store) = open_store();
        assert!(dir.path().join(DB_FILENAME).exists());
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteStore::open(dir.path()).unwrap();
            store.train("g", "a", "b", "c").unwrap();
        }
        let store = SqliteStore::open(dir.path()).unwrap();
        assert_eq!(store.count("g").unwrap(), 1);
    }

    #[test]
    fn train_is_upsert() {
        let (_dir, store) = open_store();
        store.train("g", "a", "b", "c").unwrap();
        store.train("g", "a", "b", "c").unwrap();
        assert_eq!(store.count("g").unwrap(), 1);
        let dist = store.next_distribution("g", "a", "b").unwrap();
        assert_eq!(dist, vec![("c".to_string(), 2)]);
    }

    #[test]
    fn communities_are_isolated() {
        let (_dir, store) = open_store();
        store.train("g1", "a", "b", "c").unwrap();
        store.train("g2", "a", "b", "d").unwrap();
        assert_eq!(store.count("g1").unwrap(), 1);
        assert_eq!(store.count("g2").unwrap(), 1);
        let dist = store.next_distribution("g1", "a", "b").unwrap();
        assert_eq!(dist, vec![("c".to_string(), 1)]);
    }

    #[test]
    fn start_pairs_are_distinct() {
        let (_dir, store) = open_store();
        store.train("g", "a", "b", "c").unwrap();
        store.train("g", "a", "b", "d").unwrap();
        store.train("g", "x", "y", "z").unwrap();
        let mut pairs = store.start_pairs("g").unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "b".to_string()),
                ("x".to_string(), "y".to_string()),
            ]
        );
    }

    #[test]
    fn evict_oldest_follows_insertion_order() {
        let (_dir, store) = open_store();
        store.train("g", "old", "old", "old").unwrap();
        // Reinforce the old edge heavily — eviction must still take it first.
        for _ in 0..10 {
            store.train("g", "old", "old", "old").unwrap();
        }
        store.train("g", "new", "new", "new").unwrap();

        let deleted = store.evict_oldest("g", 1).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.next_distribution("g", "old", "old").unwrap().is_empty());
        assert_eq!(store.next_distribution("g", "new", "new").unwrap().len(), 1);
    }
}

//! Visit storage - SQLite persistence for visit records
//!
//! Owns the connection pool and the schema. Writes (insert/delete) live here;
//! read-side analytics live in [`crate::query`], which shares the same pool.
//!
//! # Architecture
//!
//! ```text
//! POST /api/visit ──┐
//! DELETE /api/visits┴──→ VisitStore (r2d2 pool, max 8)
//!                              │
//!                              └──→ SQLite (WAL mode)
//!                                      │
//! GET /api/visits/* ──→ VisitsQuery ───┘ (same pool)
//! ```

use chrono::{SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current schema version, stored in `metadata.schema_version`
const SCHEMA_VERSION: i32 = 2;

/// Pool size: one writer at a time in SQLite, the rest serve reads
const POOL_SIZE: u32 = 8;

/// A visit about to be inserted (no id / created_at yet)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewVisit {
    pub timestamp: String,
    pub url: String,
    pub referrer: String,
    pub user_agent: String,
    pub language: String,
    pub cookies: String,
    pub screen_width: i64,
    pub screen_height: i64,
    pub color_depth: i64,
    pub timezone: String,
    pub ip: String,
}

impl NewVisit {
    /// Minimal visit for `url`, stamped with the current time
    pub fn now(url: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            url: url.into(),
            ..Default::default()
        }
    }
}

/// SQLite-backed visit store
#[derive(Clone)]
pub struct VisitStore {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl VisitStore {
    /// Open (or create) the database at `db_path` and bring the schema up to date
    pub fn open(db_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(&path)
            .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout=5000;"));
        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;

        {
            let conn = pool.get()?;
            Self::init_schema(&conn)?;
        }

        tracing::debug!("Visit store opened at {}", path.display());
        Ok(Self { pool, path })
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared pool, for the query layer
    pub fn pool(&self) -> &Pool<SqliteConnectionManager> {
        &self.pool
    }

    fn conn(&self) -> anyhow::Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Insert one visit, returning its row id
    pub fn insert_visit(&self, visit: &NewVisit) -> anyhow::Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO visits (
                timestamp, url, referrer, user_agent, language,
                cookies, screen_width, screen_height, color_depth,
                timezone, ip
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                visit.timestamp,
                visit.url,
                visit.referrer,
                visit.user_agent,
                visit.language,
                visit.cookies,
                visit.screen_width,
                visit.screen_height,
                visit.color_depth,
                visit.timezone,
                visit.ip,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Delete one visit. Returns false when no row had that id.
    pub fn delete_visit(&self, id: i64) -> anyhow::Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM visits WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Delete several visits, returning how many rows were removed
    pub fn delete_visits(&self, ids: &[i64]) -> anyhow::Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let conn = self.conn()?;
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!("DELETE FROM visits WHERE id IN ({})", placeholders);
        let changed = conn.execute(&sql, params_from_iter(ids.iter()))?;
        Ok(changed)
    }

    /// Initialize database schema with WAL mode and run migrations
    fn init_schema(conn: &Connection) -> anyhow::Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT
            );
            "#,
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(
                    (SELECT CAST(value AS INTEGER) FROM metadata WHERE key = 'schema_version'),
                    0
                )",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            Self::apply_schema_v1(conn)?;
        }
        if current_version < 2 {
            Self::migrate_v1_to_v2(conn)?;
        }

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                "Visit schema migrated from v{} to v{}",
                current_version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }

    /// Initial schema (v1): the visits table
    fn apply_schema_v1(conn: &Connection) -> anyhow::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS visits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                url TEXT NOT NULL,
                referrer TEXT,
                user_agent TEXT,
                language TEXT,
                cookies TEXT,
                screen_width INTEGER,
                screen_height INTEGER,
                color_depth INTEGER,
                timezone TEXT,
                ip TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', '1');
            "#,
        )?;
        Ok(())
    }

    /// Migration from v1 to v2 (indexes for the filter and group-by columns)
    fn migrate_v1_to_v2(conn: &Connection) -> anyhow::Result<()> {
        conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_visits_timestamp ON visits(timestamp);
            CREATE INDEX IF NOT EXISTS idx_visits_url ON visits(url);
            CREATE INDEX IF NOT EXISTS idx_visits_ip ON visits(ip);

            INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', '2');
            "#,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, VisitStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = VisitStore::open(dir.path().join("visits.db")).unwrap();
        (dir, store)
    }

    fn count(store: &VisitStore) -> i64 {
        store
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM visits", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let (_dir, store) = open_temp();
        let a = store.insert_visit(&NewVisit::now("https://example.com/")).unwrap();
        let b = store.insert_visit(&NewVisit::now("https://example.com/about")).unwrap();
        assert!(b > a);
        assert_eq!(count(&store), 2);
    }

    #[test]
    fn test_delete_visit() {
        let (_dir, store) = open_temp();
        let id = store.insert_visit(&NewVisit::now("https://example.com/")).unwrap();

        assert!(store.delete_visit(id).unwrap());
        assert!(!store.delete_visit(id).unwrap());
        assert_eq!(count(&store), 0);
    }

    #[test]
    fn test_delete_nonexistent_reports_failure() {
        let (_dir, store) = open_temp();
        assert!(!store.delete_visit(42).unwrap());
    }

    #[test]
    fn test_delete_visits_batch() {
        let (_dir, store) = open_temp();
        let ids: Vec<i64> = (0..5)
            .map(|i| {
                store
                    .insert_visit(&NewVisit::now(format!("https://example.com/{}", i)))
                    .unwrap()
            })
            .collect();

        // Unknown ids are ignored
        let deleted = store.delete_visits(&[ids[0], ids[2], 9999]).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(count(&store), 3);
        assert_eq!(store.delete_visits(&[]).unwrap(), 0);
    }

    #[test]
    fn test_reopen_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("visits.db");
        {
            let store = VisitStore::open(&path).unwrap();
            store.insert_visit(&NewVisit::now("https://example.com/")).unwrap();
        }

        let store = VisitStore::open(&path).unwrap();
        assert_eq!(count(&store), 1);
        let version: String = store
            .conn()
            .unwrap()
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());
    }
}

//! SQLite store backend for persistent metadata records.

use super::{mtime_secs, MetadataStore, StoreStats};
use crate::core::metadata::MetadataRecord;
use crate::error::CacheError;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

/// SQLite-backed persistent metadata store
///
/// Uses WAL (Write-Ahead Logging) mode for better concurrent access.
/// The record itself is stored as a JSON column so every optional field
/// round-trips losslessly, including absent ones.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open or create a store database at the given path
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| CacheError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // WAL allows readers to proceed even while writes are happening
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                path TEXT PRIMARY KEY,
                file_size INTEGER NOT NULL,
                file_modified INTEGER NOT NULL,
                record TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Corrupted {
            path: self.db_path.clone(),
        })
    }
}

impl MetadataStore for SqliteStore {
    fn get(
        &self,
        path: &Path,
        size: u64,
        modified: SystemTime,
    ) -> Result<Option<MetadataRecord>, CacheError> {
        let conn = self.lock()?;
        let path_str = path.to_string_lossy();

        let row: Result<(i64, i64, String), _> = conn.query_row(
            "SELECT file_size, file_modified, record FROM records WHERE path = ?",
            [&path_str],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        );

        match row {
            Ok((cached_size, cached_modified, json)) => {
                // Stale when the identity key no longer matches
                if cached_size != size as i64 || cached_modified != mtime_secs(modified) {
                    return Ok(None);
                }
                let record = serde_json::from_str(&json)
                    .map_err(|e| CacheError::SerializationFailed(e.to_string()))?;
                Ok(Some(record))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CacheError::QueryFailed(e.to_string())),
        }
    }

    fn set(
        &self,
        path: &Path,
        size: u64,
        modified: SystemTime,
        record: &MetadataRecord,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(record)
            .map_err(|e| CacheError::SerializationFailed(e.to_string()))?;

        let conn = self.lock()?;
        let path_str = path.to_string_lossy();

        conn.execute(
            "INSERT OR REPLACE INTO records
             (path, file_size, file_modified, record, cached_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                path_str,
                size as i64,
                mtime_secs(modified),
                json,
                mtime_secs(SystemTime::now()),
            ],
        )
        .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<(), CacheError> {
        let conn = self.lock()?;
        let path_str = path.to_string_lossy();

        conn.execute("DELETE FROM records WHERE path = ?", [&path_str])
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let conn = self.lock()?;

        conn.execute("DELETE FROM records", [])
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn stats(&self) -> Result<StoreStats, CacheError> {
        let conn = self.lock()?;

        let total_entries: usize = conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| {
                row.get::<_, i64>(0).map(|v| v as usize)
            })
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        let oldest_entry: Option<i64> = conn
            .query_row("SELECT MIN(cached_at) FROM records", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        let newest_entry: Option<i64> = conn
            .query_row("SELECT MAX(cached_at) FROM records", [], |row| {
                row.get::<_, Option<i64>>(0)
            })
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        Ok(StoreStats {
            total_entries,
            oldest_entry,
            newest_entry,
        })
    }

    fn prune_orphans(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT path FROM records")
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?;

        let paths: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| CacheError::QueryFailed(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        drop(stmt);

        let mut count = 0;
        for path in paths {
            if !Path::new(&path).exists() {
                conn.execute("DELETE FROM records WHERE path = ?", [&path])
                    .map_err(|e| CacheError::QueryFailed(e.to_string()))?;
                count += 1;
            }
        }

        Ok(count)
    }
}

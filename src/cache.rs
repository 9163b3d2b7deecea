use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::parser::decode;
use crate::record::Dataset;

/// Request key (the page URL) → decoded dataset. Entries are written once
/// after a successful decode and never invalidated.
pub trait DatasetCache {
    fn get(&self, key: &str) -> Result<Option<Dataset>>;
    fn put(&mut self, key: &str, dataset: &Dataset) -> Result<()>;
}

/// Process-lifetime cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, Dataset>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl DatasetCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Dataset>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, dataset: &Dataset) -> Result<()> {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| dataset.clone());
        Ok(())
    }
}

/// Cache that survives across runs, one JSON document per key.
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS datasets (
                key        TEXT PRIMARY KEY,
                json       TEXT NOT NULL,
                records    INTEGER NOT NULL,
                fetched_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(SqliteCache { conn })
    }
}

impl DatasetCache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<Dataset>> {
        let json: Option<String> = self
            .conn
            .query_row("SELECT json FROM datasets WHERE key = ?1", [key], |r| r.get(0))
            .optional()?;
        match json {
            Some(json) => {
                let ds = decode::decode(&json)
                    .with_context(|| format!("Corrupt cache entry for {}", key))?;
                debug!(key, records = ds.len(), "cache hit");
                Ok(Some(ds))
            }
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &str, dataset: &Dataset) -> Result<()> {
        let json = serde_json::to_string(dataset)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO datasets (key, json, records, fetched_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![key, json, dataset.len() as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

//! Region result storage implementation using SQLite

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use tracing::{debug, info, warn};

use crate::locality::{LocalityRecord, RegionResult};
use crate::region::Region;
use crate::store::StoredRegionResult;
use crate::Result;

/// SQLite-based storage for scraped regions
pub struct LocalityStore {
    conn: Connection,
}

impl LocalityStore {
    /// Create a new LocalityStore with the given database path
    pub fn new(db_path: &str) -> Result<Self> {
        debug!("Opening locality database at: {}", db_path);
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.init_tables()?;
        info!("LocalityStore initialized successfully");
        Ok(store)
    }

    /// Create an in-memory LocalityStore (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS region_results (
                id TEXT PRIMARY KEY,
                region TEXT NOT NULL,
                localities TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_region_results_region ON region_results(region)",
            [],
        )?;

        Ok(())
    }

    /// Store a region result, returning the generated id
    pub fn save(&self, result: &RegionResult) -> Result<String> {
        let stored = StoredRegionResult::new(result);
        let localities_json = serde_json::to_string(&stored.localities)?;

        self.conn.execute(
            "INSERT INTO region_results (id, region, localities, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                stored.id,
                stored.region.as_str(),
                localities_json,
                stored.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )?;

        debug!(
            "Saved {} localities for {} with id: {}",
            stored.localities.len(),
            stored.region,
            stored.id
        );
        Ok(stored.id)
    }

    /// All stored runs for a region, newest first
    pub fn find_by_region(&self, region: Region) -> Result<Vec<StoredRegionResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, region, localities, created_at FROM region_results
             WHERE region = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt
            .query_map(params![region.as_str()], read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut results = Vec::with_capacity(rows.len());
        for (id, localities_json, created_at_str) in rows {
            let localities: Vec<LocalityRecord> = serde_json::from_str(&localities_json)?;
            let created_at = DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|e| {
                    warn!("Bad timestamp on stored result {}: {}", id, e);
                    Utc::now()
                });

            results.push(StoredRegionResult {
                id,
                region,
                localities,
                created_at,
            });
        }

        debug!("Found {} stored results for {}", results.len(), region);
        Ok(results)
    }

    /// Count stored runs
    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM region_results", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String)> {
    Ok((row.get(0)?, row.get(2)?, row.get(3)?))
}

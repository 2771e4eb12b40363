//! SQLite-backed store.
//!
//! One database file holds the three tables the relay needs: cached spot
//! analyses, named secrets and marine protected areas.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use spotfinder_geo::{MarineProtectedArea, ProtectionLevel};
use std::path::Path;

use crate::backend::{
    AnalysisStore, ProtectedAreaStore, SecretStore, StoreError, StoreResult, StoredSpot,
};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    ///
    /// Creates parent directories, the database file and schema if they
    /// don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::storage(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        tracing::debug!("Opened store at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory store (tests, one-off CLI runs).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS fishing_spots (
                google_place_id TEXT PRIMARY KEY,
                fish_analysis TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                analyzed_at TEXT NOT NULL,
                last_updated TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS secrets (
                key_name TEXT PRIMARY KEY,
                key_value TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS marine_protected_areas (
                mpatlas_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                designation TEXT,
                protection_level TEXT NOT NULL,
                boundaries TEXT,
                area_km2 REAL,
                no_take_area_km2 REAL,
                implementation_status TEXT,
                last_updated TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_spots_missing_description
                ON fishing_spots(google_place_id) WHERE description IS NULL;
            "#,
        )?;
        Ok(())
    }

    /// Unreadable timestamps become the Unix epoch, so an age check treats
    /// the row as old rather than new.
    fn parse_time(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|e| {
                tracing::warn!("Unreadable timestamp {:?} in store: {}", s, e);
                DateTime::<Utc>::UNIX_EPOCH
            })
    }

    fn row_to_spot(row: &rusqlite::Row) -> rusqlite::Result<StoredSpot> {
        let created_at: String = row.get(3)?;
        let analyzed_at: String = row.get(4)?;
        let last_updated: String = row.get(5)?;
        Ok(StoredSpot {
            place_id: row.get(0)?,
            fish_analysis: row.get(1)?,
            description: row.get(2)?,
            created_at: Self::parse_time(&created_at),
            analyzed_at: Self::parse_time(&analyzed_at),
            last_updated: Self::parse_time(&last_updated),
        })
    }

    fn row_to_area(row: &rusqlite::Row) -> rusqlite::Result<(MarineProtectedArea, Option<String>)> {
        let level: String = row.get(3)?;
        let boundaries: Option<String> = row.get(4)?;
        Ok((
            MarineProtectedArea {
                mpatlas_id: row.get(0)?,
                name: row.get(1)?,
                designation: row.get(2)?,
                protection_level: ProtectionLevel::from_str_lossy(&level),
                boundaries: None,
                area_km2: row.get(5)?,
                no_take_area_km2: row.get(6)?,
                implementation_status: row.get(7)?,
            },
            boundaries,
        ))
    }

    /// Number of cached spot analyses.
    pub fn spot_count(&self) -> StoreResult<usize> {
        let count: i64 =
            self.conn
                .lock()
                .query_row("SELECT COUNT(*) FROM fishing_spots", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl AnalysisStore for SqliteStore {
    fn get_analysis(&self, place_id: &str) -> StoreResult<Option<StoredSpot>> {
        let spot = self
            .conn
            .lock()
            .query_row(
                "SELECT google_place_id, fish_analysis, description, created_at, analyzed_at, last_updated
                 FROM fishing_spots WHERE google_place_id = ?1",
                params![place_id],
                Self::row_to_spot,
            )
            .optional()?;
        Ok(spot)
    }

    fn upsert_analysis(&self, place_id: &str, fish_analysis: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.lock().execute(
            r#"
            INSERT INTO fishing_spots
                (google_place_id, fish_analysis, description, created_at, analyzed_at, last_updated)
            VALUES (?1, ?2, NULL, ?3, ?3, ?3)
            ON CONFLICT(google_place_id) DO UPDATE SET
                fish_analysis = excluded.fish_analysis,
                description = NULL,
                analyzed_at = excluded.analyzed_at,
                last_updated = excluded.last_updated
            "#,
            params![place_id, fish_analysis, now],
        )?;
        tracing::debug!("Stored analysis for place {}", place_id);
        Ok(())
    }

    fn spots_missing_description(&self) -> StoreResult<Vec<StoredSpot>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT google_place_id, fish_analysis, description, created_at, analyzed_at, last_updated
             FROM fishing_spots
             WHERE description IS NULL
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], Self::row_to_spot)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn set_description(&self, place_id: &str, description: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.lock().execute(
            "UPDATE fishing_spots SET description = ?1, last_updated = ?2 WHERE google_place_id = ?3",
            params![description, now, place_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(place_id.to_string()));
        }
        Ok(())
    }
}

impl SecretStore for SqliteStore {
    fn get_secret(&self, key_name: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .lock()
            .query_row(
                "SELECT key_value FROM secrets WHERE key_name = ?1",
                params![key_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_secret(&self, key_name: &str, key_value: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.lock().execute(
            r#"
            INSERT INTO secrets (key_name, key_value, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(key_name) DO UPDATE SET
                key_value = excluded.key_value,
                updated_at = excluded.updated_at
            "#,
            params![key_name, key_value, now],
        )?;
        // Never log the value
        tracing::info!("Stored secret {}", key_name);
        Ok(())
    }
}

impl ProtectedAreaStore for SqliteStore {
    fn upsert_areas(&self, areas: &[MarineProtectedArea]) -> StoreResult<usize> {
        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO marine_protected_areas
                    (mpatlas_id, name, designation, protection_level, boundaries,
                     area_km2, no_take_area_km2, implementation_status, last_updated)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(mpatlas_id) DO UPDATE SET
                    name = excluded.name,
                    designation = excluded.designation,
                    protection_level = excluded.protection_level,
                    boundaries = excluded.boundaries,
                    area_km2 = excluded.area_km2,
                    no_take_area_km2 = excluded.no_take_area_km2,
                    implementation_status = excluded.implementation_status,
                    last_updated = excluded.last_updated
                "#,
            )?;
            for area in areas {
                let boundaries = area
                    .boundaries
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    area.mpatlas_id,
                    area.name,
                    area.designation,
                    area.protection_level.as_str(),
                    boundaries,
                    area.area_km2,
                    area.no_take_area_km2,
                    area.implementation_status,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!("Upserted {} protected areas", areas.len());
        Ok(areas.len())
    }

    fn get_area(&self, mpatlas_id: i64) -> StoreResult<Option<MarineProtectedArea>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT mpatlas_id, name, designation, protection_level, boundaries,
                        area_km2, no_take_area_km2, implementation_status
                 FROM marine_protected_areas WHERE mpatlas_id = ?1",
                params![mpatlas_id],
                Self::row_to_area,
            )
            .optional()?;

        match row {
            Some((mut area, boundaries)) => {
                area.boundaries = boundaries.map(|b| serde_json::from_str(&b)).transpose()?;
                Ok(Some(area))
            }
            None => Ok(None),
        }
    }
}

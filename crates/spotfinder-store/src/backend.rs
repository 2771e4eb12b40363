//! Store traits and error types.
//!
//! Callers depend on these traits rather than on SQLite so tests can swap in
//! counting or failing stores.

use chrono::{DateTime, Utc};
use spotfinder_core::AppError;
use spotfinder_geo::MarineProtectedArea;
use thiserror::Error;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database open/query failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Row to update does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend-specific failure (used by non-SQLite implementations).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::StoreUnavailable(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One row of the `fishing_spots` table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSpot {
    pub place_id: String,
    /// Canonical JSON of the species list
    pub fish_analysis: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When `fish_analysis` was last written. Description edits leave it alone.
    pub analyzed_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Cached spot analyses keyed by place identifier.
pub trait AnalysisStore: Send + Sync {
    /// Stored analysis for `place_id`, if any.
    fn get_analysis(&self, place_id: &str) -> StoreResult<Option<StoredSpot>>;

    /// Insert or replace the analysis for `place_id`. Last write wins; a
    /// replaced analysis loses its description so the backfill writes a new one.
    fn upsert_analysis(&self, place_id: &str, fish_analysis: &str) -> StoreResult<()>;

    /// Spots with an analysis but no description yet.
    fn spots_missing_description(&self) -> StoreResult<Vec<StoredSpot>>;

    /// Set the description of an existing spot.
    ///
    /// # Errors
    /// `StoreError::NotFound` when no row exists for `place_id`.
    fn set_description(&self, place_id: &str, description: &str) -> StoreResult<()>;
}

/// Named API credentials.
pub trait SecretStore: Send + Sync {
    fn get_secret(&self, key_name: &str) -> StoreResult<Option<String>>;

    fn set_secret(&self, key_name: &str, key_value: &str) -> StoreResult<()>;
}

/// Marine protected areas keyed by MPAtlas id.
pub trait ProtectedAreaStore: Send + Sync {
    /// Upsert every area; returns how many rows were written.
    fn upsert_areas(&self, areas: &[MarineProtectedArea]) -> StoreResult<usize>;

    fn get_area(&self, mpatlas_id: i64) -> StoreResult<Option<MarineProtectedArea>>;
}

//! Persistent key-value store for spotfinder.

pub mod backend;
pub mod secrets;
pub mod sqlite;

pub use backend::{
    AnalysisStore, ProtectedAreaStore, SecretStore, StoreError, StoreResult, StoredSpot,
};
pub use secrets::SecretResolver;
pub use sqlite::SqliteStore;

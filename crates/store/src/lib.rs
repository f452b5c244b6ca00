//! Document store access and timing persistence for rxpilot.
//!
//! - [`DocumentStoreClient`]: HTTP client for stored prescriptions and pending texts
//! - [`PrescriptionLookup`]: "most recent record or nothing" enrichment
//! - Timing sinks: SQLite (default), PostgreSQL (`postgres` feature), in-memory

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod connections;
pub mod document_store;
pub mod in_memory;
pub mod lookup;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use document_store::DocumentStoreClient;
pub use in_memory::InMemoryTimingSink;
pub use lookup::PrescriptionLookup;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTimingSink;

#[cfg(feature = "postgres")]
pub use postgres::PgTimingSink;

use rxpilot_core::error::StoreError;
use rxpilot_core::prescription::TimingSink;
use std::sync::Arc;

/// Open the timing sink named by a persistence URL.
///
/// `sqlite:` and `postgres:`/`postgresql:` URLs select the database backends;
/// `memory` keeps records in process.
pub fn open_timing_sink(database_url: &str) -> Result<Arc<dyn TimingSink>, StoreError> {
    if database_url == "memory" {
        return Ok(Arc::new(InMemoryTimingSink::new()));
    }

    #[cfg(feature = "sqlite")]
    if database_url.starts_with("sqlite:") {
        return Ok(Arc::new(SqliteTimingSink::new(database_url)?));
    }

    #[cfg(feature = "postgres")]
    if database_url.starts_with("postgres:") || database_url.starts_with("postgresql:") {
        return Ok(Arc::new(PgTimingSink::new(database_url)?));
    }

    Err(StoreError::Storage(format!(
        "unsupported persistence URL '{database_url}' (is the backend feature enabled?)"
    )))
}

//! SQLite timing sink.
//!
//! One table, `inference_timings`, one row per processed batch item.
//! The sink holds only connection options: every batch run opens its own
//! connection and closes it when the run ends.

use async_trait::async_trait;
use chrono::Utc;
use rxpilot_core::error::StoreError;
use rxpilot_core::prescription::{InferenceTimingRecord, TimingSession, TimingSink};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::{Connection, Row};
use std::str::FromStr;
use tracing::debug;

use crate::connections::{ConnectionCounter, LiveConnection};

pub struct SqliteTimingSink {
    options: SqliteConnectOptions,
    connections: ConnectionCounter,
}

impl SqliteTimingSink {
    /// Sink for the database at `url`, created on first use if missing.
    ///
    /// Nothing is opened until a run starts. `"sqlite::memory:"` gives each
    /// session its own throwaway database.
    pub fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        Ok(Self {
            options,
            connections: ConnectionCounter::default(),
        })
    }

    /// Connections currently held by open sessions.
    pub fn live_connections(&self) -> usize {
        self.connections.live()
    }

    async fn connect(&self) -> Result<SqliteConnection, StoreError> {
        let mut conn = SqliteConnection::connect_with(&self.options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;
        run_migrations(&mut conn).await?;
        Ok(conn)
    }

    /// Most recent records first, read over a short-lived connection.
    pub async fn recent(&self, limit: u32) -> Result<Vec<InferenceTimingRecord>, StoreError> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(
            r#"
            SELECT user_email, input_text, response, time_taken_ms, created_at
            FROM inference_timings
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&mut conn)
        .await
        .map_err(|e| StoreError::Storage(format!("recent timings: {e}")));

        close(conn).await?;
        rows?.iter().map(row_to_record).collect()
    }
}

async fn run_migrations(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inference_timings (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            user_email    TEXT NOT NULL,
            input_text    TEXT NOT NULL,
            response      TEXT NOT NULL,
            time_taken_ms INTEGER NOT NULL,
            created_at    TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::MigrationFailed(format!("inference_timings table: {e}")))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_inference_timings_email ON inference_timings(user_email)",
    )
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::MigrationFailed(format!("user_email index: {e}")))?;

    Ok(())
}

async fn close(conn: SqliteConnection) -> Result<(), StoreError> {
    conn.close()
        .await
        .map_err(|e| StoreError::Storage(format!("Failed to close SQLite connection: {e}")))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<InferenceTimingRecord, StoreError> {
    let column = |name: &str, e: sqlx::Error| StoreError::Storage(format!("{name} column: {e}"));

    let created_at_str: String = row.try_get("created_at").map_err(|e| column("created_at", e))?;
    let elapsed: i64 = row.try_get("time_taken_ms").map_err(|e| column("time_taken_ms", e))?;

    Ok(InferenceTimingRecord {
        owner_email: row.try_get("user_email").map_err(|e| column("user_email", e))?,
        input_text: row.try_get("input_text").map_err(|e| column("input_text", e))?,
        model_response: row.try_get("response").map_err(|e| column("response", e))?,
        elapsed_ms: elapsed.max(0) as u64,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[async_trait]
impl TimingSink for SqliteTimingSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn open(&self) -> Result<Box<dyn TimingSession>, StoreError> {
        let conn = self.connect().await?;
        debug!("SQLite timing session opened");
        Ok(Box::new(SqliteTimingSession {
            conn,
            _live: self.connections.track(),
        }))
    }
}

struct SqliteTimingSession {
    conn: SqliteConnection,
    _live: LiveConnection,
}

#[async_trait]
impl TimingSession for SqliteTimingSession {
    async fn insert(&mut self, record: &InferenceTimingRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inference_timings (user_email, input_text, response, time_taken_ms, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&record.owner_email)
        .bind(&record.input_text)
        .bind(&record.model_response)
        .bind(record.elapsed_ms as i64)
        .bind(record.created_at.to_rfc3339())
        .execute(&mut self.conn)
        .await
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        let Self { conn, _live } = *self;
        let closed = close(conn).await;
        debug!("SQLite timing session closed");
        closed
    }
}

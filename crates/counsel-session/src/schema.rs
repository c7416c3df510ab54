//! Session database schema.
//!
//! Timestamps are stored as RFC 3339 text in UTC with a fixed precision so
//! that string comparison orders them correctly.

use counsel_core::StorageError;
use sqlx::SqlitePool;

/// Statements applied on connect, in order.
pub const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        user_id TEXT,
        created_at TEXT NOT NULL,
        last_active TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS turns (
        session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        sequence_no INTEGER NOT NULL,
        query TEXT NOT NULL,
        decision TEXT,
        invocations TEXT NOT NULL,
        response TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (session_id, sequence_no)
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_sessions_last_active ON sessions(last_active)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)",
];

/// Apply the schema. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<(), StorageError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| StorageError::query(format!("schema: {e}")))?;
    }
    Ok(())
}

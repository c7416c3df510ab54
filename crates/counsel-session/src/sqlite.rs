//! SQLite session backend.

use crate::backend::SessionBackend;
use crate::pool::{self, PoolConfig};
use crate::schema;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use counsel_core::{Session, SessionId, StorageError, Turn, UserId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

fn query_error(err: sqlx::Error) -> StorageError {
    StorageError::query(err.to_string())
}

fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("invalid timestamp '{value}': {e}")))
}

/// Session backend on SQLite via sqlx
#[derive(Debug, Clone)]
pub struct SqliteSessionBackend {
    pool: SqlitePool,
}

impl SqliteSessionBackend {
    /// Connect and apply the schema
    pub async fn connect(config: &PoolConfig) -> Result<Self, StorageError> {
        let pool = pool::connect(config).await?;
        schema::apply(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool, applying the schema
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        schema::apply(&pool).await?;
        Ok(Self { pool })
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn turn_from_row(row: &SqliteRow) -> Result<Turn, StorageError> {
        let sequence_no: i64 = row.try_get("sequence_no").map_err(query_error)?;
        let decision: Option<String> = row.try_get("decision").map_err(query_error)?;
        let invocations: String = row.try_get("invocations").map_err(query_error)?;
        let created_at: String = row.try_get("created_at").map_err(query_error)?;

        Ok(Turn {
            sequence_no: sequence_no as u64,
            query: row.try_get("query").map_err(query_error)?,
            decision: decision.as_deref().map(serde_json::from_str).transpose()?,
            invocations: serde_json::from_str(&invocations)?,
            response: row.try_get("response").map_err(query_error)?,
            created_at: decode_time(&created_at)?,
        })
    }

    async fn upsert_session<'e, E>(executor: E, session: &Session) -> Result<(), StorageError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            r"
            INSERT INTO sessions (id, user_id, created_at, last_active)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                user_id = COALESCE(excluded.user_id, sessions.user_id),
                last_active = excluded.last_active
            ",
        )
        .bind(session.id.as_str())
        .bind(session.user_id.as_ref().map(UserId::as_str))
        .bind(encode_time(session.created_at))
        .bind(encode_time(session.last_active))
        .execute(executor)
        .await
        .map_err(query_error)?;
        Ok(())
    }
}

#[async_trait]
impl SessionBackend for SqliteSessionBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, id: &SessionId) -> Result<Option<Session>, StorageError> {
        let Some(header) = sqlx::query(
            "SELECT id, user_id, created_at, last_active FROM sessions WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?
        else {
            return Ok(None);
        };

        let user_id: Option<String> = header.try_get("user_id").map_err(query_error)?;
        let created_at: String = header.try_get("created_at").map_err(query_error)?;
        let last_active: String = header.try_get("last_active").map_err(query_error)?;

        let rows = sqlx::query(
            r"
            SELECT sequence_no, query, decision, invocations, response, created_at
            FROM turns WHERE session_id = ?1 ORDER BY sequence_no ASC
            ",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        let turns = rows
            .iter()
            .map(Self::turn_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(session_id = %id, turns = turns.len(), "Loaded session from sqlite");

        Ok(Some(Session {
            id: id.clone(),
            user_id: user_id.map(UserId::new),
            created_at: decode_time(&created_at)?,
            last_active: decode_time(&last_active)?,
            turns,
        }))
    }

    async fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        Self::upsert_session(&self.pool, session).await
    }

    async fn append_turn(&self, session: &Session, turn: &Turn) -> Result<(), StorageError> {
        let decision = turn.decision.as_ref().map(serde_json::to_string).transpose()?;
        let invocations = serde_json::to_string(&turn.invocations)?;

        let mut tx = self.pool.begin().await.map_err(query_error)?;
        Self::upsert_session(&mut *tx, session).await?;
        sqlx::query(
            r"
            INSERT INTO turns (session_id, sequence_no, query, decision, invocations, response, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(session.id.as_str())
        .bind(turn.sequence_no as i64)
        .bind(&turn.query)
        .bind(decision)
        .bind(invocations)
        .bind(&turn.response)
        .bind(encode_time(turn.created_at))
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;
        tx.commit().await.map_err(query_error)?;
        Ok(())
    }

    async fn delete_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<SessionId>, StorageError> {
        let cutoff = encode_time(cutoff);
        let mut tx = self.pool.begin().await.map_err(query_error)?;

        let ids: Vec<(String,)> = sqlx::query_as("SELECT id FROM sessions WHERE last_active < ?1")
            .bind(&cutoff)
            .fetch_all(&mut *tx)
            .await
            .map_err(query_error)?;

        sqlx::query(
            "DELETE FROM turns WHERE session_id IN (SELECT id FROM sessions WHERE last_active < ?1)",
        )
        .bind(&cutoff)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;
        sqlx::query("DELETE FROM sessions WHERE last_active < ?1")
            .bind(&cutoff)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;
        Ok(ids.into_iter().map(|(id,)| SessionId::new(id)).collect())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(count as u64)
    }
}

//! Persistence interface for the session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use counsel_core::{Session, SessionId, StorageError, Turn};

/// Durable session storage.
///
/// Implementations only report errors; the store decides how to degrade.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Load a session with all its turns
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, StorageError>;

    /// Insert or update the session header (user, timestamps)
    async fn save_session(&self, session: &Session) -> Result<(), StorageError>;

    /// Persist one appended turn and refresh the session header
    async fn append_turn(&self, session: &Session, turn: &Turn) -> Result<(), StorageError>;

    /// Delete sessions idle since before `cutoff`, returning their ids
    async fn delete_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<SessionId>, StorageError>;

    /// Number of stored sessions
    async fn count(&self) -> Result<u64, StorageError>;
}

//! Session ordering, persistence, and degradation through the coordinator

use crate::fixtures::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use counsel_agents::CoordinatorSettings;
use counsel_core::{AgentId, Session, SessionId, StorageError, Turn, UserId};
use counsel_session::{PoolConfig, SessionBackend, SessionStore, SqliteSessionBackend};
use futures::future::join_all;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

/// Backend whose every operation fails
struct FailingBackend;

#[async_trait]
impl SessionBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn load(&self, _id: &SessionId) -> Result<Option<Session>, StorageError> {
        Err(StorageError::connection("database is locked"))
    }

    async fn save_session(&self, _session: &Session) -> Result<(), StorageError> {
        Err(StorageError::connection("database is locked"))
    }

    async fn append_turn(&self, _session: &Session, _turn: &Turn) -> Result<(), StorageError> {
        Err(StorageError::query("disk I/O error"))
    }

    async fn delete_idle(&self, _cutoff: DateTime<Utc>) -> Result<Vec<SessionId>, StorageError> {
        Err(StorageError::query("disk I/O error"))
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Err(StorageError::query("disk I/O error"))
    }
}

async fn sqlite_store(dir: &TempDir) -> SessionStore {
    let url = format!("sqlite://{}", dir.path().join("sessions.db").display());
    let backend = SqliteSessionBackend::connect(&PoolConfig::new(url)).await.unwrap();
    SessionStore::with_backend(Arc::new(backend))
}

#[tokio::test]
async fn test_concurrent_queries_get_consecutive_sequence_numbers() {
    const N: u64 = 50;
    let h = HarnessBuilder::new(balanced_registry())
        .settings(CoordinatorSettings::default().with_history_limit(2))
        .build();
    let session = SessionId::new("busy");

    let tasks = (0..N).map(|i| {
        let coordinator = h.coordinator.clone();
        let session = session.clone();
        tokio::spawn(async move {
            let query = if i % 2 == 0 { COST_QUERY } else { COMPARE_QUERY };
            coordinator.process(query, &session, None).await.unwrap()
        })
    });
    let mut sequence: Vec<u64> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().sequence_no.unwrap())
        .collect();
    sequence.sort_unstable();

    assert_eq!(sequence, (1..=N).collect::<Vec<_>>());

    let history = h.coordinator.sessions().history(&session, 100).await;
    let stored: Vec<u64> = history.iter().map(|t| t.sequence_no).collect();
    assert_eq!(stored, (1..=N).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_history_is_passed_to_provider_up_to_limit() {
    let h = HarnessBuilder::new(balanced_registry())
        .settings(CoordinatorSettings::default().with_history_limit(2))
        .build();
    let session = SessionId::new("s");

    for _ in 0..4 {
        h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    }

    let lens: Vec<usize> = h.provider.calls().iter().map(|c| c.context_len).collect();
    assert_eq!(lens, vec![0, 2, 4, 4]);
}

#[tokio::test]
async fn test_blocked_turns_are_not_context() {
    let h = HarnessBuilder::new(balanced_registry()).build();
    let session = SessionId::new("s");

    h.coordinator.process(MOVIE_QUERY, &session, None).await.unwrap();
    h.coordinator.process(COST_QUERY, &session, None).await.unwrap();

    let calls = h.provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].context_len, 0);
    assert_eq!(h.coordinator.sessions().history(&session, 10).await.len(), 2);
}

#[tokio::test]
async fn test_blocked_turns_can_be_left_out() {
    let h = HarnessBuilder::new(balanced_registry())
        .settings(CoordinatorSettings::default().with_record_blocked_turns(false))
        .build();
    let session = SessionId::new("s");

    let blocked = h.coordinator.process(MOVIE_QUERY, &session, None).await.unwrap();
    assert_eq!(blocked.sequence_no, None);

    let routed = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    assert_eq!(routed.sequence_no, Some(1));
}

#[tokio::test]
async fn test_sessions_survive_restart() {
    let dir = TempDir::new().unwrap();
    let session = SessionId::new("persistent");
    let user = UserId::new("student-42");

    {
        let h = HarnessBuilder::new(balanced_registry())
            .sessions(sqlite_store(&dir).await)
            .build();
        h.coordinator.process(COST_QUERY, &session, Some(&user)).await.unwrap();
        h.coordinator.process(COMPARE_QUERY, &session, Some(&user)).await.unwrap();
    }

    let h = HarnessBuilder::new(balanced_registry())
        .sessions(sqlite_store(&dir).await)
        .build();

    let history = h.coordinator.sessions().history(&session, 10).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].query, COST_QUERY);
    assert_eq!(
        history[1].agents_used().cloned().collect::<Vec<_>>(),
        vec![AgentId::new("financial_aid"), AgentId::new("career_counselor")]
    );

    let third = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    assert_eq!(third.sequence_no, Some(3));
    assert_eq!(h.provider.calls()[0].context_len, 4);

    let restored = h.coordinator.sessions().get_or_create(&session, None).await;
    assert_eq!(restored.user_id, Some(user));
    assert_eq!(restored.turn_count(), 3);
}

#[tokio::test]
async fn test_storage_failure_degrades_with_warning() {
    let h = HarnessBuilder::new(balanced_registry())
        .sessions(SessionStore::with_backend(Arc::new(FailingBackend)))
        .build();
    let session = SessionId::new("s");

    let first = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    let second = h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    assert_eq!(first.sequence_no, Some(1));
    assert_eq!(second.sequence_no, Some(2));
    assert_eq!(h.coordinator.sessions().history(&session, 10).await.len(), 2);

    let warnings = h.tracer.warnings();
    assert!(!warnings.is_empty());
    assert!(warnings.iter().all(|w| w.component == "session_store"));
    assert!(warnings
        .iter()
        .any(|w| w.session_id.as_ref() == Some(&session) && w.message.contains("append_turn")));
}

#[tokio::test]
async fn test_unrecorded_blocked_query_leaves_no_session() {
    let dir = TempDir::new().unwrap();
    let h = HarnessBuilder::new(balanced_registry())
        .sessions(sqlite_store(&dir).await)
        .settings(CoordinatorSettings::default().with_record_blocked_turns(false))
        .build();
    let session = SessionId::new("s");

    let blocked = h.coordinator.process(MOVIE_QUERY, &session, None).await.unwrap();
    assert!(blocked.blocked);

    let sessions = h.coordinator.sessions();
    assert_eq!(sessions.session_count(), 0);
    assert_eq!(sessions.stored_session_count().await, 0);

    h.coordinator.process(COST_QUERY, &session, None).await.unwrap();
    assert_eq!(sessions.stored_session_count().await, 1);
}

//! Concurrency-safe session store.
//!
//! Sessions are cached in a `DashMap` of per-session async mutexes. Appends
//! to one session are serialized by its mutex; different sessions proceed
//! independently. The store assigns sequence numbers under the lock.
//!
//! Storage failures never reach the caller. A cached session only becomes
//! authoritative once the backend has been read for it; until then each
//! access retries the load. Turns appended in the meantime are kept in
//! memory with provisional sequence numbers and are renumbered after the
//! stored turns once the load succeeds. Turns the backend rejected are
//! retried on the next access. Every failure emits a [`TraceWarning`].

use crate::backend::SessionBackend;
use chrono::Utc;
use counsel_core::{NoopTracer, Session, SessionId, Tracer, TraceWarning, Turn, UserId};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "session_store";

/// Cached session plus its standing with the backend
#[derive(Debug)]
struct Entry {
    session: Session,
    /// The backend has been read for this session
    loaded: bool,
    /// Trailing turns not yet written to the backend
    pending: usize,
}

impl Entry {
    fn new(session: Session, loaded: bool) -> Self {
        Self {
            session,
            loaded,
            pending: 0,
        }
    }
}

/// Session store
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<Mutex<Entry>>>,
    backend: Option<Arc<dyn SessionBackend>>,
    tracer: Arc<dyn Tracer>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .finish_non_exhaustive()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl SessionStore {
    /// Store without persistence
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sessions: DashMap::new(),
            backend: None,
            tracer: Arc::new(NoopTracer),
        }
    }

    /// Store backed by durable storage
    #[must_use]
    pub fn with_backend(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend: Some(backend),
            ..Self::in_memory()
        }
    }

    /// Set the tracer that receives storage warnings
    #[must_use]
    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Whether a durable backend is configured
    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    fn degrade(&self, session_id: &SessionId, action: &str, err: &dyn std::fmt::Display) {
        warn!(session_id = %session_id, action, error = %err, "Session storage failed, continuing in memory");
        self.tracer.warn(
            TraceWarning::new(COMPONENT, format!("{action} failed: {err}")).for_session(session_id.clone()),
        );
    }

    async fn load_from_backend(&self, session_id: &SessionId) -> Option<Session> {
        let backend = self.backend.as_ref()?;
        match backend.load(session_id).await {
            Ok(session) => session,
            Err(err) => {
                self.degrade(session_id, "load", &err);
                None
            }
        }
    }

    /// Cached entry for a session, inserted unloaded on first access
    fn handle(&self, session_id: &SessionId, user_id: Option<&UserId>) -> Arc<Mutex<Entry>> {
        if let Some(existing) = self.sessions.get(session_id) {
            return Arc::clone(existing.value());
        }
        let loaded = self.backend.is_none();
        Arc::clone(
            self.sessions
                .entry(session_id.clone())
                .or_insert_with(|| {
                    debug!(session_id = %session_id, "Caching session");
                    Arc::new(Mutex::new(Entry::new(
                        Session::new(session_id.clone(), user_id.cloned()),
                        loaded,
                    )))
                })
                .value(),
        )
    }

    /// Read the backend for an entry that has not been loaded yet.
    ///
    /// Turns held locally are placed after the stored ones and marked
    /// pending. A session unknown to the backend is saved as is.
    async fn load_entry(&self, entry: &mut Entry) {
        let Some(backend) = &self.backend else {
            return;
        };
        if entry.loaded {
            return;
        }

        let session_id = entry.session.id.clone();
        match backend.load(&session_id).await {
            Ok(Some(mut stored)) => {
                let local = std::mem::take(&mut entry.session.turns);
                if stored.user_id.is_none() {
                    stored.user_id = entry.session.user_id.take();
                }
                entry.pending = local.len();
                for turn in local {
                    stored.push_turn(turn);
                }
                if entry.pending > 0 {
                    info!(
                        session_id = %session_id,
                        stored = stored.turn_count() - entry.pending,
                        held = entry.pending,
                        "Reconciled session with storage"
                    );
                }
                entry.session = stored;
                entry.loaded = true;
            }
            Ok(None) => {
                if let Err(err) = backend.save_session(&entry.session).await {
                    self.degrade(&session_id, "save_session", &err);
                }
                entry.pending = entry.session.turn_count();
                entry.loaded = true;
                debug!(session_id = %session_id, "Created session");
            }
            Err(err) => self.degrade(&session_id, "load", &err),
        }
    }

    /// Write pending turns in order, stopping at the first failure
    async fn flush(&self, entry: &mut Entry) {
        let Some(backend) = &self.backend else {
            return;
        };
        if !entry.loaded {
            return;
        }
        while entry.pending > 0 {
            let index = entry.session.turns.len() - entry.pending;
            let turn = &entry.session.turns[index];
            if let Err(err) = backend.append_turn(&entry.session, turn).await {
                self.degrade(&entry.session.id, "append_turn", &err);
                return;
            }
            entry.pending -= 1;
        }
    }

    async fn sync(&self, entry: &mut Entry) {
        self.load_entry(entry).await;
        self.flush(entry).await;
    }

    /// Snapshot of a session, creating it on first access
    pub async fn get_or_create(&self, session_id: &SessionId, user_id: Option<&UserId>) -> Session {
        let handle = self.handle(session_id, user_id);
        let mut entry = handle.lock().await;
        self.sync(&mut entry).await;
        if entry.session.user_id.is_none() {
            if let Some(user) = user_id {
                entry.session.user_id = Some(user.clone());
            }
        }
        entry.session.clone()
    }

    /// Append a turn, returning its assigned sequence number.
    ///
    /// While the backend cannot be read for the session, the number is
    /// provisional: it is reassigned after the stored turns on recovery.
    pub async fn append_turn(&self, session_id: &SessionId, turn: Turn) -> u64 {
        let handle = self.handle(session_id, None);
        let mut entry = handle.lock().await;
        self.load_entry(&mut entry).await;

        let sequence_no = entry.session.push_turn(turn);
        if self.backend.is_some() {
            entry.pending += 1;
            if entry.loaded {
                self.flush(&mut entry).await;
            } else {
                self.degrade(session_id, "append_turn", &"session not loaded, turn held in memory");
            }
        }

        debug!(session_id = %session_id, sequence_no, "Appended turn");
        sequence_no
    }

    /// Apply `view` to a session, reading uncached sessions from the
    /// backend without caching them
    async fn read<T>(&self, session_id: &SessionId, view: impl FnOnce(&Session) -> T) -> Option<T> {
        let cached = self.sessions.get(session_id).map(|h| Arc::clone(h.value()));
        if let Some(handle) = cached {
            let mut entry = handle.lock().await;
            self.sync(&mut entry).await;
            return Some(view(&entry.session));
        }
        self.load_from_backend(session_id).await.map(|s| view(&s))
    }

    /// The last `limit` turns in ascending order
    pub async fn history(&self, session_id: &SessionId, limit: usize) -> Vec<Turn> {
        self.read(session_id, |s| s.recent(limit).to_vec())
            .await
            .unwrap_or_default()
    }

    /// The last `limit` answered turns in ascending order, for provider context
    pub async fn context_turns(&self, session_id: &SessionId, limit: usize) -> Vec<Turn> {
        self.read(session_id, |s| s.recent_answered(limit))
            .await
            .unwrap_or_default()
    }

    /// Remove sessions idle for longer than `max_idle`, returning how many were removed
    pub async fn cleanup_inactive(&self, max_idle: Duration) -> usize {
        let max_idle = chrono::Duration::from_std(max_idle).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now().checked_sub_signed(max_idle).unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        let mut removed: HashSet<SessionId> = HashSet::new();

        // Sessions that are locked are in use and therefore not idle
        let idle: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .is_ok_and(|cached| cached.session.last_active < cutoff)
            })
            .map(|entry| entry.key().clone())
            .collect();

        for id in idle {
            if self.sessions.remove(&id).is_some() {
                removed.insert(id);
            }
        }

        if let Some(backend) = &self.backend {
            match backend.delete_idle(cutoff).await {
                Ok(ids) => removed.extend(ids),
                Err(err) => {
                    warn!(error = %err, "Failed to clean up persisted sessions");
                    self.tracer.warn(TraceWarning::new(COMPONENT, format!("cleanup failed: {err}")));
                }
            }
        }

        if !removed.is_empty() {
            info!(removed = removed.len(), "Cleaned up inactive sessions");
        }
        removed.len()
    }

    /// Number of cached sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of stored sessions, falling back to the cache count
    pub async fn stored_session_count(&self) -> usize {
        match &self.backend {
            Some(backend) => match backend.count().await {
                Ok(count) => count as usize,
                Err(err) => {
                    warn!(error = %err, "Failed to count persisted sessions");
                    self.session_count()
                }
            },
            None => self.session_count(),
        }
    }
}

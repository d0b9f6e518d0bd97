//! The Session Store: per-session mutual exclusion, creation, lookup, and
//! expiry sweeping.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::session::Session;

/// A session's state, guarded by its own lock. Holding this guard for the
/// duration of a turn is what gives the turn exclusive access to the
/// session (spec §5).
pub type SessionHandle = Arc<Mutex<Session>>;

/// Owns every live [`Session`], keyed by session id.
///
/// Each session is independently lockable, so two different sessions never
/// contend with each other; two requests against the *same* session id
/// serialize on that session's own lock.
pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
    timeout_seconds: u64,
    max_turns: u32,
}

impl SessionStore {
    #[must_use]
    pub fn new(timeout_seconds: u64, max_turns: u32) -> Self {
        Self {
            sessions: DashMap::new(),
            timeout_seconds,
            max_turns,
        }
    }

    #[must_use]
    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    #[must_use]
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Start a new session for `caller_id` on `channel`, returning its id.
    pub fn create(&self, caller_id: impl Into<String>, channel: impl Into<String>) -> String {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), caller_id.into(), channel.into(), Utc::now());
        self.sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        debug!(session_id = %id, "session created");
        id
    }

    /// Return the lockable handle for `id`, or `None` if the session does
    /// not exist, is inactive, or has expired (expiry marks it inactive
    /// and removes it as a side effect, per spec §4.2).
    pub async fn handle(&self, id: &str) -> Option<SessionHandle> {
        let entry = self.sessions.get(id)?;
        let handle = Arc::clone(entry.value());
        drop(entry);

        let expired = {
            let guard = handle.lock().await;
            !guard.active || guard.is_expired(Utc::now(), self.timeout_seconds)
        };
        if expired {
            self.sessions.remove(id);
            return None;
        }
        Some(handle)
    }

    /// Explicitly end a session, removing it from the store.
    pub fn end(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            debug!(session_id = %id, "session ended");
        }
    }

    /// Drop every session whose last activity is older than the
    /// configured timeout. Returns how many were swept. Intended to be
    /// called on a periodic interval by a background task, independent of
    /// any single request (spec §4.2).
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut expired_ids = Vec::new();
        for entry in &self.sessions {
            let guard = entry.value().lock().await;
            if !guard.active || guard.is_expired(now, self.timeout_seconds) {
                expired_ids.push(entry.key().clone());
            }
        }
        let count = expired_ids.len();
        for id in expired_ids {
            self.sessions.remove(&id);
        }
        if count > 0 {
            info!(count, "swept expired sessions");
        }
        count
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

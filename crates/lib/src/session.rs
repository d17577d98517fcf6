//! Conversation session identifiers.
//!
//! A session id is sent with every chat request so the backend can correlate turns.
//! Ids are never reused: a fresh one is issued at startup, on every bot switch and on every close.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique session identifier (opaque string).
pub type SessionId = String;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a new session id: `session-<unix ms>-<sequence><random>`.
///
/// The process-wide sequence keeps ids distinct even when two are issued in the same millisecond.
pub fn generate_session_id() -> SessionId {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("session-{}-{:x}{}", millis, seq, &random[..9])
}

/// Owns the current session id and rotates it.
#[derive(Debug, Clone)]
pub struct SessionManager {
    current: SessionId,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// Start with a freshly generated session.
    pub fn new() -> Self {
        let current = generate_session_id();
        log::info!("session started: {}", current);
        Self { current }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Replace the current session with a new one; returns the new id.
    pub fn rotate(&mut self) -> SessionId {
        let next = generate_session_id();
        log::info!("session rotated: {} -> {}", self.current, next);
        self.current = next.clone();
        next
    }

    /// True if `id` is the session currently in use.
    pub fn is_current(&self, id: &str) -> bool {
        self.current == id
    }
}

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Notify;

/// Lifecycle of one interview session. Transitions are monotonic in
/// declaration order, except `Failed` (reachable from any non-terminal
/// state) and `Ended` (reachable from anywhere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Joining,
    Connecting,
    Active,
    Completed,
    Ended,
    Failed,
}

impl SessionStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Joining => 1,
            Self::Connecting => 2,
            Self::Active => 3,
            Self::Completed => 4,
            Self::Ended => 5,
            Self::Failed => 6,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Failed)
    }

    pub fn can_advance_to(self, next: SessionStatus) -> bool {
        match next {
            _ if next == self => true,
            SessionStatus::Ended => true,
            SessionStatus::Failed => !self.is_terminal(),
            _ => !self.is_terminal() && next.rank() > self.rank(),
        }
    }
}

/// One tracked interview attempt. Mutated by the controller task as the
/// interview progresses and by HTTP notifications; the `shutdown` handle
/// is how an explicit end-request interrupts the controller mid-wait.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session_id: String,
    pub room_name: String,
    pub candidate_id: String,
    pub candidate_name: String,
    pub job_id: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub candidate_joined_at: Option<DateTime<Utc>>,
    pub connected: bool,
    pub current_question: Option<String>,
    /// 0.0..=100.0
    pub progress: f64,
    pub shutdown: Arc<Notify>,
}

impl SessionEntry {
    pub fn new(
        session_id: impl Into<String>,
        room_name: impl Into<String>,
        candidate_id: impl Into<String>,
        candidate_name: impl Into<String>,
        job_id: impl Into<String>,
        status: SessionStatus,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            room_name: room_name.into(),
            candidate_id: candidate_id.into(),
            candidate_name: candidate_name.into(),
            job_id: job_id.into(),
            status,
            started_at: Utc::now(),
            candidate_joined_at: None,
            connected: false,
            current_question: None,
            progress: 0.0,
            shutdown: Arc::new(Notify::new()),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no session for candidate {0}")]
    NotFound(String),
}

/// In-memory session store keyed by candidate id. An explicitly owned
/// value: constructed once at startup, injected into the API layer, and
/// gone with the process (no persistence). The DashMap backing gives
/// per-entry serialization without cross-key contention.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<DashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a session, returning the entry it replaced, if any.
    pub fn insert(&self, entry: SessionEntry) -> Option<SessionEntry> {
        self.inner.insert(entry.candidate_id.clone(), entry)
    }

    /// Snapshot of a session by candidate id.
    pub fn get(&self, candidate_id: &str) -> Option<SessionEntry> {
        self.inner.get(candidate_id).map(|e| e.value().clone())
    }

    pub fn update<F>(&self, candidate_id: &str, mutate: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut SessionEntry),
    {
        match self.inner.get_mut(candidate_id) {
            Some(mut entry) => {
                mutate(&mut entry);
                Ok(())
            }
            None => Err(RegistryError::NotFound(candidate_id.to_string())),
        }
    }

    /// Advances a session's status, refusing transitions the lifecycle
    /// does not allow (e.g. regressing out of a terminal state).
    pub fn update_status(
        &self,
        candidate_id: &str,
        status: SessionStatus,
    ) -> Result<(), RegistryError> {
        self.update(candidate_id, |entry| {
            if entry.status.can_advance_to(status) {
                entry.status = status;
            } else {
                tracing::warn!(
                    candidate_id = %entry.candidate_id,
                    from = ?entry.status,
                    to = ?status,
                    "ignoring disallowed status transition"
                );
            }
        })
    }

    /// Mutates the session bound to a room, returning its session id.
    /// Used by notifications that address sessions by room rather than
    /// by candidate.
    pub fn update_by_room<F>(&self, room_name: &str, mutate: F) -> Result<String, RegistryError>
    where
        F: FnOnce(&mut SessionEntry),
    {
        for mut entry in self.inner.iter_mut() {
            if entry.room_name == room_name {
                mutate(&mut entry);
                return Ok(entry.session_id.clone());
            }
        }
        Err(RegistryError::NotFound(room_name.to_string()))
    }

    pub fn remove(&self, candidate_id: &str) -> Option<SessionEntry> {
        self.inner.remove(candidate_id).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(candidate_id: &str, room: &str) -> SessionEntry {
        SessionEntry::new(
            format!("session_{room}"),
            room,
            candidate_id,
            "Candidate",
            "job-1",
            SessionStatus::Connecting,
        )
    }

    #[test]
    fn insert_get_update_remove_round_trip() {
        let registry = SessionRegistry::new();
        registry.insert(entry("c1", "room-1"));

        registry
            .update("c1", |e| e.current_question = Some("Q1".to_string()))
            .unwrap();
        let got = registry.get("c1").unwrap();
        assert_eq!(got.current_question.as_deref(), Some("Q1"));

        assert!(registry.remove("c1").is_some());
        assert!(registry.get("c1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn update_on_unknown_candidate_is_not_found() {
        let registry = SessionRegistry::new();
        let err = registry.update("ghost", |_| {}).unwrap_err();
        assert_eq!(err, RegistryError::NotFound("ghost".to_string()));
    }

    #[test]
    fn insert_reports_the_replaced_session() {
        let registry = SessionRegistry::new();
        registry.insert(entry("c1", "room-1"));
        let replaced = registry.insert(entry("c1", "room-2")).unwrap();
        assert_eq!(replaced.room_name, "room-1");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn update_by_room_finds_the_matching_session() {
        let registry = SessionRegistry::new();
        registry.insert(entry("c1", "room-1"));
        registry.insert(entry("c2", "room-2"));

        let session_id = registry
            .update_by_room("room-2", |e| e.candidate_joined_at = Some(Utc::now()))
            .unwrap();
        assert_eq!(session_id, "session_room-2");
        assert!(registry.get("c2").unwrap().candidate_joined_at.is_some());
        assert!(registry.get("c1").unwrap().candidate_joined_at.is_none());
    }

    #[test]
    fn status_transitions_are_monotonic() {
        use SessionStatus::*;
        assert!(Connecting.can_advance_to(Active));
        assert!(Active.can_advance_to(Completed));
        assert!(!Active.can_advance_to(Connecting));
        assert!(!Completed.can_advance_to(Active));
        // Completed sessions can still be explicitly ended.
        assert!(Completed.can_advance_to(Ended));
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_state() {
        use SessionStatus::*;
        for status in [Pending, Joining, Connecting, Active, Completed] {
            assert!(status.can_advance_to(Failed), "{status:?}");
        }
        assert!(!Ended.can_advance_to(Failed));
        assert!(!Ended.can_advance_to(Active));
    }

    #[test]
    fn disallowed_status_update_is_ignored_in_place() {
        let registry = SessionRegistry::new();
        registry.insert(entry("c1", "room-1"));
        registry.update_status("c1", SessionStatus::Ended).unwrap();
        registry.update_status("c1", SessionStatus::Active).unwrap();
        assert_eq!(registry.get("c1").unwrap().status, SessionStatus::Ended);
    }
}

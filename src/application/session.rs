use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::{ChatHistory, DomainError, PageCursor, UploadLedger};

/// State owned by one interactive client.
///
/// Pagination cursors and chat histories are keyed by store resource name so
/// switching stores back and forth keeps each store's position and history.
#[derive(Debug, Default)]
pub struct Session {
    selected_store: Option<String>,
    cursors: HashMap<String, PageCursor>,
    chats: HashMap<String, ChatHistory>,
    uploads: UploadLedger,
    last_answer: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_store(&mut self, store: impl Into<String>) {
        self.selected_store = Some(store.into());
    }

    pub fn clear_selection(&mut self) {
        self.selected_store = None;
    }

    pub fn selected_store(&self) -> Option<&str> {
        self.selected_store.as_deref()
    }

    /// The selected store, or a validation error when none is selected.
    pub fn require_store(&self) -> Result<String, DomainError> {
        self.selected_store
            .clone()
            .ok_or_else(|| DomainError::validation("no store selected"))
    }

    pub fn cursor(&self, store: &str) -> Option<&PageCursor> {
        self.cursors.get(store)
    }

    pub fn cursor_mut(&mut self, store: &str) -> &mut PageCursor {
        self.cursors.entry(store.to_string()).or_default()
    }

    pub fn current_token(&self, store: &str) -> Option<String> {
        self.cursor(store)
            .and_then(|c| c.current_token())
            .map(str::to_string)
    }

    pub fn reset_all_cursors(&mut self) {
        self.cursors.values_mut().for_each(PageCursor::reset);
    }

    pub fn chat(&self, store: &str) -> Option<&ChatHistory> {
        self.chats.get(store)
    }

    pub fn chat_mut(&mut self, store: &str) -> &mut ChatHistory {
        self.chats.entry(store.to_string()).or_default()
    }

    pub fn uploads(&self) -> &UploadLedger {
        &self.uploads
    }

    pub fn uploads_mut(&mut self) -> &mut UploadLedger {
        &mut self.uploads
    }

    pub fn last_answer(&self) -> Option<&str> {
        self.last_answer.as_deref()
    }

    pub fn set_last_answer(&mut self, answer: impl Into<String>) {
        self.last_answer = Some(answer.into());
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

struct SessionEntry {
    session: SharedSession,
    last_seen: Instant,
}

/// Sessions keyed by client-provided id. Each session is isolated behind its
/// own async lock; nothing mutable is shared between sessions.
///
/// A session unused for `idle_timeout` is dropped, and once `max_sessions`
/// are live the least recently used one makes room for a new id.
pub struct SessionRegistry {
    sessions: std::sync::Mutex<HashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: std::sync::Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn get_or_create(&self, id: Uuid) -> Result<SharedSession, DomainError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let now = Instant::now();

        if let Some(entry) = sessions.get_mut(&id) {
            if now.duration_since(entry.last_seen) < self.idle_timeout {
                entry.last_seen = now;
                return Ok(entry.session.clone());
            }
        }

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        if sessions.len() < before {
            tracing::debug!(expired = before - sessions.len(), "idle sessions dropped");
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::info!(session_id = %oldest, "session limit reached, evicted least recent");
            }
        }

        let session = Arc::new(Mutex::new(Session::new()));
        sessions.insert(
            id,
            SessionEntry {
                session: session.clone(),
                last_seen: now,
            },
        );
        tracing::debug!(session_id = %id, "session created");
        Ok(session)
    }

    /// Ends a session. Returns whether it existed.
    pub fn remove(&self, id: &Uuid) -> bool {
        self.sessions
            .lock()
            .map(|mut s| s.remove(id).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_store_without_selection() {
        let session = Session::new();
        assert!(matches!(
            session.require_store(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_cursors_are_per_store() {
        let mut session = Session::new();
        session.cursor_mut("fileSearchStores/a").advance(Some("t1")).unwrap();

        assert_eq!(session.current_token("fileSearchStores/a").as_deref(), Some("t1"));
        assert_eq!(session.current_token("fileSearchStores/b"), None);
    }

    #[tokio::test]
    async fn test_registry_isolates_sessions() {
        let registry = SessionRegistry::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        registry
            .get_or_create(a)
            .unwrap()
            .lock()
            .await
            .select_store("fileSearchStores/a");

        let same = registry.get_or_create(a).unwrap();
        let other = registry.get_or_create(b).unwrap();

        assert_eq!(same.lock().await.selected_store(), Some("fileSearchStores/a"));
        assert_eq!(other.lock().await.selected_store(), None);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 100);
        let idle = Uuid::new_v4();
        registry
            .get_or_create(idle)
            .unwrap()
            .lock()
            .await
            .select_store("fileSearchStores/a");

        tokio::time::advance(Duration::from_secs(61)).await;
        registry.get_or_create(Uuid::new_v4()).unwrap();

        assert_eq!(registry.len(), 1);
        let fresh = registry.get_or_create(idle).unwrap();
        assert_eq!(fresh.lock().await.selected_store(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_use_keeps_session_alive() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 100);
        let id = Uuid::new_v4();
        registry.get_or_create(id).unwrap();

        tokio::time::advance(Duration::from_secs(40)).await;
        registry.get_or_create(id).unwrap();
        tokio::time::advance(Duration::from_secs(40)).await;
        registry.get_or_create(Uuid::new_v4()).unwrap();

        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_evicts_least_recently_used() {
        let registry = SessionRegistry::new(Duration::from_secs(3600), 2);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        registry.get_or_create(first).unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        registry.get_or_create(second).unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        registry.get_or_create(first).unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        registry.get_or_create(Uuid::new_v4()).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(!registry.remove(&second));
        assert!(registry.remove(&first));
    }
}

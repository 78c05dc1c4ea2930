//! Session store keyed by chat.
//!
//! ```text
//! +-------------------------------------------+
//! |  SessionStore (DashMap)                   |
//! |    +-- chat 1: Arc<Mutex<Session>>        |
//! |    +-- chat 2: Arc<Mutex<Session>>        |
//! +-------------------------------------------+
//! ```
//!
//! The per-chat mutex is a `tokio` mutex: the state machine holds it across
//! record store and transcription calls. Events of one chat are already
//! serialised by the dispatcher, so the lock is never contended in practice.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use super::event::ChatId;
use super::session::Session;

/// Idle time after which an abandoned session is dropped - 30 minutes (default)
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_activity: RwLock<Instant>,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new())),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    fn is_idle(&self, ttl: Duration) -> bool {
        self.last_activity.read().elapsed() > ttl
    }
}

/// Concurrent map of chat sessions.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<ChatId, SessionEntry>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session of `chat`, created `Idle` when absent. Marks the chat active.
    pub fn get_or_create(&self, chat: ChatId) -> Arc<Mutex<Session>> {
        let entry = self.sessions.entry(chat).or_insert_with(SessionEntry::new);
        entry.touch();
        entry.session.clone()
    }

    pub fn get(&self, chat: ChatId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(&chat).map(|e| e.session.clone())
    }

    pub fn remove(&self, chat: ChatId) -> bool {
        self.sessions.remove(&chat).is_some()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, chat: ChatId) -> bool {
        self.sessions.contains_key(&chat)
    }

    /// Drop sessions with no activity for longer than `ttl`.
    ///
    /// A session whose lock is held (an event is being handled) is kept.
    /// Returns the number of sessions removed.
    pub fn cleanup_idle(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|chat, entry| {
            let idle = entry.is_idle(ttl) && entry.session.try_lock().is_ok();
            if idle {
                tracing::info!("Dropped idle session of chat {}", chat);
            }
            !idle
        });
        before.saturating_sub(self.sessions.len())
    }

    #[cfg(test)]
    fn backdate(&self, chat: ChatId, by: Duration) {
        if let Some(entry) = self.sessions.get(&chat) {
            let shifted = Instant::now()
                .checked_sub(by)
                .unwrap_or_else(Instant::now);
            *entry.last_activity.write() = shifted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ConversationState;

    #[tokio::test]
    async fn get_or_create_returns_the_same_session() {
        let store = SessionStore::new();

        let first = store.get_or_create(7);
        first.lock().await.begin();

        let second = store.get_or_create(7);
        assert_eq!(second.lock().await.state(), ConversationState::Choosing);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn chats_are_isolated() {
        let store = SessionStore::new();
        store.get_or_create(1);
        store.get_or_create(2);

        assert_eq!(store.count(), 2);
        assert!(store.remove(1));
        assert!(!store.contains(1));
        assert!(store.contains(2));
        assert!(!store.remove(1));
    }

    #[test]
    fn cleanup_removes_only_idle_sessions() {
        let store = SessionStore::new();
        store.get_or_create(1);
        store.get_or_create(2);
        store.backdate(1, Duration::from_secs(120));

        let removed = store.cleanup_idle(Duration::from_secs(60));

        assert_eq!(removed, 1);
        assert!(!store.contains(1));
        assert!(store.contains(2));
    }

    #[tokio::test]
    async fn cleanup_keeps_locked_sessions() {
        let store = SessionStore::new();
        let session = store.get_or_create(1);
        store.backdate(1, Duration::from_secs(120));

        let _guard = session.lock().await;
        assert_eq!(store.cleanup_idle(Duration::from_secs(60)), 0);
        assert!(store.contains(1));
    }

    #[test]
    fn get_does_not_create() {
        let store = SessionStore::new();
        assert!(store.get(5).is_none());
        assert_eq!(store.count(), 0);
    }
}

//! Session Store
//!
//! One conversation per agent, shared by every connected client. Each
//! session sits behind its own async mutex so the router can hold it across
//! the completion call: exchanges with the same agent are serialized while
//! different agents proceed in parallel.

use crate::agents::AgentId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The human side
    User,
    /// The agent's generated reply
    Agent,
}

/// One entry in a conversation
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    /// Who said it
    pub speaker: Speaker,
    /// What was said
    pub text: String,
    /// When it was appended
    pub at: DateTime<Utc>,
}

impl Turn {
    /// A user turn stamped now
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            at: Utc::now(),
        }
    }

    /// An agent turn stamped now
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Agent,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Conversation history for one agent
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSession {
    /// Owning agent
    pub agent: AgentId,
    /// Turns in arrival order
    pub turns: Vec<Turn>,
    /// Turns dropped by the retention policy so far
    pub dropped_turns: usize,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last append timestamp
    pub last_active_at: DateTime<Utc>,
}

impl ConversationSession {
    fn new(agent: AgentId) -> Self {
        let now = Utc::now();
        Self {
            agent,
            turns: Vec::new(),
            dropped_turns: 0,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Number of retained turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether nothing has been retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, turn: Turn, max_turns: usize) {
        self.last_active_at = turn.at;
        self.turns.push(turn);

        if max_turns > 0 && self.turns.len() > max_turns {
            let mut excess = self.turns.len() - max_turns;
            // History must not open with a reply whose prompt was dropped
            while excess < self.turns.len() && self.turns[excess].speaker == Speaker::Agent {
                excess += 1;
            }
            self.turns.drain(..excess);
            self.dropped_turns += excess;
        }
    }
}

/// Exclusive access to one agent's session.
///
/// Dereferences to the session for reading; appends go through
/// [`SessionGuard::append`] so the retention policy always applies.
pub struct SessionGuard {
    session: OwnedMutexGuard<ConversationSession>,
    max_turns: usize,
}

impl SessionGuard {
    /// Append a turn, trimming the oldest turns past the retention limit
    pub fn append(&mut self, turn: Turn) {
        self.session.push(turn, self.max_turns);
    }
}

impl Deref for SessionGuard {
    type Target = ConversationSession;

    fn deref(&self) -> &ConversationSession {
        &self.session
    }
}

/// Per-agent session store
pub struct SessionStore {
    sessions: RwLock<HashMap<AgentId, Arc<Mutex<ConversationSession>>>>,
    max_turns: usize,
}

impl SessionStore {
    /// Store without a retention limit
    pub fn new() -> Self {
        Self::with_max_turns(0)
    }

    /// Store keeping at most `max_turns` turns per agent (0 = unbounded)
    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns,
        }
    }

    /// Configured retention limit
    #[must_use]
    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    async fn handle(&self, agent: AgentId) -> Arc<Mutex<ConversationSession>> {
        if let Some(handle) = self.sessions.read().await.get(&agent) {
            return handle.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(agent)
            .or_insert_with(|| {
                debug!(agent = %agent, "Creating session");
                Arc::new(Mutex::new(ConversationSession::new(agent)))
            })
            .clone()
    }

    /// Copy of the agent's session, created empty if absent
    pub async fn get(&self, agent: AgentId) -> ConversationSession {
        let handle = self.handle(agent).await;
        let session = handle.lock().await;
        session.clone()
    }

    /// Copy of the agent's session without creating one
    pub async fn snapshot(&self, agent: AgentId) -> Option<ConversationSession> {
        let handle = self.sessions.read().await.get(&agent).cloned()?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Lock the agent's session, creating it empty if absent.
    ///
    /// Holders of the guard have exclusive access until it is dropped.
    pub async fn lock(&self, agent: AgentId) -> SessionGuard {
        let handle = self.handle(agent).await;
        SessionGuard {
            session: handle.lock_owned().await,
            max_turns: self.max_turns,
        }
    }

    /// Append a single turn
    pub async fn append(&self, agent: AgentId, turn: Turn) {
        self.lock(agent).await.append(turn);
    }

    /// Forget an agent's history.
    ///
    /// Returns the number of turns removed, or `None` if the agent had no
    /// session. The count and the reset happen under the agent's lock.
    pub async fn clear(&self, agent: AgentId) -> Option<usize> {
        let handle = self.sessions.read().await.get(&agent).cloned()?;
        let mut session = handle.lock().await;
        let cleared = session.len();
        *session = ConversationSession::new(agent);
        Some(cleared)
    }

    /// Number of sessions created so far
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session has been created yet
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_creates_lazily_and_is_idempotent() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let first = store.get(AgentId::QaTester).await;
        let second = store.get(AgentId::QaTester).await;

        assert!(first.is_empty());
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_does_not_create() {
        let store = SessionStore::new();
        assert!(store.snapshot(AgentId::BackendDeveloper).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = SessionStore::new();
        store.append(AgentId::SoftwareEngineer, Turn::user("a")).await;
        store.append(AgentId::SoftwareEngineer, Turn::agent("b")).await;
        store.append(AgentId::SoftwareEngineer, Turn::user("c")).await;

        let session = store.get(AgentId::SoftwareEngineer).await;
        let texts: Vec<_> = session.turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(session.turns[1].speaker, Speaker::Agent);
    }

    #[tokio::test]
    async fn test_retention_drops_oldest() {
        let store = SessionStore::with_max_turns(4);
        for i in 0..6 {
            store
                .append(AgentId::FrontendDeveloper, Turn::user(format!("m{}", i)))
                .await;
        }

        let session = store.get(AgentId::FrontendDeveloper).await;
        assert_eq!(session.len(), 4);
        assert_eq!(session.dropped_turns, 2);
        assert_eq!(session.turns[0].text, "m2");
        assert_eq!(session.turns[3].text, "m5");
    }

    #[tokio::test]
    async fn test_odd_retention_keeps_whole_exchanges() {
        let store = SessionStore::with_max_turns(3);
        for i in 0..2 {
            let mut session = store.lock(AgentId::QaTester).await;
            session.append(Turn::user(format!("q{}", i)));
            session.append(Turn::agent(format!("a{}", i)));
        }

        let session = store.get(AgentId::QaTester).await;
        let texts: Vec<_> = session.turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["q1", "a1"]);
        assert_eq!(session.turns[0].speaker, Speaker::User);
        assert_eq!(session.dropped_turns, 2);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new();
        store.append(AgentId::QaTester, Turn::user("qa")).await;

        assert_eq!(store.get(AgentId::QaTester).await.len(), 1);
        assert!(store.get(AgentId::BackendDeveloper).await.is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = SessionStore::new();
        assert_eq!(store.clear(AgentId::QaTester).await, None);

        store.append(AgentId::QaTester, Turn::user("x")).await;
        store.append(AgentId::QaTester, Turn::agent("y")).await;
        assert_eq!(store.clear(AgentId::QaTester).await, Some(2));
        assert!(store.get(AgentId::QaTester).await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_waits_for_lock_holder() {
        let store = Arc::new(SessionStore::new());
        let mut guard = store.lock(AgentId::QaTester).await;

        let clearing = {
            let store = store.clone();
            tokio::spawn(async move { store.clear(AgentId::QaTester).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        guard.append(Turn::user("late"));
        guard.append(Turn::agent("reply"));
        drop(guard);

        // The count reflects the exchange that held the lock
        assert_eq!(clearing.await.unwrap(), Some(2));
        assert!(store.get(AgentId::QaTester).await.is_empty());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_per_agent() {
        let store = Arc::new(SessionStore::new());
        let guard = store.lock(AgentId::QaTester).await;

        // Another agent is not blocked
        let other = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            store.lock(AgentId::BackendDeveloper),
        )
        .await;
        assert!(other.is_ok());

        // The same agent is
        let same = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            store.lock(AgentId::QaTester),
        )
        .await;
        assert!(same.is_err());

        drop(guard);
        assert!(store.lock(AgentId::QaTester).await.is_empty());
    }
}

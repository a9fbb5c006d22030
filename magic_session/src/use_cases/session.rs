// Session orchestration for the relay: which peers share a broadcast domain.

use crate::domain::PlayerId;
use axum::body::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{RwLock, broadcast};
use tracing::info;

/// Shared configuration for newly created sessions.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity of each session's relay fan-out channel.
    pub relay_channel_capacity: usize,
}

/// Errors returned by session registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session already exists and cannot be re-created.
    AlreadyExists,
}

/// One encoded relay frame plus the connection it came from.
#[derive(Debug, Clone)]
pub struct RelayFrame {
    pub sender_id: PlayerId,
    pub bytes: Bytes,
}

/// Per-session channel and access rules.
#[derive(Clone)]
pub struct SessionHandle {
    /// Identifier peers use to target this session.
    pub session_id: Arc<str>,
    /// Fan-out of frames to every connection in the session.
    pub relay_tx: broadcast::Sender<RelayFrame>,
    /// Players allowed to join (empty means open session).
    allowed_players: Arc<HashSet<PlayerId>>,
    /// Live websocket connections per player. A player may hold several.
    connections: Arc<Mutex<HashMap<PlayerId, usize>>>,
    /// Pinned sessions survive their last connection leaving.
    pinned: bool,
}

impl SessionHandle {
    /// Returns true if the provided player id may join the session.
    pub fn is_player_allowed(&self, player_id: PlayerId) -> bool {
        self.allowed_players.is_empty() || self.allowed_players.contains(&player_id)
    }

    pub fn connection_count(&self) -> usize {
        self.lock_connections().values().sum()
    }

    pub fn player_connections(&self, player_id: PlayerId) -> usize {
        self.lock_connections().get(&player_id).copied().unwrap_or(0)
    }

    fn lock_connections(&self) -> std::sync::MutexGuard<'_, HashMap<PlayerId, usize>> {
        // Counters stay consistent even if a holder panicked.
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

/// Thread-safe registry for active sessions.
pub struct SessionRegistry {
    /// Global settings applied to newly created sessions.
    settings: SessionSettings,
    /// Map of session id to active handle.
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    /// Creates a new registry with the provided settings.
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a session that is removed once its last connection leaves.
    pub async fn create_session(
        &self,
        session_id: String,
        allowed_players: HashSet<PlayerId>,
    ) -> Result<SessionHandle, SessionError> {
        self.insert(session_id, allowed_players, false).await
    }

    /// Creates an open session that is never removed.
    pub async fn create_pinned_session(
        &self,
        session_id: String,
    ) -> Result<SessionHandle, SessionError> {
        self.insert(session_id, HashSet::new(), true).await
    }

    async fn insert(
        &self,
        session_id: String,
        allowed_players: HashSet<PlayerId>,
        pinned: bool,
    ) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session_id) {
            return Err(SessionError::AlreadyExists);
        }

        let (relay_tx, _relay_rx) =
            broadcast::channel::<RelayFrame>(self.settings.relay_channel_capacity);
        let session = SessionHandle {
            session_id: Arc::from(session_id.clone()),
            relay_tx,
            allowed_players: Arc::new(allowed_players),
            connections: Arc::new(Mutex::new(HashMap::new())),
            pinned,
        };

        info!(session_id = %session_id, pinned, "session created");
        sessions.insert(session_id, session.clone());
        Ok(session)
    }

    /// Returns a session handle for the provided id, if it exists.
    pub async fn get_session(&self, session_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// Registers a new connection for `player_id` and returns the session it joined.
    pub async fn join(&self, session_id: &str, player_id: PlayerId) -> Option<SessionHandle> {
        // Counted under the read lock so `leave` cannot remove the session in between.
        let sessions = self.sessions.read().await;
        let session = sessions.get(session_id)?.clone();
        *session.lock_connections().entry(player_id).or_default() += 1;
        Some(session)
    }

    /// Drops one of `player_id`'s connections; unpinned sessions go away with
    /// their last one. Returns true when the player has no connection left.
    pub async fn leave(&self, session: &SessionHandle, player_id: PlayerId) -> bool {
        let mut sessions = self.sessions.write().await;
        let (player_gone, remaining) = {
            let mut connections = session.lock_connections();
            let player_gone = match connections.get_mut(&player_id) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    connections.remove(&player_id);
                    true
                }
                None => true,
            };
            (player_gone, connections.values().sum::<usize>())
        };
        if remaining == 0 && !session.pinned {
            sessions.remove(session.session_id.as_ref());
            info!(session_id = %session.session_id, "session closed");
        }
        player_gone
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(SessionSettings {
            relay_channel_capacity: 8,
        })
    }

    #[tokio::test]
    async fn when_session_id_reused_then_already_exists() {
        let registry = registry();
        registry
            .create_session("s1".to_string(), HashSet::new())
            .await
            .expect("first create");

        let again = registry.create_session("s1".to_string(), HashSet::new()).await;

        assert!(matches!(again, Err(SessionError::AlreadyExists)));
    }

    #[tokio::test]
    async fn when_last_connection_leaves_then_unpinned_session_is_removed() {
        let registry = registry();
        registry
            .create_session("s1".to_string(), HashSet::new())
            .await
            .expect("create");
        registry
            .create_pinned_session("default".to_string())
            .await
            .expect("create pinned");

        let a = registry.join("s1", 1).await.expect("join");
        let b = registry.join("s1", 2).await.expect("join");
        let pinned = registry.join("default", 1).await.expect("join");
        assert_eq!(a.connection_count(), 2);

        assert!(registry.leave(&a, 1).await);
        assert!(registry.get_session("s1").await.is_some());
        assert!(registry.leave(&b, 2).await);
        assert!(registry.leave(&pinned, 1).await);

        assert!(registry.get_session("s1").await.is_none());
        assert!(registry.get_session("default").await.is_some());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn when_allow_list_set_then_only_listed_players_allowed() {
        let registry = registry();
        let session = registry
            .create_session("s1".to_string(), HashSet::from([7]))
            .await
            .expect("create");

        assert!(session.is_player_allowed(7));
        assert!(!session.is_player_allowed(8));
        assert!(registry.join("missing", 7).await.is_none());
    }

    #[tokio::test]
    async fn when_player_holds_two_connections_then_only_the_last_leave_reports_gone() {
        let registry = registry();
        registry
            .create_session("s1".to_string(), HashSet::new())
            .await
            .expect("create");
        let first = registry.join("s1", 4).await.expect("join");
        let second = registry.join("s1", 4).await.expect("join");
        registry.join("s1", 5).await.expect("join");
        assert_eq!(first.player_connections(4), 2);
        assert_eq!(first.connection_count(), 3);

        assert!(!registry.leave(&first, 4).await);
        assert_eq!(second.player_connections(4), 1);
        assert!(registry.get_session("s1").await.is_some());

        assert!(registry.leave(&second, 4).await);
        assert_eq!(second.player_connections(4), 0);
        assert_eq!(second.connection_count(), 1);
    }
}

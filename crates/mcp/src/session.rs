//! In-memory MCP session store.

use std::time::Duration;

use config::SessionConfig;
use dashmap::DashMap;
use secrecy::SecretString;
use tokio::time::Instant;
use uuid::Uuid;

struct Session {
    created_at: Instant,
    last_accessed: Instant,
    initialized: bool,
    credential: Option<SecretString>,
}

/// What a caller learns when looking a session up.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// When `initialize` created the session.
    pub created_at: Instant,
    /// Whether the client sent `notifications/initialized`.
    pub initialized: bool,
    /// The credential bound at `initialize`, if any.
    pub credential: Option<SecretString>,
}

/// Sessions keyed by their id. Records live until swept for inactivity.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    config: SessionConfig,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    /// Creates a session and returns its id. The credential cannot be changed afterwards.
    pub fn create(&self, credential: Option<SecretString>) -> String {
        if self.sessions.len() > self.config.cleanup_threshold {
            self.cleanup(self.config.ttl);
        }

        let id = Uuid::now_v7().to_string();
        let now = Instant::now();

        self.sessions.insert(
            id.clone(),
            Session {
                created_at: now,
                last_accessed: now,
                initialized: false,
                credential,
            },
        );

        log::debug!(session_id = id.as_str(); "Created MCP session");

        id
    }

    /// Looks a session up and marks it as used.
    pub fn get(&self, id: &str) -> Option<SessionInfo> {
        let mut session = self.sessions.get_mut(id)?;
        session.last_accessed = Instant::now();

        Some(SessionInfo {
            created_at: session.created_at,
            initialized: session.initialized,
            credential: session.credential.clone(),
        })
    }

    /// Records that the client finished the initialization handshake.
    pub fn mark_initialized(&self, id: &str) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut session) => {
                session.initialized = true;
                session.last_accessed = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Removes sessions not used within `max_age`. Returns how many were removed.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let before = self.sessions.len();

        match Instant::now().checked_sub(max_age) {
            Some(cutoff) => self.sessions.retain(|_, session| session.last_accessed >= cutoff),
            None => return 0,
        }

        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            log::debug!("Swept {removed} inactive MCP sessions");
        }

        removed
    }

    /// Removes sessions idle for longer than the configured TTL.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup(self.config.ttl)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

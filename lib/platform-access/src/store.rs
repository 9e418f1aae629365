//! Session persistence.
//!
//! The [`SessionStore`] trait is the only way handlers reach session state.
//! Implementations must tolerate concurrent use from many requests; a write
//! to one key replaces the whole record (last write wins).

use async_trait::async_trait;
use authgate_core::SessionToken;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::SessionStoreError;
use crate::session::Session;

/// Storage backend for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a live session.
    ///
    /// Expired records are reported as absent.
    async fn load(&self, token: &SessionToken) -> Result<Option<Session>, SessionStoreError>;

    /// Inserts or replaces a session record.
    async fn save(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Moves the expiry of an existing live record.
    ///
    /// Never creates a record: returns `false` when the token has no live
    /// record, e.g. because it was destroyed after the caller loaded it.
    async fn touch(
        &self,
        token: &SessionToken,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, SessionStoreError>;

    /// Removes a session record. Removing an absent record is not an error.
    async fn destroy(&self, token: &SessionToken) -> Result<(), SessionStoreError>;

    /// Removes every expired record and returns how many were removed.
    async fn delete_expired(&self) -> Result<u64, SessionStoreError>;
}

/// Process-local session store.
///
/// Sessions do not survive a restart; use it for tests and local
/// development only.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionToken, Session>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a record (live or expired) exists for the token.
    pub async fn contains(&self, token: &SessionToken) -> bool {
        self.sessions.read().await.contains_key(token)
    }

    /// Returns the number of records held, including expired ones.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &SessionToken) -> Result<Option<Session>, SessionStoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(token)
            .filter(|session| !session.is_expired())
            .cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        self.sessions
            .write()
            .await
            .insert(session.token().clone(), session.clone());
        Ok(())
    }

    async fn touch(
        &self,
        token: &SessionToken,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(token) {
            Some(session) if !session.is_expired() => {
                session.set_expires_at(expires_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn destroy(&self, token: &SessionToken) -> Result<(), SessionStoreError> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, SessionStoreError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at() > now);
        Ok((before - sessions.len()) as u64)
    }
}

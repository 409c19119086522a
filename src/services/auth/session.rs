//! Authenticated sessions, keyed by access token digest.
//!
//! The role mapping runs once when a token is first seen; later requests with
//! the same token reuse the cached `Identity` until the token expires.
//! Not persistent: a restart drops every session.
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::authenticator::Identity;

/// SHA-256 of the access token. The raw token is never stored or logged.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn from_access_token(token: &str) -> Self {
        Self(hex::encode(Sha256::digest(token.as_bytes())))
    }

    /// Short prefix for log correlation.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey({}..)", self.short())
    }
}

/// Session storage interface.
///
/// Kept async so a shared backend can replace the in-memory one without
/// touching the middleware.
#[async_trait]
pub trait SessionStore: fmt::Debug + Send + Sync {
    // Backend name (for logging).
    fn backend_name(&self) -> &'static str;

    // Live (not expired at `now`) session for `key`.
    async fn get(&self, key: &SessionKey, now: DateTime<Utc>) -> Option<Arc<Identity>>;

    async fn insert(
        &self,
        key: SessionKey,
        identity: Arc<Identity>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    );

    // Returns `true` if a session was removed.
    async fn remove(&self, key: &SessionKey) -> bool;
}

#[derive(Debug)]
struct Entry {
    identity: Arc<Identity>,
    expires_at: DateTime<Utc>,
}

// `by_expiry` mirrors `by_key`, ordered so the soonest expiry comes first.
#[derive(Debug, Default)]
struct Sessions {
    by_key: HashMap<SessionKey, Entry>,
    by_expiry: BTreeSet<(DateTime<Utc>, SessionKey)>,
}

impl Sessions {
    fn remove(&mut self, key: &SessionKey) -> Option<Entry> {
        let entry = self.by_key.remove(key)?;
        self.by_expiry.remove(&(entry.expires_at, key.clone()));
        Some(entry)
    }

    fn pop_soonest(&mut self) -> Option<(DateTime<Utc>, SessionKey)> {
        let (expires_at, key) = self.by_expiry.pop_first()?;
        self.by_key.remove(&key);
        Some((expires_at, key))
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) {
        while self
            .by_expiry
            .first()
            .is_some_and(|(expires_at, _)| *expires_at <= now)
        {
            self.pop_soonest();
        }
    }
}

#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<Sessions>,
    max_entries: usize,
}

impl InMemorySessionStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
            max_entries: max_entries.max(1),
        }
    }
}

#[cfg(test)]
impl InMemorySessionStore {
    fn len(&self) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        debug_assert_eq!(sessions.by_key.len(), sessions.by_expiry.len());
        sessions.by_key.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &SessionKey, now: DateTime<Utc>) -> Option<Arc<Identity>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .by_key
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| Arc::clone(&entry.identity))
    }

    async fn insert(
        &self,
        key: SessionKey,
        identity: Arc<Identity>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        if expires_at <= now {
            return;
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.remove(&key);
        sessions.purge_expired(now);

        if sessions.by_key.len() >= self.max_entries {
            // Full: drop whichever session would expire first.
            if let Some((_, victim)) = sessions.pop_soonest() {
                tracing::debug!(session = victim.short(), "session store full, evicting");
            }
        }

        sessions.by_expiry.insert((expires_at, key.clone()));
        sessions.by_key.insert(
            key,
            Entry {
                identity,
                expires_at,
            },
        );
    }

    async fn remove(&self, key: &SessionKey) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }
}

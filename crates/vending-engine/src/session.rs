//! Session stores.
//!
//! A session maps an opaque token to the username that logged in and the
//! moment it logged in, with a fixed TTL and no renewal on use.
//!
//! - [`RedisSessionStore`]: `SETEX session:{token} {ttl} {json}`
//! - [`MemorySessionStore`]: process-local map for tests and development

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Session store failures. Missing sessions are `Ok(None)`, not errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session store connection failed: {0}")]
    Connection(String),

    #[error("Session store command failed: {0}")]
    Command(String),

    #[error("Session payload is unreadable: {0}")]
    Serialization(String),
}

/// What a token resolves to.
///
/// `opened_at` lets the gate tell a session of a deleted account apart from
/// one of a newer account that reused the username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub opened_at: DateTime<Utc>,
}

impl Session {
    /// A session for `username` opened now.
    pub fn open(username: impl Into<String>) -> Self {
        Session {
            username: username.into(),
            opened_at: Utc::now(),
        }
    }
}

/// Token → session cache with TTL.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `session` under `token` for `ttl`.
    async fn put(&self, token: &str, session: &Session, ttl: Duration) -> Result<(), SessionError>;

    /// Session for a live token, `None` when unknown or expired.
    async fn get(&self, token: &str) -> Result<Option<Session>, SessionError>;
}

// =============================================================================
// Redis
// =============================================================================

/// Redis-backed session store.
#[derive(Clone)]
pub struct RedisSessionStore {
    conn_manager: ConnectionManager,
}

impl RedisSessionStore {
    /// Connects to Redis, e.g. `redis://127.0.0.1:6379`.
    pub async fn new(redis_url: &str) -> Result<Self, SessionError> {
        let client = Client::open(redis_url)
            .map_err(|e| SessionError::Connection(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            SessionError::Connection(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    fn session_key(token: &str) -> String {
        format!("session:{token}")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, token: &str, session: &Session, ttl: Duration) -> Result<(), SessionError> {
        let mut conn = self.conn_manager.clone();
        let ttl_seconds = ttl.as_secs().max(1);
        let payload =
            serde_json::to_string(session).map_err(|e| SessionError::Serialization(e.to_string()))?;

        let _: () = conn
            .set_ex(Self::session_key(token), payload, ttl_seconds)
            .await
            .map_err(|e| SessionError::Command(format!("Failed to store session: {e}")))?;

        tracing::debug!(ttl_seconds, "Stored session in Redis");
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>, SessionError> {
        let mut conn = self.conn_manager.clone();

        let payload: Option<String> = conn
            .get(Self::session_key(token))
            .await
            .map_err(|e| SessionError::Command(format!("Failed to read session: {e}")))?;

        payload
            .map(|p| {
                serde_json::from_str(&p).map_err(|e| SessionError::Serialization(e.to_string()))
            })
            .transpose()
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Process-local session store.
///
/// Expiry follows `tokio::time`, so paused-clock tests can advance past the
/// TTL. Expired entries are dropped when read and swept on every `put`.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, (Session, Instant)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, token: &str, session: &Session, ttl: Duration) -> Result<(), SessionError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        entries.retain(|_, (_, expires_at)| now < *expires_at);
        entries.insert(token.to_string(), (session.clone(), now + ttl));
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>, SessionError> {
        {
            let entries = self.entries.read().await;
            match entries.get(token) {
                None => return Ok(None),
                Some((session, expires_at)) if Instant::now() < *expires_at => {
                    return Ok(Some(session.clone()));
                }
                Some(_) => {}
            }
        }

        self.entries.write().await.remove(token);
        Ok(None)
    }
}

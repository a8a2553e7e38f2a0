//! Redis-based session store implementation.
//!
//! The networked backend: every operation is a thin passthrough to a shared
//! cache, so all instances of a service see the same sessions.
//!
//! # Architecture
//!
//! - **Key**: `session:{key}` → the raw value string (session JSON or the
//!   parent session id of a temp token)
//! - **TTL**: native Redis expiry, reset by `touch`
//! - `set` is `SET NX EX`, so an existing key is reported as
//!   `StoreError::AlreadyExists` rather than overwritten
//!
//! # Example
//!
//! ```no_run
//! use composable_rust_session::stores::RedisSessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSessionStore::new("redis://127.0.0.1:6379").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{StoreError, StoreResult};
use crate::providers::SessionStore;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis-based session store with TTL-based expiration.
///
/// Connection pooling and reconnects are handled by `ConnectionManager`;
/// cloning the store shares the same connection.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore").finish_non_exhaustive()
    }
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    ///
    /// # Errors
    ///
    /// Returns `StoreError::BackendUnavailable` if connection to Redis fails.
    pub async fn new(redis_url: &str) -> StoreResult<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            StoreError::BackendUnavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            StoreError::BackendUnavailable(format!(
                "Failed to create Redis connection manager: {e}"
            ))
        })?;

        tracing::trace!(redis_url, "Session strategy is networked (Redis)");

        Ok(Self { conn_manager })
    }

    /// Get the Redis key for a store key.
    fn redis_key(key: &str) -> String {
        format!("session:{key}")
    }

    /// Redis rejects `EX 0`; a zero timeout becomes the shortest expiry.
    const fn expiry(timeout_seconds: u64) -> u64 {
        if timeout_seconds == 0 { 1 } else { timeout_seconds }
    }
}

fn unavailable(action: &str, err: &redis::RedisError) -> StoreError {
    StoreError::BackendUnavailable(format!("Failed to {action}: {err}"))
}

impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn_manager.clone();

        let value: Option<String> = conn
            .get(Self::redis_key(key))
            .await
            .map_err(|e| unavailable("get session from Redis", &e))?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, timeout_seconds: u64) -> StoreResult<()> {
        let mut conn = self.conn_manager.clone();

        // SET ... NX replies nil when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::redis_key(key))
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(Self::expiry(timeout_seconds))
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("set session in Redis", &e))?;

        if reply.is_none() {
            return Err(StoreError::AlreadyExists);
        }

        tracing::trace!(key, timeout_seconds, "Stored new session key in Redis");
        Ok(())
    }

    async fn replace(&self, key: &str, value: &str, timeout_seconds: u64) -> StoreResult<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .set_ex(Self::redis_key(key), value, Self::expiry(timeout_seconds))
            .await
            .map_err(|e| unavailable("replace session in Redis", &e))?;

        Ok(())
    }

    async fn touch(&self, key: &str, timeout_seconds: u64) -> StoreResult<()> {
        let mut conn = self.conn_manager.clone();

        #[allow(clippy::cast_possible_wrap)]
        let seconds = Self::expiry(timeout_seconds).min(i64::MAX as u64) as i64;

        let updated: bool = conn
            .expire(Self::redis_key(key), seconds)
            .await
            .map_err(|e| unavailable("touch session in Redis", &e))?;

        if updated { Ok(()) } else { Err(StoreError::NotFound) }
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .del(Self::redis_key(key))
            .await
            .map_err(|e| unavailable("delete session from Redis", &e))?;

        Ok(())
    }
}

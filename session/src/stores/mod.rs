//! Session store backends.
//!
//! - **Networked** (Redis) - shared cache, TTL handled by the server
//! - **In-process** - owned map with lazy expiry and periodic pruning
//!
//! [`SessionBackend`] is the closed set of backends a configuration can
//! select; it is resolved once, when the manager is built.

pub mod memory;
pub mod session_redis;

pub use memory::InMemorySessionStore;
pub use session_redis::RedisSessionStore;

use crate::config::StoreKind;
use crate::error::StoreResult;
use crate::providers::SessionStore;

/// The backend selected by [`StoreKind`].
#[derive(Debug, Clone)]
pub enum SessionBackend {
    /// Networked cache.
    Networked(RedisSessionStore),
    /// In-process map.
    InProcess(InMemorySessionStore),
}

impl SessionBackend {
    /// Build the backend described by `kind`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::BackendUnavailable` if the networked backend
    /// cannot be reached.
    pub async fn connect(kind: &StoreKind) -> StoreResult<Self> {
        match kind {
            StoreKind::Networked { url } => {
                Ok(Self::Networked(RedisSessionStore::new(url).await?))
            }
            StoreKind::InProcess { prune_ops } => {
                tracing::trace!(prune_ops, "Session strategy is in-process");
                Ok(Self::InProcess(InMemorySessionStore::new(*prune_ops)))
            }
        }
    }
}

impl SessionStore for SessionBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self {
            Self::Networked(store) => store.get(key).await,
            Self::InProcess(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, timeout_seconds: u64) -> StoreResult<()> {
        match self {
            Self::Networked(store) => store.set(key, value, timeout_seconds).await,
            Self::InProcess(store) => store.set(key, value, timeout_seconds).await,
        }
    }

    async fn replace(&self, key: &str, value: &str, timeout_seconds: u64) -> StoreResult<()> {
        match self {
            Self::Networked(store) => store.replace(key, value, timeout_seconds).await,
            Self::InProcess(store) => store.replace(key, value, timeout_seconds).await,
        }
    }

    async fn touch(&self, key: &str, timeout_seconds: u64) -> StoreResult<()> {
        match self {
            Self::Networked(store) => store.touch(key, timeout_seconds).await,
            Self::InProcess(store) => store.touch(key, timeout_seconds).await,
        }
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        match self {
            Self::Networked(store) => store.del(key).await,
            Self::InProcess(store) => store.del(key).await,
        }
    }
}

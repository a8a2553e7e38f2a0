//! Session lifecycle manager.
//!
//! One [`SessionManager`] per service owns the configuration, the session
//! store, and the pass-through URL set. Every request-centric operation
//! takes a [`SessionRequest`](crate::providers::SessionRequest) supplied
//! by the host framework adapter.
//!
//! # Request Flow
//!
//! ```text
//! get_session ─► get_temp_session ─► handler (login / logout / checkout) ─► log_session
//! ```
//!
//! # Failure Policy
//!
//! Store failures never reach the client. A session that cannot be read is
//! replaced by a fresh anonymous one; a write that fails is logged and the
//! in-request copy stays authoritative for the rest of the request.

mod domain;
mod identity;
mod login;
mod telemetry;
mod temp_token;

pub use domain::{MOBILE_USER_AGENT_MARKER, cookie_domain_for_host};
pub use login::ACTIVE_SESSION_WINDOW_MINUTES;

use crate::config::SessionConfig;
use crate::error::{Result, StoreError, StoreResult};
use crate::providers::SessionStore;
use crate::stores::SessionBackend;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

/// TTL used when a freshly generated identifier collides with an
/// existing key.
pub const COLLISION_TTL_SECONDS: u64 = 600;

/// Session lifecycle manager.
///
/// Generic over the store so tests can inject a mock; production code uses
/// the default [`SessionBackend`] chosen by the configuration.
#[derive(Debug)]
pub struct SessionManager<S = SessionBackend> {
    config: SessionConfig,
    store: S,
    passthrough: RwLock<HashSet<String>>,
}

impl SessionManager<SessionBackend> {
    /// Validate `config` and connect the backend it selects.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The configuration is invalid → `SessionError::Configuration`
    /// - The networked backend cannot be reached → `SessionError::StoreBackendUnavailable`
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let store = SessionBackend::connect(&config.store_kind()).await?;

        tracing::info!(
            strategy = ?config.session_strategy,
            cookie = %config.session_cookie_name,
            timeout_seconds = config.session_timeout,
            "Session manager ready"
        );

        Self::with_store(config, store)
    }
}

impl<S: SessionStore> SessionManager<S> {
    /// Build a manager over an existing store.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the configuration is invalid.
    pub fn with_store(config: SessionConfig, store: S) -> Result<Self> {
        config.validate()?;
        let passthrough = config.passthrough_urls.iter().cloned().collect();
        Ok(Self {
            config,
            store,
            passthrough: RwLock::new(passthrough),
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The session store, for collaborators that need direct access.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    // ═══════════════════════════════════════════════════════════
    // Pass-through URLs
    // ═══════════════════════════════════════════════════════════

    /// Current pass-through URLs, sorted.
    #[must_use]
    pub fn passthrough_urls(&self) -> Vec<String> {
        let set = self.passthrough.read().unwrap_or_else(PoisonError::into_inner);
        let mut urls: Vec<String> = set.iter().cloned().collect();
        urls.sort();
        urls
    }

    /// Replace the pass-through URL set.
    pub fn set_passthrough_urls<I, U>(&self, urls: I)
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        let replacement: HashSet<String> = urls.into_iter().map(Into::into).collect();
        *self.passthrough.write().unwrap_or_else(PoisonError::into_inner) = replacement;
    }

    /// Add URLs to the pass-through set.
    pub fn add_passthrough_urls<I, U>(&self, urls: I)
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        self.passthrough
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(urls.into_iter().map(Into::into));
    }

    /// `true` if `url` skips session resolution and request logging.
    ///
    /// Matching is on the path; a query string is ignored.
    #[must_use]
    pub fn is_passthrough(&self, url: &str) -> bool {
        let path = url.split_once('?').map_or(url, |(path, _)| path);
        self.passthrough
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }

    // ═══════════════════════════════════════════════════════════
    // Store access (deadline-bounded)
    // ═══════════════════════════════════════════════════════════

    async fn with_deadline<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match self.config.store_timeout() {
            Some(deadline) => tokio::time::timeout(deadline, call).await.unwrap_or_else(|_| {
                Err(StoreError::BackendUnavailable(format!(
                    "store call exceeded {}ms",
                    deadline.as_millis()
                )))
            }),
            None => call.await,
        }
    }

    pub(crate) async fn store_get(&self, key: &str) -> StoreResult<Option<String>> {
        self.with_deadline(self.store.get(key)).await
    }

    pub(crate) async fn store_set(&self, key: &str, value: &str, ttl: u64) -> StoreResult<()> {
        self.with_deadline(self.store.set(key, value, ttl)).await
    }

    pub(crate) async fn store_replace(&self, key: &str, value: &str, ttl: u64) -> StoreResult<()> {
        self.with_deadline(self.store.replace(key, value, ttl)).await
    }

    pub(crate) async fn store_touch(&self, key: &str, ttl: u64) -> StoreResult<()> {
        self.with_deadline(self.store.touch(key, ttl)).await
    }
}

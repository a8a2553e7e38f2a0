//! Mock session store for testing.

use crate::error::{StoreError, StoreResult};
use crate::providers::SessionStore;
use crate::stores::InMemorySessionStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Store operation, for call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// `get`
    Get,
    /// `set`
    Set,
    /// `replace`
    Replace,
    /// `touch`
    Touch,
    /// `del`
    Del,
}

/// Mock session store.
///
/// Delegates to an [`InMemorySessionStore`] while counting calls per
/// operation. Can be switched into a failing mode where every call returns
/// `StoreError::BackendUnavailable`, and can delay every call to exercise
/// store deadlines.
#[derive(Debug, Clone)]
pub struct MockSessionStore {
    inner: InMemorySessionStore,
    calls: Arc<Mutex<HashMap<StoreOp, usize>>>,
    failing: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl MockSessionStore {
    /// Create a new mock session store.
    #[must_use]
    pub fn new() -> Self {
        Self::wrapping(InMemorySessionStore::new(crate::config::DEFAULT_PRUNE_OPS))
    }

    /// Wrap an existing in-memory store (e.g. one driven by a mock clock).
    #[must_use]
    pub fn wrapping(inner: InMemorySessionStore) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(AtomicBool::new(false)),
            latency: None,
        }
    }

    /// Create a store whose every call fails with `BackendUnavailable`.
    #[must_use]
    pub fn failing() -> Self {
        let store = Self::new();
        store.set_failing(true);
        store
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Toggle the failing mode (shared by clones).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of calls made for `op`.
    #[must_use]
    pub fn calls(&self, op: StoreOp) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// The wrapped store, bypassing counters and failure injection.
    #[must_use]
    pub const fn inner(&self) -> &InMemorySessionStore {
        &self.inner
    }

    async fn enter(&self, op: StoreOp) -> StoreResult<()> {
        {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| StoreError::BackendUnavailable("Mutex lock failed".to_string()))?;
            *calls.entry(op).or_insert(0) += 1;
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::BackendUnavailable(
                "mock store is failing".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MockSessionStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.enter(StoreOp::Get).await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, timeout_seconds: u64) -> StoreResult<()> {
        self.enter(StoreOp::Set).await?;
        self.inner.set(key, value, timeout_seconds).await
    }

    async fn replace(&self, key: &str, value: &str, timeout_seconds: u64) -> StoreResult<()> {
        self.enter(StoreOp::Replace).await?;
        self.inner.replace(key, value, timeout_seconds).await
    }

    async fn touch(&self, key: &str, timeout_seconds: u64) -> StoreResult<()> {
        self.enter(StoreOp::Touch).await?;
        self.inner.touch(key, timeout_seconds).await
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        self.enter(StoreOp::Del).await?;
        self.inner.del(key).await
    }
}

//! In-process session store.
//!
//! Entries live in a map owned by the store instance (and therefore by the
//! manager that owns the store). Expired entries are evicted lazily: a key
//! is checked just before it is read or touched, and every `prune_ops`
//! writes a full sweep removes everything past its timeout.
//!
//! State is lost on restart, so this backend suits single-instance and
//! development deployments only.

use crate::error::{StoreError, StoreResult};
use crate::providers::{Clock, SessionStore, SystemClock};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// One stored value with its expiry bookkeeping.
#[derive(Debug, Clone)]
struct StoreEntry {
    content: String,
    timestamp: DateTime<Utc>,
    timeout_seconds: u64,
}

impl StoreEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let elapsed_ms = now.signed_duration_since(self.timestamp).num_milliseconds();
        #[allow(clippy::cast_possible_wrap)]
        let limit_ms = self.timeout_seconds.saturating_mul(1000).min(i64::MAX as u64) as i64;
        elapsed_ms > limit_ms
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, StoreEntry>,
    prune_counter: u32,
}

/// In-process session store with periodic lazy pruning.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    state: Arc<Mutex<MemoryState>>,
    prune_ops: u32,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    /// Create a store that sweeps after every `prune_ops` writes.
    #[must_use]
    pub fn new(prune_ops: u32) -> Self {
        Self::with_clock(prune_ops, Arc::new(SystemClock))
    }

    /// Create a store reading time from `clock`.
    #[must_use]
    pub fn with_clock(prune_ops: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            prune_ops,
            clock,
        }
    }

    /// Number of entries currently held (expired ones included until pruned).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.entries.len())
    }

    /// `true` if the store holds no entries.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Evict every expired entry now.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn prune(&self) -> StoreResult<usize> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        Ok(Self::sweep(&mut state, now))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::BackendUnavailable("Mutex lock failed".to_string()))
    }

    fn sweep(state: &mut MemoryState, now: DateTime<Utc>) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let evicted = before - state.entries.len();
        tracing::trace!(evicted, remaining = state.entries.len(), "Pruned in-memory session store");
        evicted
    }

    fn check_timeout(state: &mut MemoryState, key: &str, now: DateTime<Utc>) {
        if state.entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            state.entries.remove(key);
            tracing::trace!(key, "Evicted expired session key");
        }
    }

    fn write(state: &mut MemoryState, key: &str, value: &str, timeout_seconds: u64, now: DateTime<Utc>) {
        state.entries.insert(
            key.to_string(),
            StoreEntry {
                content: value.to_string(),
                timestamp: now,
                timeout_seconds,
            },
        );
    }
}

impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        Self::check_timeout(&mut state, key, now);
        Ok(state.entries.get(key).map(|entry| entry.content.clone()))
    }

    async fn set(&self, key: &str, value: &str, timeout_seconds: u64) -> StoreResult<()> {
        let now = self.clock.now();
        let mut state = self.lock()?;

        Self::check_timeout(&mut state, key, now);
        if state.entries.contains_key(key) {
            return Err(StoreError::AlreadyExists);
        }

        state.prune_counter += 1;
        if state.prune_counter > self.prune_ops {
            state.prune_counter = 0;
            Self::sweep(&mut state, now);
        }

        Self::write(&mut state, key, value, timeout_seconds, now);
        Ok(())
    }

    async fn replace(&self, key: &str, value: &str, timeout_seconds: u64) -> StoreResult<()> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        Self::write(&mut state, key, value, timeout_seconds, now);
        Ok(())
    }

    async fn touch(&self, key: &str, timeout_seconds: u64) -> StoreResult<()> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        Self::check_timeout(&mut state, key, now);

        let entry = state.entries.get_mut(key).ok_or(StoreError::NotFound)?;
        entry.timestamp = now;
        entry.timeout_seconds = timeout_seconds;
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        self.lock()?.entries.remove(key);
        Ok(())
    }
}

//! Session store trait.

use crate::error::StoreResult;
use std::future::Future;

/// Key/value session store with per-key expiry.
///
/// Keys and values are opaque strings. Both session records and temp
/// tokens live here.
///
/// # Implementation Notes
///
/// - `get` distinguishes "absent" (`Ok(None)`) from backend failure (`Err`)
/// - `set` must fail with `StoreError::AlreadyExists` for an existing key
/// - `del` is idempotent
pub trait SessionStore: Send + Sync {
    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::BackendUnavailable` if the backend fails.
    fn get(&self, key: &str) -> impl Future<Output = StoreResult<Option<String>>> + Send;

    /// Store `value` under a new `key`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The key already exists → `StoreError::AlreadyExists`
    /// - The backend fails → `StoreError::BackendUnavailable`
    fn set(
        &self,
        key: &str,
        value: &str,
        timeout_seconds: u64,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Overwrite `key` unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::BackendUnavailable` if the backend fails.
    fn replace(
        &self,
        key: &str,
        value: &str,
        timeout_seconds: u64,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Reset the expiry clock of `key` without changing its value.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The key is absent → `StoreError::NotFound`
    /// - The backend fails → `StoreError::BackendUnavailable`
    fn touch(&self, key: &str, timeout_seconds: u64) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::BackendUnavailable` if the backend fails.
    fn del(&self, key: &str) -> impl Future<Output = StoreResult<()>> + Send;
}

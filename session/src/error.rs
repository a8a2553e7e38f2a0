//! Error types for session stores and the session lifecycle.

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Result type alias for session store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by a [`SessionStore`](crate::providers::SessionStore) backend.
///
/// `NotFound` and `AlreadyExists` describe the state of a key and are
/// distinct from `BackendUnavailable`, which means the backend could not
/// confirm any state at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key does not exist (or has expired).
    #[error("Session key not found")]
    NotFound,

    /// The key already exists; use `replace` instead of `set`.
    #[error("Session key already exists")]
    AlreadyExists,

    /// The backend could not be reached or did not answer in time.
    #[error("Session store unavailable: {0}")]
    BackendUnavailable(String),
}

impl StoreError {
    /// Returns `true` if the key was absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns `true` if the backend itself failed.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}

/// Error taxonomy for the session lifecycle.
///
/// Store-level conditions are never surfaced to clients; the manager
/// downgrades them to "issue a fresh anonymous session". Credential and
/// authenticator failures are returned to the route layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    // ═══════════════════════════════════════════════════════════
    // Store Errors
    // ═══════════════════════════════════════════════════════════

    /// Session key not present in the store.
    #[error("Session not found")]
    StoreNotFound,

    /// Store could not confirm state.
    #[error("Session store unavailable: {0}")]
    StoreBackendUnavailable(String),

    /// Stored payload could not be decoded as a session record.
    #[error("Invalid session data: {0}")]
    InvalidSessionData(String),

    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// Username or password missing.
    #[error("Bad username or password!")]
    InvalidCredentialsInput,

    /// The injected authenticator refused the credentials.
    #[error("{0}")]
    AuthenticatorRejected(String),

    /// Operation requires an authenticated session.
    #[error("User not logged in!")]
    NotLoggedIn,

    // ═══════════════════════════════════════════════════════════
    // Temp Token Errors
    // ═══════════════════════════════════════════════════════════

    /// The temp token is unknown or expired.
    #[error("Temp session token not found")]
    TempTokenNotFound,

    /// The session a temp token points at no longer exists.
    #[error("Parent session no longer exists")]
    ParentSessionGone,

    /// The session a temp token points at is logged out.
    #[error("Parent session is no longer logged in")]
    ParentSessionNotLoggedIn,

    // ═══════════════════════════════════════════════════════════
    // Setup Errors
    // ═══════════════════════════════════════════════════════════

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SessionError {
    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use composable_rust_session::SessionError;
    /// assert!(SessionError::InvalidCredentialsInput.is_user_error());
    /// assert!(!SessionError::StoreNotFound.is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentialsInput | Self::AuthenticatorRejected(_) | Self::NotLoggedIn
        )
    }

    /// Returns `true` if this error originated in the store layer.
    ///
    /// # Examples
    ///
    /// ```
    /// # use composable_rust_session::SessionError;
    /// assert!(SessionError::StoreBackendUnavailable("down".into()).is_store_error());
    /// assert!(!SessionError::NotLoggedIn.is_store_error());
    /// ```
    #[must_use]
    pub const fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::StoreNotFound | Self::StoreBackendUnavailable(_) | Self::InvalidSessionData(_)
        )
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::StoreNotFound,
            StoreError::AlreadyExists => {
                Self::StoreBackendUnavailable("session key already exists".to_string())
            }
            StoreError::BackendUnavailable(reason) => Self::StoreBackendUnavailable(reason),
        }
    }
}

//! Credential verification capability.
//!
//! Concrete credential checks (database lookup, password hashing) live
//! outside this crate. The manager only calls an injected [`Authenticator`].

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::state::{Credentials, SessionRecord};
use std::future::Future;

/// Verifies credentials and produces the packet to log in with.
pub trait Authenticator: Send + Sync {
    /// Verify `credentials`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(packet))`: the packet to persist (normally logged in)
    /// - `Ok(None)`: no packet; the manager substitutes the anonymous one
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AuthenticatorRejected` when the credentials
    /// are wrong.
    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Option<SessionRecord>>> + Send;
}

/// Authenticator accepting the single configured username/password pair.
///
/// Intended for development and tests.
#[derive(Debug, Clone)]
pub struct DefaultAuthenticator {
    username: Option<String>,
    password: Option<String>,
    version: String,
}

impl DefaultAuthenticator {
    /// Role granted to the default user.
    pub const ROLE: &'static str = "Administrator";
    /// Role rank granted to the default user.
    pub const ROLE_INDEX: i64 = 5;
    /// User id of the default user.
    pub const USER_ID: i64 = 1;

    /// Build from `DefaultUsername` / `DefaultPassword`.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            username: config.default_username.clone(),
            password: config.default_password.clone(),
            version: config.version.clone(),
        }
    }
}

impl Authenticator for DefaultAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<SessionRecord>> {
        let matches = self.username.as_deref() == Some(credentials.username.as_str())
            && self.password.as_deref() == Some(credentials.password.as_str());

        if matches {
            Ok(Some(SessionRecord::logged_in(
                Self::ROLE,
                Self::ROLE_INDEX,
                Self::USER_ID,
                &self.version,
            )))
        } else {
            Err(SessionError::AuthenticatorRejected(
                "Invalid username or password!".to_string(),
            ))
        }
    }
}

/// Adapts a synchronous closure into an [`Authenticator`].
///
/// ```
/// use composable_rust_session::providers::AuthenticatorFn;
/// use composable_rust_session::{Credentials, Result, SessionRecord};
///
/// let auth = AuthenticatorFn(|_creds: &Credentials| -> Result<Option<SessionRecord>> {
///     Ok(Some(SessionRecord::logged_in("User", 1, 7, "")))
/// });
/// # let _ = auth;
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatorFn<F>(pub F);

impl<F> Authenticator for AuthenticatorFn<F>
where
    F: Fn(&Credentials) -> Result<Option<SessionRecord>> + Send + Sync,
{
    async fn authenticate(&self, credentials: &Credentials) -> Result<Option<SessionRecord>> {
        (self.0)(credentials)
    }
}

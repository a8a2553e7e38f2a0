//! Application state for the session routes.

use composable_rust_session::{
    Authenticator, DefaultAuthenticator, SessionBackend, SessionManager, SessionStore,
};
use std::sync::Arc;

/// State shared by the session handlers.
///
/// One manager per process, shared by every request. The authenticator is
/// injected so applications plug in their own credential check.
///
/// # Examples
///
/// ```ignore
/// let manager = Arc::new(SessionManager::connect(SessionConfig::from_env()?).await?);
/// let authenticator = Arc::new(DefaultAuthenticator::from_config(manager.config()));
/// let app = session_router(SessionState::new(manager, authenticator));
/// ```
pub struct SessionState<S = SessionBackend, A = DefaultAuthenticator> {
    /// The session manager.
    pub manager: Arc<SessionManager<S>>,
    /// Credential check used by the authenticate route.
    pub authenticator: Arc<A>,
}

impl<S, A> SessionState<S, A>
where
    S: SessionStore,
    A: Authenticator,
{
    /// Create the shared state.
    #[must_use]
    pub const fn new(manager: Arc<SessionManager<S>>, authenticator: Arc<A>) -> Self {
        Self {
            manager,
            authenticator,
        }
    }
}

// Manual impl: `S` and `A` themselves need not be `Clone`.
impl<S, A> Clone for SessionState<S, A> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use composable_rust_session::SessionConfig;
    use composable_rust_session::mocks::{MockSessionStore, StaticAuthenticator};

    #[test]
    fn test_state_clone_shares_manager() {
        let manager = Arc::new(
            SessionManager::with_store(SessionConfig::new(60), MockSessionStore::new()).unwrap(),
        );
        let state = SessionState::new(manager, Arc::new(StaticAuthenticator::empty()));

        let cloned = state.clone();

        assert!(Arc::ptr_eq(&state.manager, &cloned.manager));
        assert!(Arc::ptr_eq(&state.authenticator, &cloned.authenticator));
    }
}

//! Mock authenticator for testing.

use crate::error::{Result, SessionError};
use crate::providers::Authenticator;
use crate::state::{Credentials, SessionRecord};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Outcome {
    Accept(SessionRecord),
    Reject(String),
    Empty,
}

/// Authenticator returning a fixed outcome regardless of the credentials.
///
/// Counts how often it was consulted, so tests can assert the manager's
/// presence check short-circuits before reaching it.
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    outcome: Outcome,
    calls: Arc<AtomicUsize>,
}

impl StaticAuthenticator {
    fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always log in with `record`.
    #[must_use]
    pub fn accepting(record: SessionRecord) -> Self {
        Self::with_outcome(Outcome::Accept(record))
    }

    /// Always reject with `message`.
    #[must_use]
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Reject(message.into()))
    }

    /// Always succeed without a packet.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_outcome(Outcome::Empty)
    }

    /// Number of `authenticate` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<Option<SessionRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Accept(record) => Ok(Some(record.clone())),
            Outcome::Reject(message) => Err(SessionError::AuthenticatorRejected(message.clone())),
            Outcome::Empty => Ok(None),
        }
    }
}

//! Login status mutation and identity queries.

use super::SessionManager;
use crate::error::{Result, SessionError};
use crate::providers::{Authenticator, SessionRequest, SessionStore};
use crate::state::{Credentials, SessionId, SessionRecord, UserRecord};
use chrono::Utc;

/// Recency window of [`SessionManager::get_active_user_sessions`].
pub const ACTIVE_SESSION_WINDOW_MINUTES: i64 = 15;

impl<S: SessionStore> SessionManager<S> {
    /// Make `packet` the session of `request` and persist it.
    ///
    /// A packet without a session id is stamped with the request's. The
    /// attached copy is authoritative for the rest of the request even if
    /// the store write fails; failures are only logged.
    pub async fn set_session_login_status<R: SessionRequest + ?Sized>(
        &self,
        request: &mut R,
        mut packet: SessionRecord,
    ) {
        if packet.session_id.is_none() {
            packet.session_id = self.current_session_id(&*request);
        }

        let session_id = packet.session_id.clone();
        let payload = packet.to_json();
        request.attach_session(packet);

        let Some(session_id) = session_id else {
            tracing::error!("Cannot persist login status: request has no session id");
            return;
        };

        let result = match payload {
            Ok(payload) => self
                .store_replace(session_id.as_str(), &payload, self.config.session_timeout)
                .await
                .map_err(SessionError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => tracing::debug!(session_id = %session_id, "Persisted login status"),
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Failed to persist login status");
            }
        }
    }

    /// Log `request`'s session in with `credentials`.
    ///
    /// Credentials must carry a non-empty username and password; otherwise
    /// the authenticator is not consulted. Whatever the authenticator
    /// yields (or the anonymous packet when it yields nothing or fails) is
    /// persisted as the session's login status.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Username or password is missing → `SessionError::InvalidCredentialsInput`
    /// - The authenticator refused the credentials → its error, after the
    ///   anonymous packet has been persisted
    pub async fn authenticate_user<R, A>(
        &self,
        request: &mut R,
        credentials: &Credentials,
        authenticator: &A,
    ) -> Result<SessionRecord>
    where
        R: SessionRequest + ?Sized,
        A: Authenticator,
    {
        let remote_ip = request
            .header("x-forwarded-for")
            .map(ToString::to_string)
            .or_else(|| request.remote_address());
        let request_id = request.request_id();

        tracing::debug!(
            login_id = %credentials.username,
            remote_ip = remote_ip.as_deref().unwrap_or(""),
            "Authentication attempt"
        );

        if !credentials.is_complete() {
            tracing::info!(
                login_id = %credentials.username,
                remote_ip = remote_ip.as_deref().unwrap_or(""),
                request_id = request_id.as_deref().unwrap_or(""),
                success = false,
                "Authentication rejected: missing username or password"
            );
            return Err(SessionError::InvalidCredentialsInput);
        }

        let session_id = self.current_session_id(&*request);
        let outcome = authenticator.authenticate(credentials).await;

        let (mut packet, error) = match outcome {
            Ok(Some(packet)) => (packet, None),
            Ok(None) => (SessionRecord::anonymous(session_id.clone(), &self.config.version), None),
            Err(e) => (
                SessionRecord::anonymous(session_id.clone(), &self.config.version),
                Some(e),
            ),
        };

        let success = packet.is_authenticated();
        if success {
            packet.last_login_time = Some(Utc::now());
        }
        packet.session_id = session_id;

        tracing::info!(
            login_id = %credentials.username,
            request_id = request_id.as_deref().unwrap_or(""),
            user_id = packet.user_id,
            success,
            "Authentication {}",
            if success { "succeeded" } else { "failed" }
        );

        self.set_session_login_status(request, packet.clone()).await;

        match error {
            Some(e) => Err(e),
            None => Ok(packet),
        }
    }

    /// Log `request`'s session out.
    ///
    /// The session row survives with the anonymous packet; only the
    /// identity is cleared.
    pub async fn deauthenticate_user<R: SessionRequest + ?Sized>(&self, request: &mut R) {
        let session_id = self.current_session_id(&*request);

        tracing::info!(
            session_id = ?session_id.as_ref().map(SessionId::as_str),
            request_id = request.request_id().as_deref().unwrap_or(""),
            "Deauthenticated session"
        );

        let packet = self.format_empty_user_packet(session_id);
        self.set_session_login_status(request, packet).await;
    }

    /// `true` iff an identifier resolves and the attached session is logged
    /// in with a real user id.
    #[must_use]
    pub fn check_if_logged_in<R: SessionRequest + ?Sized>(&self, request: &R) -> bool {
        self.resolve_session_id(request).is_some()
            && request.session().is_some_and(SessionRecord::is_authenticated)
    }

    /// User id stored in session `session_id`, or `0`.
    ///
    /// An absent or unreadable session counts as anonymous.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StoreBackendUnavailable` if the store fails.
    pub async fn get_session_user_id(&self, session_id: &str) -> Result<i64> {
        let payload = self.store_get(session_id).await?;
        Ok(payload
            .and_then(|payload| SessionRecord::from_json(&payload).ok())
            .map_or(0, |record| record.user_id))
    }

    /// Map a persisted user account into a logged-in packet.
    #[must_use]
    pub fn format_user_packet_from_record(&self, user: &UserRecord) -> SessionRecord {
        SessionRecord::from_user_record(user, &self.config.version)
    }

    /// The anonymous packet for `session_id`.
    #[must_use]
    pub fn format_empty_user_packet(&self, session_id: Option<SessionId>) -> SessionRecord {
        SessionRecord::anonymous(session_id, &self.config.version)
    }

    /// Sessions among `session_ids` belonging to a user who logged in
    /// within the last [`ACTIVE_SESSION_WINDOW_MINUTES`].
    ///
    /// Logged-out sessions (`UserID` 0), sessions without a login
    /// timestamp, and ids that cannot be read are skipped.
    pub async fn get_active_user_sessions(&self, session_ids: &[SessionId]) -> Vec<SessionRecord> {
        let cutoff = Utc::now() - chrono::Duration::minutes(ACTIVE_SESSION_WINDOW_MINUTES);
        let mut active = Vec::new();

        for session_id in session_ids {
            let payload = match self.store_get(session_id.as_str()).await {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(session_id = %session_id, error = %e, "Skipping unreadable session");
                    continue;
                }
            };
            let Ok(record) = SessionRecord::from_json(&payload) else {
                continue;
            };
            if record.user_id == 0 {
                continue;
            }
            if record.last_login_time.is_some_and(|at| at >= cutoff) {
                active.push(record);
            }
        }

        active
    }
}

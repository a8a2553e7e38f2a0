//! Per-request session log line.

use super::SessionManager;
use crate::providers::{SessionRequest, SessionStore};
use crate::state::SessionId;

impl<S: SessionStore> SessionManager<S> {
    /// Emit the request log line and mirror the session for downstream
    /// data-access layers. Skipped for pass-through URLs.
    pub fn log_session<R: SessionRequest + ?Sized>(&self, request: &mut R) {
        if self.is_passthrough(request.url()) {
            return;
        }

        let Some(session) = request.session().cloned() else {
            tracing::info!(
                client_ip = request.remote_address().as_deref().unwrap_or(""),
                request_id = request.request_id().as_deref().unwrap_or(""),
                url = request.url(),
                "Request without session"
            );
            return;
        };

        tracing::info!(
            client_ip = request.remote_address().as_deref().unwrap_or(""),
            request_id = request.request_id().as_deref().unwrap_or(""),
            url = request.url(),
            session_id = session.session_id.as_ref().map_or("", SessionId::as_str),
            customer_id = session.customer_id,
            user_id = session.user_id,
            "Request"
        );

        request.mirror_session_data(&session);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::mocks::{MockRequest, MockSessionStore};

    fn manager() -> SessionManager<MockSessionStore> {
        SessionManager::with_store(SessionConfig::new(60), MockSessionStore::new()).unwrap()
    }

    #[tokio::test]
    async fn test_log_session_mirrors_record() {
        let manager = manager();
        let mut request = MockRequest::new("/1.0/CheckSession")
            .with_remote_address("10.0.0.1")
            .with_request_id("req-1");
        manager.get_session(&mut request).await;

        manager.log_session(&mut request);

        assert_eq!(request.mirrored(), request.session());
        assert!(request.mirrored().is_some());
    }

    #[test]
    fn test_log_session_skips_passthrough() {
        let manager = manager();
        let mut request = MockRequest::new("/version");
        request.attach_session(crate::state::SessionRecord::anonymous(None, ""));

        manager.log_session(&mut request);

        assert!(request.mirrored().is_none());
    }
}

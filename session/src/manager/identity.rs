//! Identity resolution: finding, restoring and creating sessions.

use super::{COLLISION_TTL_SECONDS, SessionManager};
use crate::error::StoreError;
use crate::providers::{SessionCookie, SessionRequest, SessionStore};
use crate::state::{SessionId, SessionRecord};

const BEARER_PREFIX: &str = "Bearer ";

impl<S: SessionStore> SessionManager<S> {
    /// Session identifier carried by `request`.
    ///
    /// Precedence: `Authorization: Bearer <id>`, then the session cookie,
    /// then a session already attached earlier in this request. Empty
    /// values are skipped.
    #[must_use]
    pub fn resolve_session_id<R: SessionRequest + ?Sized>(&self, request: &R) -> Option<SessionId> {
        let bearer = request
            .header("authorization")
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty());
        if let Some(token) = bearer {
            return Some(SessionId::from(token));
        }

        if let Some(cookie) = request
            .cookie(&self.config.session_cookie_name)
            .filter(|value| !value.is_empty())
        {
            return Some(SessionId::from(cookie));
        }

        request.session().and_then(|record| record.session_id.clone())
    }

    /// Identifier of the session `request` is working with.
    ///
    /// The session attached during this request wins over the identifier
    /// the client sent, which may be a dangling cookie that `get_session`
    /// has already replaced with a fresh session.
    #[must_use]
    pub fn current_session_id<R: SessionRequest + ?Sized>(&self, request: &R) -> Option<SessionId> {
        request
            .session()
            .and_then(|record| record.session_id.clone())
            .or_else(|| self.resolve_session_id(request))
    }

    /// Restore the caller's session onto `request`, or create one.
    ///
    /// Pass-through URLs are left untouched. A dangling identifier (absent
    /// from the store, unreadable, or the store failing) never blocks the
    /// request: a fresh anonymous session is created instead. A restored
    /// session has its expiry refreshed; a failed refresh is only logged.
    pub async fn get_session<R: SessionRequest + ?Sized>(&self, request: &mut R) {
        if self.is_passthrough(request.url()) {
            return;
        }

        let Some(session_id) = self.resolve_session_id(&*request) else {
            self.create_session(request).await;
            return;
        };

        let payload = match self.store_get(session_id.as_str()).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::warn!(session_id = %session_id, "Session not in store, creating a new one");
                self.create_session(request).await;
                return;
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Session lookup failed, creating a new one");
                self.create_session(request).await;
                return;
            }
        };

        let mut record = match SessionRecord::from_json(&payload) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Stored session unreadable, creating a new one");
                self.create_session(request).await;
                return;
            }
        };
        if record.session_id.is_none() {
            record.session_id = Some(session_id.clone());
        }

        tracing::debug!(
            session_id = %session_id,
            user_id = record.user_id,
            logged_in = record.logged_in,
            "Restored session"
        );
        request.attach_session(record);

        if let Err(e) = self
            .store_touch(session_id.as_str(), self.config.session_timeout)
            .await
        {
            tracing::error!(session_id = %session_id, error = %e, "Failed to refresh session expiry");
        } else {
            tracing::trace!(session_id = %session_id, "Refreshed session expiry");
        }
    }

    /// Create a session, attach it to `request` and queue its cookie.
    ///
    /// Uses the request's override data verbatim when present; otherwise
    /// mints `SES<uuid>` with an anonymous packet. Store failures are
    /// logged; the session is attached and the cookie set regardless.
    pub async fn create_session<R: SessionRequest + ?Sized>(&self, request: &mut R) {
        let mut record = request
            .override_data()
            .unwrap_or_else(|| SessionRecord::anonymous(None, &self.config.version));
        let session_id = record
            .session_id
            .get_or_insert_with(SessionId::generate)
            .clone();

        match record.to_json() {
            Ok(payload) => self.persist_new_session(&session_id, &payload).await,
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Failed to serialize new session");
            }
        }

        let cookie = SessionCookie {
            name: self.config.session_cookie_name.clone(),
            value: session_id.to_string(),
            path: "/".to_string(),
            max_age_seconds: self.config.session_timeout,
            http_only: true,
            domain: self.wildcard_cookie_domain(&*request),
        };

        tracing::info!(
            session_id = %session_id,
            domain = cookie.domain.as_deref().unwrap_or(""),
            "Created session"
        );

        request.attach_session(record);
        request.set_cookie(cookie);
    }

    async fn persist_new_session(&self, session_id: &SessionId, payload: &str) {
        let key = session_id.as_str();
        let timeout = self.config.session_timeout;

        if let Ok(Some(_)) = self.store_get(key).await {
            tracing::warn!(session_id = %session_id, "Session id collision, replacing existing key");
            if let Err(e) = self.store_replace(key, payload, COLLISION_TTL_SECONDS).await {
                tracing::error!(session_id = %session_id, error = %e, "Failed to replace colliding session");
            }
            return;
        }

        let result = match self.store_set(key, payload, timeout).await {
            Err(StoreError::AlreadyExists) => self.store_replace(key, payload, timeout).await,
            other => other,
        };
        if let Err(e) = result {
            tracing::error!(session_id = %session_id, error = %e, "Failed to store new session");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::mocks::{MockRequest, MockSessionStore, StoreOp};

    fn manager() -> SessionManager<MockSessionStore> {
        SessionManager::with_store(SessionConfig::new(60), MockSessionStore::new()).unwrap()
    }

    async fn seed(manager: &SessionManager<MockSessionStore>, record: &SessionRecord) {
        let id = record.session_id.clone().unwrap();
        manager
            .store()
            .inner()
            .replace(id.as_str(), &record.to_json().unwrap(), 60)
            .await
            .unwrap();
    }

    #[test]
    fn test_resolution_precedence() {
        let manager = manager();

        let request = MockRequest::new("/")
            .with_bearer("SESbearer")
            .with_cookie("UserSession", "SEScookie");
        assert_eq!(manager.resolve_session_id(&request), Some(SessionId::from("SESbearer")));

        let request = MockRequest::new("/").with_cookie("UserSession", "SEScookie");
        assert_eq!(manager.resolve_session_id(&request), Some(SessionId::from("SEScookie")));

        let mut request = MockRequest::new("/");
        assert_eq!(manager.resolve_session_id(&request), None);
        request.attach_session(SessionRecord::anonymous(Some(SessionId::from("SESattached")), ""));
        assert_eq!(manager.resolve_session_id(&request), Some(SessionId::from("SESattached")));
    }

    #[test]
    fn test_non_bearer_and_empty_values_are_skipped() {
        let manager = manager();

        let request = MockRequest::new("/")
            .with_header("Authorization", "Basic dXNlcjp0ZXN0")
            .with_cookie("UserSession", "SEScookie");
        assert_eq!(manager.resolve_session_id(&request), Some(SessionId::from("SEScookie")));

        let request = MockRequest::new("/")
            .with_header("Authorization", "Bearer ")
            .with_cookie("UserSession", "");
        assert_eq!(manager.resolve_session_id(&request), None);
    }

    #[tokio::test]
    async fn test_new_request_gets_anonymous_session_and_cookie() {
        let manager = manager();
        let mut request = MockRequest::new("/1.0/CheckSession").with_header("Host", "app.example.com");

        manager.get_session(&mut request).await;

        let record = request.session().unwrap();
        assert!(!record.logged_in);
        assert_eq!(record.user_id, 0);
        let id = record.session_id.clone().unwrap();
        assert!(id.as_str().starts_with("SES"));

        let cookie = &request.set_cookies()[0];
        assert_eq!(cookie.name, "UserSession");
        assert_eq!(cookie.value, id.as_str());
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.max_age_seconds, 60);
        assert!(cookie.http_only);
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));

        assert!(manager.store().inner().get(id.as_str()).await.unwrap().is_some());
        assert_eq!(manager.store().calls(StoreOp::Set), 1);
    }

    #[tokio::test]
    async fn test_existing_session_is_restored_and_touched() {
        let manager = manager();
        let mut stored = SessionRecord::logged_in("User", 1, 42, "1.0.0");
        stored.session_id = Some(SessionId::from("SESknown"));
        seed(&manager, &stored).await;

        let mut request = MockRequest::new("/").with_cookie("UserSession", "SESknown");
        manager.get_session(&mut request).await;

        assert_eq!(request.session(), Some(&stored));
        assert!(request.set_cookies().is_empty());
        assert_eq!(manager.store().calls(StoreOp::Touch), 1);
        assert_eq!(manager.store().calls(StoreOp::Set), 0);
    }

    #[tokio::test]
    async fn test_dangling_cookie_self_heals() {
        let manager = manager();
        let mut request = MockRequest::new("/").with_cookie("UserSession", "SESgone");

        manager.get_session(&mut request).await;

        let id = request.session().unwrap().session_id.clone().unwrap();
        assert_ne!(id.as_str(), "SESgone");
        assert_eq!(request.set_cookies().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_payload_self_heals() {
        let manager = manager();
        manager.store().inner().replace("SESbad", "garbage", 60).await.unwrap();

        let mut request = MockRequest::new("/").with_cookie("UserSession", "SESbad");
        manager.get_session(&mut request).await;

        let record = request.session().unwrap();
        assert_ne!(record.session_id, Some(SessionId::from("SESbad")));
        assert!(!record.logged_in);
    }

    #[tokio::test]
    async fn test_store_outage_still_yields_anonymous_session() {
        let manager =
            SessionManager::with_store(SessionConfig::new(60), MockSessionStore::failing()).unwrap();
        let mut request = MockRequest::new("/").with_cookie("UserSession", "SESknown");

        manager.get_session(&mut request).await;

        let record = request.session().unwrap();
        assert!(!record.logged_in);
        assert_eq!(request.set_cookies().len(), 1);
    }

    #[tokio::test]
    async fn test_passthrough_url_is_skipped() {
        let manager = manager();
        let mut request = MockRequest::new("/ping.html");

        manager.get_session(&mut request).await;

        assert!(request.session().is_none());
        assert!(request.set_cookies().is_empty());
        assert_eq!(manager.store().calls(StoreOp::Get), 0);
    }

    #[tokio::test]
    async fn test_override_data_is_used_verbatim() {
        let manager = manager();
        let mut seeded = SessionRecord::logged_in("Service", 9, 77, "");
        seeded.session_id = Some(SessionId::from("SESseeded"));
        let mut request = MockRequest::new("/").with_override(seeded.clone());

        manager.create_session(&mut request).await;

        assert_eq!(request.session(), Some(&seeded));
        assert_eq!(request.set_cookies()[0].value, "SESseeded");
        let stored = manager.store().inner().get("SESseeded").await.unwrap().unwrap();
        assert_eq!(SessionRecord::from_json(&stored).unwrap(), seeded);
    }

    #[tokio::test]
    async fn test_collision_replaces_with_short_ttl() {
        let manager = manager();
        manager.store().inner().replace("SEStaken", "old", 60).await.unwrap();

        let mut seeded = SessionRecord::anonymous(Some(SessionId::from("SEStaken")), "");
        seeded.email = "new@example.com".to_string();
        let mut request = MockRequest::new("/").with_override(seeded.clone());
        manager.create_session(&mut request).await;

        assert_eq!(manager.store().calls(StoreOp::Set), 0);
        assert_eq!(manager.store().calls(StoreOp::Replace), 1);
        let stored = manager.store().inner().get("SEStaken").await.unwrap().unwrap();
        assert_eq!(SessionRecord::from_json(&stored).unwrap(), seeded);
        assert_eq!(request.set_cookies().len(), 1);
    }

    #[tokio::test]
    async fn test_current_session_id_prefers_attached_session() {
        let manager = manager();
        let mut request = MockRequest::new("/").with_cookie("UserSession", "SESexpired");
        assert_eq!(manager.current_session_id(&request), Some(SessionId::from("SESexpired")));

        manager.get_session(&mut request).await;

        let issued = SessionId::from(request.set_cookies()[0].value.as_str());
        assert_eq!(manager.resolve_session_id(&request), Some(SessionId::from("SESexpired")));
        assert_eq!(manager.current_session_id(&request), Some(issued));
    }

    #[tokio::test]
    async fn test_collided_key_expires_after_collision_ttl() {
        use crate::mocks::MockClock;
        use crate::stores::InMemorySessionStore;
        use chrono::Duration;
        use std::sync::Arc;

        let clock = MockClock::new();
        let store = InMemorySessionStore::with_clock(100, Arc::new(clock.clone()));
        let manager = SessionManager::with_store(SessionConfig::new(3600), store).unwrap();
        manager.store().replace("SEStaken", "old", 3600).await.unwrap();

        let seeded = SessionRecord::anonymous(Some(SessionId::from("SEStaken")), "");
        let mut request = MockRequest::new("/").with_override(seeded);
        manager.create_session(&mut request).await;

        // Rewritten with the collision TTL, not the 3600s session timeout
        let ttl = i64::try_from(COLLISION_TTL_SECONDS).unwrap();
        clock.advance(Duration::seconds(ttl));
        assert!(manager.store().get("SEStaken").await.unwrap().is_some());
        clock.advance(Duration::seconds(1));
        assert!(manager.store().get("SEStaken").await.unwrap().is_none());
    }
}

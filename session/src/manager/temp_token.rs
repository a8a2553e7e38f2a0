//! Temp-token delegation.
//!
//! A logged-in session checks out a `TempSessionToken-<uuid>` that maps to
//! its own session id. Any other client presenting the token as
//! `?SessionToken=` imports that identity into its *own* session row.
//! Tokens are not consumed on use; they stay redeemable until they expire.

use super::SessionManager;
use crate::error::{Result, SessionError};
use crate::providers::{SessionRequest, SessionStore};
use crate::state::{SessionId, SessionRecord, generate_temp_token};

/// Query parameter carrying a temp token.
pub const SESSION_TOKEN_PARAM: &str = "SessionToken";

impl<S: SessionStore> SessionManager<S> {
    /// Import the identity behind a `SessionToken` query parameter.
    ///
    /// Never fails the request: an unknown token, a vanished parent session,
    /// or a parent that is not logged in only skips the import.
    pub async fn get_temp_session<R: SessionRequest + ?Sized>(&self, request: &mut R) {
        let Some(token) = request
            .query_param(SESSION_TOKEN_PARAM)
            .filter(|token| !token.is_empty())
        else {
            return;
        };

        match self.import_temp_session(request, &token).await {
            Ok(record) => {
                tracing::info!(
                    session_id = ?record.session_id.as_ref().map(SessionId::as_str),
                    user_id = record.user_id,
                    "Imported session from temp token"
                );
            }
            Err(e) => {
                tracing::warn!(token = %token, error = %e, "Temp session token not imported");
            }
        }
    }

    async fn import_temp_session<R: SessionRequest + ?Sized>(
        &self,
        request: &mut R,
        token: &str,
    ) -> Result<SessionRecord> {
        let parent_id = self
            .store_get(token)
            .await?
            .ok_or(SessionError::TempTokenNotFound)?;

        let payload = self
            .store_get(&parent_id)
            .await
            .map_err(|_| SessionError::ParentSessionGone)?
            .ok_or(SessionError::ParentSessionGone)?;

        let parent = SessionRecord::from_json(&payload)?;
        if !parent.logged_in {
            return Err(SessionError::ParentSessionNotLoggedIn);
        }

        // The importer keeps its own session row
        let mut imported = parent;
        imported.session_id = self.current_session_id(&*request);

        self.set_session_login_status(request, imported.clone()).await;
        Ok(imported)
    }

    /// Issue a temp token for the logged-in session attached to `request`.
    ///
    /// The token maps to the current session id for
    /// `SessionTempTokenTimeout` minutes.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The attached session is not logged in → `SessionError::NotLoggedIn`
    /// - The token cannot be stored → `SessionError::StoreBackendUnavailable`
    pub async fn checkout_session_token<R: SessionRequest + ?Sized>(
        &self,
        request: &R,
    ) -> Result<String> {
        let session = request
            .session()
            .filter(|session| session.logged_in)
            .ok_or(SessionError::NotLoggedIn)?;
        let session_id = session
            .session_id
            .clone()
            .or_else(|| self.resolve_session_id(request))
            .ok_or(SessionError::NotLoggedIn)?;

        let token = generate_temp_token();
        self.store_set(
            &token,
            session_id.as_str(),
            self.config.temp_token_timeout_seconds(),
        )
        .await
        .inspect_err(|e| {
            tracing::error!(session_id = %session_id, error = %e, "Failed to check out session token");
        })?;

        tracing::info!(
            session_id = %session_id,
            user_id = session.user_id,
            "Checked out session token"
        );
        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::mocks::{MockClock, MockRequest, MockSessionStore};
    use crate::stores::InMemorySessionStore;
    use std::sync::Arc;

    fn manager() -> SessionManager<MockSessionStore> {
        SessionManager::with_store(
            SessionConfig::new(3600).with_temp_token_timeout(5),
            MockSessionStore::new(),
        )
        .unwrap()
    }

    async fn logged_in_request(
        manager: &SessionManager<MockSessionStore>,
        user_id: i64,
    ) -> MockRequest {
        let mut request = MockRequest::new("/");
        manager.get_session(&mut request).await;
        manager
            .set_session_login_status(&mut request, SessionRecord::logged_in("User", 1, user_id, ""))
            .await;
        request
    }

    async fn anonymous_request(manager: &SessionManager<MockSessionStore>) -> MockRequest {
        let mut request = MockRequest::new("/");
        manager.get_session(&mut request).await;
        request
    }

    #[tokio::test]
    async fn test_checkout_requires_login() {
        let manager = manager();
        let request = anonymous_request(&manager).await;
        assert_eq!(
            manager.checkout_session_token(&request).await,
            Err(SessionError::NotLoggedIn)
        );

        assert_eq!(
            manager.checkout_session_token(&MockRequest::new("/")).await,
            Err(SessionError::NotLoggedIn)
        );
    }

    #[tokio::test]
    async fn test_checkout_maps_token_to_session() {
        let manager = manager();
        let request = logged_in_request(&manager, 7).await;
        let parent_id = request.session().unwrap().session_id.clone().unwrap();

        let token = manager.checkout_session_token(&request).await.unwrap();

        assert!(token.starts_with("TempSessionToken-"));
        let mapped = manager.store().inner().get(&token).await.unwrap();
        assert_eq!(mapped.as_deref(), Some(parent_id.as_str()));
    }

    #[tokio::test]
    async fn test_redeem_imports_identity_into_own_row() {
        let manager = manager();
        let parent = logged_in_request(&manager, 7).await;
        let token = manager.checkout_session_token(&parent).await.unwrap();

        let importer = anonymous_request(&manager).await;
        let own_id = importer.session().unwrap().session_id.clone().unwrap();
        let mut importer = importer.follow_up("/").with_query("SessionToken", token.clone());
        manager.get_session(&mut importer).await;
        manager.get_temp_session(&mut importer).await;

        let record = importer.session().unwrap();
        assert_eq!(record.session_id.as_ref(), Some(&own_id));
        assert!(record.logged_in);
        assert_eq!(record.user_id, 7);

        // Persisted under the importer's id, not the parent's
        let stored = manager.store().inner().get(own_id.as_str()).await.unwrap().unwrap();
        assert_eq!(SessionRecord::from_json(&stored).unwrap().user_id, 7);

        // Multi-use: a second client can redeem the same token
        let mut second = anonymous_request(&manager)
            .await
            .follow_up("/")
            .with_query("SessionToken", token);
        manager.get_session(&mut second).await;
        manager.get_temp_session(&mut second).await;
        assert_eq!(second.session().unwrap().user_id, 7);
    }

    #[tokio::test]
    async fn test_unknown_token_is_a_no_op() {
        let manager = manager();
        let mut request = anonymous_request(&manager)
            .await
            .follow_up("/")
            .with_query("SessionToken", "TempSessionToken-nope");
        manager.get_session(&mut request).await;
        let before = request.session().cloned();

        manager.get_temp_session(&mut request).await;
        assert_eq!(request.session().cloned(), before);
    }

    #[tokio::test]
    async fn test_logged_out_parent_is_not_imported() {
        let manager = manager();
        let mut parent = logged_in_request(&manager, 7).await;
        let token = manager.checkout_session_token(&parent).await.unwrap();
        manager.deauthenticate_user(&mut parent).await;

        let mut importer = anonymous_request(&manager)
            .await
            .follow_up("/")
            .with_query("SessionToken", token);
        manager.get_session(&mut importer).await;
        manager.get_temp_session(&mut importer).await;

        assert!(!importer.session().unwrap().logged_in);
    }

    #[tokio::test]
    async fn test_import_errors_follow_taxonomy() {
        let manager = manager();
        let mut request = anonymous_request(&manager).await;

        let result = manager.import_temp_session(&mut request, "TempSessionToken-x").await;
        assert_eq!(result, Err(SessionError::TempTokenNotFound));

        manager.store().inner().replace("TempSessionToken-y", "SESmissing", 60).await.unwrap();
        let result = manager.import_temp_session(&mut request, "TempSessionToken-y").await;
        assert_eq!(result, Err(SessionError::ParentSessionGone));
    }

    #[tokio::test]
    async fn test_token_expires_after_ttl_minutes() {
        let clock = MockClock::new();
        let inner = InMemorySessionStore::with_clock(100, Arc::new(clock.clone()));
        let manager = SessionManager::with_store(
            SessionConfig::new(3600).with_temp_token_timeout(5),
            MockSessionStore::wrapping(inner),
        )
        .unwrap();

        let parent = logged_in_request(&manager, 7).await;
        let token = manager.checkout_session_token(&parent).await.unwrap();

        clock.advance(chrono::Duration::minutes(4));
        assert!(manager.store().inner().get(&token).await.unwrap().is_some());

        clock.advance(chrono::Duration::minutes(2));
        let mut importer = anonymous_request(&manager)
            .await
            .follow_up("/")
            .with_query("SessionToken", token);
        manager.get_session(&mut importer).await;
        manager.get_temp_session(&mut importer).await;
        assert!(!importer.session().unwrap().logged_in);
    }

    #[tokio::test]
    async fn test_redeem_with_dangling_cookie_lands_on_fresh_session() {
        let manager = manager();
        let owner = logged_in_request(&manager, 42).await;
        let token = manager.checkout_session_token(&owner).await.unwrap();

        let mut importer = MockRequest::new("/")
            .with_cookie("UserSession", "SESexpired")
            .with_query("SessionToken", token);
        manager.get_session(&mut importer).await;
        manager.get_temp_session(&mut importer).await;

        let issued = importer.set_cookies()[0].value.clone();
        assert_ne!(issued, "SESexpired");
        assert_eq!(
            importer.session().unwrap().session_id,
            Some(SessionId::from(issued.as_str()))
        );
        assert!(manager.store().inner().get("SESexpired").await.unwrap().is_none());

        // The browser now presents the fresh cookie and stays logged in
        let mut next = importer.follow_up("/");
        manager.get_session(&mut next).await;
        let record = next.session().unwrap();
        assert!(record.logged_in);
        assert_eq!(record.user_id, 42);
    }
}

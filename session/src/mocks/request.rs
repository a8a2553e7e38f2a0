//! Mock request for testing.

use crate::providers::{SessionCookie, SessionRequest};
use crate::state::SessionRecord;
use std::collections::HashMap;

/// In-memory [`SessionRequest`].
///
/// Header names are stored lowercased. Cookies set by the manager are
/// captured in [`MockRequest::set_cookies`] instead of being written to a
/// response.
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    url: String,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    query: HashMap<String, String>,
    remote_address: Option<String>,
    request_id: Option<String>,
    override_data: Option<SessionRecord>,
    session: Option<SessionRecord>,
    set_cookies: Vec<SessionCookie>,
    mirrored: Option<SessionRecord>,
}

impl MockRequest {
    /// Create a request for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Add an `Authorization: Bearer <token>` header.
    #[must_use]
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("authorization", format!("Bearer {token}"))
    }

    /// Add a request cookie.
    #[must_use]
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Set the client address.
    #[must_use]
    pub fn with_remote_address(mut self, address: impl Into<String>) -> Self {
        self.remote_address = Some(address.into());
        self
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Supply override data for session creation.
    #[must_use]
    pub fn with_override(mut self, record: SessionRecord) -> Self {
        self.override_data = Some(record);
        self
    }

    /// Cookies the manager queued for the response.
    #[must_use]
    pub fn set_cookies(&self) -> &[SessionCookie] {
        &self.set_cookies
    }

    /// The record mirrored under the alternate attribute name.
    #[must_use]
    pub fn mirrored(&self) -> Option<&SessionRecord> {
        self.mirrored.as_ref()
    }

    /// A new request to `url` echoing the cookies this one received, as a
    /// browser would on its next request.
    #[must_use]
    pub fn follow_up(&self, url: impl Into<String>) -> Self {
        let mut next = Self::new(url);
        next.cookies.clone_from(&self.cookies);
        for cookie in &self.set_cookies {
            next.cookies.insert(cookie.name.clone(), cookie.value.clone());
        }
        next
    }
}

impl SessionRequest for MockRequest {
    fn url(&self) -> &str {
        &self.url
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.query.get(name).cloned()
    }

    fn remote_address(&self) -> Option<String> {
        self.remote_address.clone()
    }

    fn request_id(&self) -> Option<String> {
        self.request_id.clone()
    }

    fn set_cookie(&mut self, cookie: SessionCookie) {
        self.set_cookies.push(cookie);
    }

    fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    fn attach_session(&mut self, record: SessionRecord) {
        self.session = Some(record);
    }

    fn override_data(&self) -> Option<SessionRecord> {
        self.override_data.clone()
    }

    fn mirror_session_data(&mut self, record: &SessionRecord) {
        self.mirrored = Some(record.clone());
    }
}

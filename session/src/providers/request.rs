//! Request capability trait.
//!
//! The session manager never touches a framework's request type directly.
//! Each host framework supplies an adapter implementing [`SessionRequest`]
//! over its own request/response pair, and the manager is written once
//! against this trait.

use crate::state::SessionRecord;

/// A cookie the manager wants set on the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value (the session id).
    pub value: String,
    /// Cookie path.
    pub path: String,
    /// Lifetime in seconds.
    pub max_age_seconds: u64,
    /// Hide from scripts.
    pub http_only: bool,
    /// Wildcard domain; `None` for a host-only cookie.
    pub domain: Option<String>,
}

/// Capabilities the session manager needs from an in-flight request.
///
/// Header lookups are case-insensitive. The attached session is a
/// transient copy owned by this request only; the store remains the
/// source of truth.
pub trait SessionRequest: Send + Sync {
    /// Request path (without query string).
    fn url(&self) -> &str;

    /// Header value by name.
    fn header(&self, name: &str) -> Option<&str>;

    /// Cookie value by name.
    fn cookie(&self, name: &str) -> Option<String>;

    /// Query parameter by name.
    fn query_param(&self, name: &str) -> Option<String>;

    /// Client address as seen by the server.
    fn remote_address(&self) -> Option<String>;

    /// Request correlation id, if the host assigns one.
    fn request_id(&self) -> Option<String>;

    /// Queue a cookie for the response.
    fn set_cookie(&mut self, cookie: SessionCookie);

    /// The session attached to this request.
    fn session(&self) -> Option<&SessionRecord>;

    /// Attach (or replace) the session for the rest of this request.
    fn attach_session(&mut self, record: SessionRecord);

    /// Seed data for session creation supplied by a privileged caller.
    fn override_data(&self) -> Option<SessionRecord> {
        None
    }

    /// Expose the session under the alternate name older data-access
    /// layers read.
    fn mirror_session_data(&mut self, _record: &SessionRecord) {}
}

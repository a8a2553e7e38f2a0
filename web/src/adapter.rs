//! Axum adapter for [`SessionRequest`].
//!
//! The adapter borrows the request [`Parts`] for the duration of a session
//! operation. The attached session lives in the request extensions as
//! [`AttachedSession`], so handlers further down the stack see whatever the
//! manager attached. Cookies the manager wants set are queued and written
//! onto the response with [`append_set_cookies`].

use crate::extractors::{CorrelationId, client_ip};
use axum::{
    extract::ConnectInfo,
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
};
use composable_rust_session::{SessionCookie, SessionRecord, SessionRequest};
use cookie::{Cookie, time::Duration};
use std::collections::HashMap;
use std::net::SocketAddr;

/// The session attached to a request by the session layer.
#[derive(Debug, Clone)]
pub struct AttachedSession(pub SessionRecord);

/// Seed data for session creation.
///
/// A privileged upstream layer may insert this extension before the
/// session layer runs; a newly created session then starts from this
/// record instead of the anonymous packet.
#[derive(Debug, Clone)]
pub struct SessionOverride(pub SessionRecord);

/// The session, mirrored under the name older data-access layers read.
#[derive(Debug, Clone)]
pub struct SessionData(pub SessionRecord);

/// [`SessionRequest`] over borrowed axum request parts.
pub struct AxumSessionRequest<'a> {
    parts: &'a mut Parts,
    cookies: HashMap<String, String>,
    query: HashMap<String, String>,
    pending: Vec<SessionCookie>,
}

impl<'a> AxumSessionRequest<'a> {
    /// Wrap request parts, parsing cookies and the query string once.
    pub fn new(parts: &'a mut Parts) -> Self {
        let cookies = parse_cookies(&parts.headers);
        let query = parts.uri.query().map(parse_query).unwrap_or_default();
        Self {
            parts,
            cookies,
            query,
            pending: Vec::new(),
        }
    }

    /// Cookies queued for the response so far.
    #[must_use]
    pub fn pending_cookies(&self) -> &[SessionCookie] {
        &self.pending
    }

    /// Release the parts, returning the queued cookies.
    #[must_use]
    pub fn into_pending_cookies(self) -> Vec<SessionCookie> {
        self.pending
    }
}

impl SessionRequest for AxumSessionRequest<'_> {
    fn url(&self) -> &str {
        self.parts.uri.path()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn query_param(&self, name: &str) -> Option<String> {
        self.query.get(name).cloned()
    }

    fn remote_address(&self) -> Option<String> {
        client_ip(
            &self.parts.headers,
            self.parts.extensions.get::<ConnectInfo<SocketAddr>>(),
        )
        .map(|ip| ip.to_string())
    }

    fn request_id(&self) -> Option<String> {
        self.parts
            .extensions
            .get::<CorrelationId>()
            .map(|id| id.0.to_string())
    }

    fn set_cookie(&mut self, cookie: SessionCookie) {
        self.pending.push(cookie);
    }

    fn session(&self) -> Option<&SessionRecord> {
        self.parts
            .extensions
            .get::<AttachedSession>()
            .map(|attached| &attached.0)
    }

    fn attach_session(&mut self, record: SessionRecord) {
        self.parts.extensions.insert(AttachedSession(record));
    }

    fn override_data(&self) -> Option<SessionRecord> {
        self.parts
            .extensions
            .get::<SessionOverride>()
            .map(|seed| seed.0.clone())
    }

    fn mirror_session_data(&mut self, record: &SessionRecord) {
        self.parts.extensions.insert(SessionData(record.clone()));
    }
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for value in headers.get_all(COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for cookie in Cookie::split_parse(raw).flatten() {
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value().to_string());
        }
    }
    cookies
}

fn parse_query(query: &str) -> HashMap<String, String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    let mut params = HashMap::new();
    for (key, value) in pairs {
        params.entry(key).or_insert(value);
    }
    params
}

/// Render a queued session cookie as a `Set-Cookie` cookie.
#[must_use]
pub fn to_set_cookie(cookie: &SessionCookie) -> Cookie<'static> {
    let max_age = i64::try_from(cookie.max_age_seconds).unwrap_or(i64::MAX);
    let mut builder = Cookie::build((cookie.name.clone(), cookie.value.clone()))
        .path(cookie.path.clone())
        .http_only(cookie.http_only)
        .max_age(Duration::seconds(max_age));
    if let Some(domain) = &cookie.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

/// Append `Set-Cookie` headers for the queued cookies.
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: &[SessionCookie]) {
    for cookie in cookies {
        match HeaderValue::from_str(&to_set_cookie(cookie).to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => {
                tracing::error!(cookie = %cookie.name, error = %e, "Unrepresentable session cookie");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).expect("Valid request").into_parts().0
    }

    #[test]
    fn test_reads_cookies_query_and_headers() {
        let mut parts = parts(
            Request::builder()
                .uri("/1.0/CheckSession?SessionToken=TempSessionToken-abc&x=1")
                .header("Cookie", "theme=dark; UserSession=SES123")
                .header("X-Forwarded-For", "203.0.113.9")
                .header("User-Agent", "curl/8"),
        );
        let request = AxumSessionRequest::new(&mut parts);

        assert_eq!(request.url(), "/1.0/CheckSession");
        assert_eq!(request.cookie("UserSession").as_deref(), Some("SES123"));
        assert_eq!(request.cookie("missing"), None);
        assert_eq!(
            request.query_param("SessionToken").as_deref(),
            Some("TempSessionToken-abc")
        );
        assert_eq!(request.header("user-agent"), Some("curl/8"));
        assert_eq!(request.remote_address().as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_attach_and_mirror_land_in_extensions() {
        let mut parts = parts(Request::builder().uri("/"));
        let record = SessionRecord::logged_in("User", 1, 7, "");
        {
            let mut request = AxumSessionRequest::new(&mut parts);
            assert!(request.session().is_none());
            request.attach_session(record.clone());
            request.mirror_session_data(&record);
            assert_eq!(request.session(), Some(&record));
        }

        assert_eq!(parts.extensions.get::<AttachedSession>().map(|a| &a.0), Some(&record));
        assert_eq!(parts.extensions.get::<SessionData>().map(|d| &d.0), Some(&record));
    }

    #[test]
    fn test_override_data_from_extension() {
        let mut parts = parts(Request::builder().uri("/"));
        let seed = SessionRecord::logged_in("Service", 3, 42, "");
        parts.extensions.insert(SessionOverride(seed.clone()));

        let request = AxumSessionRequest::new(&mut parts);

        assert_eq!(request.override_data(), Some(seed));
    }

    #[test]
    fn test_set_cookie_rendering() {
        let cookie = SessionCookie {
            name: "UserSession".to_string(),
            value: "SES123".to_string(),
            path: "/".to_string(),
            max_age_seconds: 60,
            http_only: true,
            domain: Some("example.com".to_string()),
        };

        let mut headers = HeaderMap::new();
        append_set_cookies(&mut headers, std::slice::from_ref(&cookie));

        let rendered = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(rendered.starts_with("UserSession=SES123"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Domain=example.com"));
        assert!(rendered.contains("Max-Age=60"));
    }

    #[test]
    fn test_host_only_cookie_has_no_domain() {
        let cookie = SessionCookie {
            name: "UserSession".to_string(),
            value: "SES1".to_string(),
            path: "/".to_string(),
            max_age_seconds: 60,
            http_only: true,
            domain: None,
        };

        assert!(to_set_cookie(&cookie).domain().is_none());
    }
}

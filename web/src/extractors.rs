//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request correlation id
//! - `ClientIp`: client IP address from proxy headers or the connection
//! - `CurrentSession`: the session attached by [`SessionLayer`](crate::SessionLayer)
//! - `AuthenticatedSession`: as `CurrentSession`, but 401 unless logged in
//!
//! # Examples
//!
//! ```ignore
//! use composable_rust_session_web::extractors::{ClientIp, CorrelationId, CurrentSession};
//!
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     client_ip: ClientIp,
//!     CurrentSession(session): CurrentSession,
//! ) -> String {
//!     tracing::info!(
//!         correlation_id = %correlation_id.0,
//!         client_ip = %client_ip.0,
//!         user_id = session.user_id,
//!         "Processing request"
//!     );
//!     format!("Hello user {}", session.user_id)
//! }
//! ```

use crate::adapter::AttachedSession;
use crate::error::AppError;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use composable_rust_session::{SessionError, SessionRecord};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Correlation ID for request tracing.
///
/// Taken from request extensions when the correlation middleware ran,
/// otherwise from the `X-Correlation-ID` header, otherwise freshly
/// generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Read from headers, generating a new id if absent or malformed.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self(
            headers
                .get(CORRELATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_else(Uuid::new_v4),
        )
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .copied()
            .unwrap_or_else(|| Self::from_headers(&parts.headers)))
    }
}

/// Client IP address.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Connection IP (when the server was started with connect info)
/// 4. `127.0.0.1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = client_ip(&parts.headers, parts.extensions.get())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        Ok(Self(ip))
    }
}

/// Client IP from proxy headers or connection info.
pub(crate) fn client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<IpAddr> {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    let real_ip = headers
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());
    if real_ip.is_some() {
        return real_ip;
    }

    connect_info.map(|ConnectInfo(addr)| addr.ip())
}

/// The session attached to this request.
///
/// Rejects with 500 if [`SessionLayer`](crate::SessionLayer) did not run
/// for this route (not installed, or a pass-through URL).
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionRecord);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AttachedSession>()
            .map(|attached| Self(attached.0.clone()))
            .ok_or_else(|| AppError::internal("Session middleware not installed"))
    }
}

/// A logged-in session.
///
/// Rejects with 401 `User not logged in!` for anonymous sessions.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub SessionRecord);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        if session.is_authenticated() {
            Ok(Self(session))
        } else {
            Err(SessionError::NotLoggedIn.into())
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

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let mut parts = parts(Request::builder().header(CORRELATION_ID_HEADER, uuid.to_string()));

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = CorrelationId(Uuid::new_v4());
        let mut parts = parts(Request::builder().header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string()));
        parts.extensions.insert(stored);

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(correlation_id, stored);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let mut parts = parts(Request::builder().header(CORRELATION_ID_HEADER, "not-a-uuid"));

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();

        assert_ne!(correlation_id.0, Uuid::nil());
    }

    #[tokio::test]
    async fn test_client_ip_from_x_forwarded_for() {
        let mut parts = parts(Request::builder().header("X-Forwarded-For", "203.0.113.1, 198.51.100.1"));

        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(client_ip.0.to_string(), "203.0.113.1");
    }

    #[tokio::test]
    async fn test_client_ip_from_connect_info() {
        let mut parts = parts(Request::builder());
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 5555))));

        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(client_ip.0.to_string(), "192.0.2.7");
    }

    #[tokio::test]
    async fn test_client_ip_fallback() {
        let mut parts = parts(Request::builder());

        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(client_ip.0.to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_current_session_requires_middleware() {
        let mut parts = parts(Request::builder());
        assert!(CurrentSession::from_request_parts(&mut parts, &()).await.is_err());

        let record = SessionRecord::anonymous(None, "");
        parts.extensions.insert(AttachedSession(record.clone()));
        let CurrentSession(session) = CurrentSession::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(session, record);
    }

    #[tokio::test]
    async fn test_authenticated_session_rejects_anonymous() {
        let mut parts = parts(Request::builder());
        parts
            .extensions
            .insert(AttachedSession(SessionRecord::anonymous(None, "")));
        assert!(AuthenticatedSession::from_request_parts(&mut parts, &()).await.is_err());

        let record = SessionRecord::logged_in("User", 1, 9, "");
        parts.extensions.insert(AttachedSession(record.clone()));
        let AuthenticatedSession(session) = AuthenticatedSession::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(session.user_id, 9);
    }
}

//! Axum middleware for request tracking and session handling.
//!
//! This module provides middleware layers for:
//! - **Correlation ID tracking**: Extract or generate correlation IDs for distributed tracing
//! - **Session lifecycle**: resolve or create the session, import temp tokens,
//!   log the request, and write session cookies onto the response
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use composable_rust_session_web::middleware::{correlation_id_layer, SessionLayer};
//!
//! let app = Router::new()
//!     .route("/api/things", get(list_things))
//!     .layer(SessionLayer::new(manager))
//!     .layer(correlation_id_layer());
//! ```
//!
//! The correlation layer must be the outer one so the session log line
//! carries the request's correlation id.

use crate::adapter::{AxumSessionRequest, append_set_cookies};
use crate::extractors::{CORRELATION_ID_HEADER, CorrelationId};
use axum::{extract::Request, http::HeaderValue, response::Response};
use composable_rust_session::{SessionBackend, SessionManager, SessionStore};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

// ═══════════════════════════════════════════════════════════════════════
// Correlation ID
// ═══════════════════════════════════════════════════════════════════════

/// Create a layer that adds correlation ID tracking to all requests.
///
/// This layer:
/// - Extracts correlation ID from request header or generates new UUID
/// - Stores [`CorrelationId`] in request extensions
/// - Creates tracing span with correlation_id field
/// - Injects correlation ID into response header
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = CorrelationId::from_headers(req.headers());
        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id.0,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.0.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════

/// Layer running the session lifecycle around every request.
///
/// Before the inner service: `get_session`, then `get_temp_session`, then
/// `log_session`. After it: any session cookie the manager issued is
/// appended as `Set-Cookie`. Pass-through URLs skip all of it.
pub struct SessionLayer<St = SessionBackend> {
    manager: Arc<SessionManager<St>>,
}

impl<St> SessionLayer<St> {
    /// Create a layer sharing `manager`.
    #[must_use]
    pub const fn new(manager: Arc<SessionManager<St>>) -> Self {
        Self { manager }
    }
}

impl<St> Clone for SessionLayer<St> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<S, St> Layer<S> for SessionLayer<St> {
    type Service = SessionMiddleware<S, St>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionMiddleware {
            inner,
            manager: Arc::clone(&self.manager),
        }
    }
}

/// Middleware service created by [`SessionLayer`].
pub struct SessionMiddleware<S, St = SessionBackend> {
    inner: S,
    manager: Arc<SessionManager<St>>,
}

impl<S: Clone, St> Clone for SessionMiddleware<S, St> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<S, St> Service<Request> for SessionMiddleware<S, St>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    St: SessionStore + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // The ready service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let manager = Arc::clone(&self.manager);

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();

            if manager.is_passthrough(parts.uri.path()) {
                tracing::trace!(url = %parts.uri.path(), "Pass-through URL, no session");
                return inner.call(Request::from_parts(parts, body)).await;
            }

            let cookies = {
                let mut session = AxumSessionRequest::new(&mut parts);
                manager.get_session(&mut session).await;
                manager.get_temp_session(&mut session).await;
                manager.log_session(&mut session);
                session.into_pending_cookies()
            };

            let mut response = inner.call(Request::from_parts(parts, body)).await?;
            append_set_cookies(response.headers_mut(), &cookies);
            Ok(response)
        })
    }
}

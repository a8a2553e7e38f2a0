//! Axum integration for Composable Rust sessions.
//!
//! This crate is the host adapter between axum and
//! [`composable_rust_session`]. The session core never sees an axum type;
//! it works against [`SessionRequest`](composable_rust_session::SessionRequest),
//! implemented here by [`AxumSessionRequest`] over the request parts.
//!
//! # Request Flow
//!
//! ```text
//! CorrelationIdLayer  ─► assign X-Correlation-ID, open http_request span
//!   SessionLayer      ─► get_session → get_temp_session → log_session
//!     handler         ─► CurrentSession / login / logout / checkout
//!   SessionLayer      ◄─ append Set-Cookie for a newly created session
//! ```
//!
//! # Example
//!
//! ```ignore
//! use composable_rust_session::{DefaultAuthenticator, SessionConfig, SessionManager};
//! use composable_rust_session_web::{session_router, SessionState};
//! use std::sync::Arc;
//!
//! let manager = Arc::new(SessionManager::connect(SessionConfig::from_env()?).await?);
//! let authenticator = Arc::new(DefaultAuthenticator::from_config(manager.config()));
//! let app = session_router(SessionState::new(manager, authenticator));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use adapter::{AttachedSession, AxumSessionRequest, SessionData, SessionOverride};
pub use error::AppError;
pub use extractors::{
    AuthenticatedSession, CORRELATION_ID_HEADER, ClientIp, CorrelationId, CurrentSession,
};
pub use middleware::{SessionLayer, correlation_id_layer};
pub use router::session_router;
pub use state::SessionState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

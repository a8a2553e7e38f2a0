//! Router builder for the session routes.

use crate::handlers;
use crate::middleware::{SessionLayer, correlation_id_layer};
use crate::state::SessionState;
use axum::{
    Router,
    routing::{get, post},
};
use composable_rust_session::{Authenticator, SessionStore};
use std::sync::Arc;

/// Build the session router.
///
/// # Routes
///
/// | Method | Path | Handler |
/// |---|---|---|
/// | `GET` | `/1.0/CheckSession` | [`handlers::check_session`] |
/// | `GET` | `/1.0/Deauthenticate` | [`handlers::deauthenticate`] |
/// | `GET` | `/1.0/CheckoutSessionToken` | [`handlers::checkout_session_token`] |
/// | `POST` | `/1.0/Authenticate` | [`handlers::authenticate`] |
///
/// Every route runs behind [`SessionLayer`] and the correlation-id layer.
/// Merge application routes in before calling this, or wrap them in their
/// own [`SessionLayer`] sharing the same manager.
pub fn session_router<S, A>(state: SessionState<S, A>) -> Router
where
    S: SessionStore + 'static,
    A: Authenticator + 'static,
{
    let session_layer = SessionLayer::new(Arc::clone(&state.manager));

    Router::new()
        .route("/1.0/CheckSession", get(handlers::check_session))
        .route("/1.0/Deauthenticate", get(handlers::deauthenticate::<S, A>))
        .route(
            "/1.0/CheckoutSessionToken",
            get(handlers::checkout_session_token::<S, A>),
        )
        .route("/1.0/Authenticate", post(handlers::authenticate::<S, A>))
        .with_state(state)
        .layer(session_layer)
        .layer(correlation_id_layer())
}

//! Session route handlers.
//!
//! These run behind [`SessionLayer`](crate::SessionLayer), so the request
//! already carries its session when they are called.

use crate::adapter::{AxumSessionRequest, append_set_cookies};
use crate::error::AppError;
use crate::extractors::CurrentSession;
use crate::state::SessionState;
use axum::{
    Json,
    body::Bytes,
    extract::{Request, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use composable_rust_session::{
    Authenticator, Credentials, SessionCookie, SessionRecord, SessionStore,
};
use serde::Serialize;

/// Largest login body accepted.
const MAX_CREDENTIALS_BYTES: usize = 16 * 1024;

/// Identity check response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CheckSessionResponse {
    /// The logged-in session record.
    Session(SessionRecord),
    /// Not logged in.
    Anonymous(AnonymousIdentity),
}

/// Body returned by the identity check when not logged in.
#[derive(Debug, Default, Serialize)]
pub struct AnonymousIdentity {
    #[serde(rename = "IDUser")]
    id_user: i64,
    #[serde(rename = "UserID")]
    user_id: i64,
    #[serde(rename = "LoggedIn")]
    logged_in: bool,
}

/// Deauthenticate response.
#[derive(Debug, Serialize)]
pub struct DeauthenticateResponse {
    /// Always `true`.
    #[serde(rename = "Success")]
    pub success: bool,
}

/// Temp token checkout response.
///
/// Both forms are sent with status 200.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CheckoutResponse {
    /// Token issued.
    Issued {
        /// The temp session token.
        #[serde(rename = "Token")]
        token: String,
    },
    /// Checkout refused or failed.
    Failed {
        /// Why.
        #[serde(rename = "Error")]
        error: String,
    },
}

/// `GET /1.0/CheckSession`
///
/// The full record when logged in with a real user id, otherwise
/// `{IDUser: 0, UserID: 0, LoggedIn: false}`.
pub async fn check_session(CurrentSession(session): CurrentSession) -> Json<CheckSessionResponse> {
    if session.is_authenticated() {
        Json(CheckSessionResponse::Session(session))
    } else {
        Json(CheckSessionResponse::Anonymous(AnonymousIdentity::default()))
    }
}

/// `GET /1.0/Deauthenticate`
pub async fn deauthenticate<S, A>(State(state): State<SessionState<S, A>>, request: Request) -> Response
where
    S: SessionStore,
    A: Authenticator,
{
    let (mut parts, _body) = request.into_parts();
    let mut session = AxumSessionRequest::new(&mut parts);

    state.manager.deauthenticate_user(&mut session).await;

    with_cookies(
        Json(DeauthenticateResponse { success: true }),
        &session.into_pending_cookies(),
    )
}

/// `GET /1.0/CheckoutSessionToken`
pub async fn checkout_session_token<S, A>(
    State(state): State<SessionState<S, A>>,
    request: Request,
) -> Json<CheckoutResponse>
where
    S: SessionStore,
    A: Authenticator,
{
    let (mut parts, _body) = request.into_parts();
    let session = AxumSessionRequest::new(&mut parts);

    match state.manager.checkout_session_token(&session).await {
        Ok(token) => Json(CheckoutResponse::Issued { token }),
        Err(e) => Json(CheckoutResponse::Failed {
            error: e.to_string(),
        }),
    }
}

/// `POST /1.0/Authenticate`
///
/// Accepts `{"username": .., "password": ..}` as JSON or as a url-encoded
/// form. Responds with the session record, or 401 on failure.
pub async fn authenticate<S, A>(State(state): State<SessionState<S, A>>, request: Request) -> Response
where
    S: SessionStore,
    A: Authenticator,
{
    let (mut parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CREDENTIALS_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return AppError::bad_request(format!("Unreadable request body: {e}")).into_response(),
    };
    let is_form = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    let credentials = match parse_credentials(&bytes, is_form) {
        Ok(credentials) => credentials,
        Err(e) => return e.into_response(),
    };

    let mut session = AxumSessionRequest::new(&mut parts);
    let result = state
        .manager
        .authenticate_user(&mut session, &credentials, &*state.authenticator)
        .await;
    let cookies = session.into_pending_cookies();

    match result {
        Ok(packet) => with_cookies(Json(packet), &cookies),
        Err(e) => with_cookies(AppError::from(e), &cookies),
    }
}

fn parse_credentials(bytes: &Bytes, is_form: bool) -> Result<Credentials, AppError> {
    if bytes.is_empty() {
        return Ok(Credentials::default());
    }
    if is_form {
        serde_urlencoded::from_bytes(bytes)
            .map_err(|e| AppError::bad_request(format!("Malformed form body: {e}")))
    } else {
        serde_json::from_slice(bytes)
            .map_err(|e| AppError::bad_request(format!("Malformed JSON body: {e}")))
    }
}

fn with_cookies(response: impl IntoResponse, cookies: &[SessionCookie]) -> Response {
    let mut response = response.into_response();
    append_set_cookies(response.headers_mut(), cookies);
    response
}

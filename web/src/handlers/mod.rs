//! HTTP request handlers.

pub mod session;

pub use session::{authenticate, check_session, checkout_session_token, deauthenticate};

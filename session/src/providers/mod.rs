//! Session providers.
//!
//! Traits for every external dependency of the session manager. These
//! enable dependency injection and keep the lifecycle logic testable.
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │ SessionRequest   │     │ Authenticator    │
//! │ (host adapter)   │     │ (credential chk) │
//! └────────┬─────────┘     └────────┬─────────┘
//!          │                         │
//!          ▼                         ▼
//! ┌─────────────────────────────────────────┐
//! │ SessionManager                          │
//! └────────────────────┬────────────────────┘
//!                      ▼
//!            ┌──────────────────┐
//!            │ SessionStore     │  Redis / in-process
//!            └──────────────────┘
//! ```

pub mod authenticator;
pub mod clock;
pub mod request;
pub mod session;

pub use authenticator::{Authenticator, AuthenticatorFn, DefaultAuthenticator};
pub use clock::{Clock, SystemClock};
pub use request::{SessionCookie, SessionRequest};
pub use session::SessionStore;

//! Mock provider implementations for testing.
//!
//! This module provides simple, in-memory implementations of all provider traits
//! for use in unit and integration tests.

pub mod authenticator;
pub mod clock;
pub mod request;
pub mod session;

pub use authenticator::StaticAuthenticator;
pub use clock::MockClock;
pub use request::MockRequest;
pub use session::{MockSessionStore, StoreOp};

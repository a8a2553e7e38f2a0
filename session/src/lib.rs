//! # Composable Rust Sessions
//!
//! Cookie/bearer session lifecycle with pluggable stores.
//!
//! ## Features
//!
//! - **Identity resolution**: bearer header, session cookie, or the session
//!   already attached to the request
//! - **Self-healing**: a dangling or unreadable session id silently yields a
//!   fresh anonymous session
//! - **Delegation**: temp tokens let a second client import a logged-in
//!   identity into its own session row
//! - **Pluggable stores**: networked (Redis) or in-process with lazy pruning
//! - **Testable**: every collaborator is a trait with an in-memory mock
//!
//! ## Architecture
//!
//! ```text
//! host adapter ─► SessionManager ─► SessionStore
//!                      │
//!                      └─► Authenticator (injected)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use composable_rust_session::{SessionConfig, SessionManager, SessionStrategy};
//! use composable_rust_session::mocks::MockRequest;
//!
//! # async fn example() -> composable_rust_session::Result<()> {
//! let config = SessionConfig::new(3600).with_strategy(SessionStrategy::InMemory);
//! let manager = SessionManager::connect(config).await?;
//!
//! let mut request = MockRequest::new("/1.0/CheckSession");
//! manager.get_session(&mut request).await;
//! assert!(!manager.check_if_logged_in(&request));
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod error;
pub mod manager;
pub mod providers;
pub mod state;
pub mod stores;

// Mock implementations for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use config::{SessionConfig, SessionStrategy, StoreKind};
pub use error::{Result, SessionError, StoreError, StoreResult};
pub use manager::SessionManager;
pub use providers::{Authenticator, DefaultAuthenticator, SessionCookie, SessionRequest, SessionStore};
pub use state::{Credentials, SessionId, SessionRecord, UserRecord};
pub use stores::{InMemorySessionStore, RedisSessionStore, SessionBackend};

//! Session configuration.
//!
//! Settings objects use the option names of the legacy deployment
//! (`SessionCookieName`, `SessionTimeout`, `SessionStrategy`, ...), so a
//! JSON settings file deserializes straight into [`SessionConfig`].
//! `SessionTimeout` has no default and must be supplied.

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "UserSession";

/// Default temp token lifetime, in minutes.
pub const DEFAULT_TEMP_TOKEN_TIMEOUT_MINUTES: u64 = 60;

/// Default in-memory prune threshold (mutating operations between sweeps).
pub const DEFAULT_PRUNE_OPS: u32 = 100;

/// Default networked store URL.
pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379";

/// Default marker of the internal multi-tenant domain.
pub const DEFAULT_INTERNAL_DOMAIN: &str = "paviasystems";

/// URLs exempt from session resolution and request logging by default.
pub const DEFAULT_PASSTHROUGH_URLS: [&str; 2] = ["/ping.html", "/version"];

/// Which backend holds session state.
///
/// Unknown strategy names fall back to [`SessionStrategy::Memcached`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum SessionStrategy {
    /// Networked cache shared by every instance.
    #[default]
    Memcached,
    /// Process-local map; state is lost on restart.
    InMemory,
}

impl From<String> for SessionStrategy {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<&str> for SessionStrategy {
    fn from(value: &str) -> Self {
        match value {
            "InMemory" => Self::InMemory,
            _ => Self::Memcached,
        }
    }
}

/// Backend selection resolved from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    /// Networked cache reachable at `url`.
    Networked {
        /// Connection URL.
        url: String,
    },
    /// In-process map pruned every `prune_ops` writes.
    InProcess {
        /// Writes between prune sweeps.
        prune_ops: u32,
    },
}

/// Session manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub session_cookie_name: String,

    /// Session lifetime in seconds. Required.
    pub session_timeout: u64,

    /// Temp token lifetime in minutes.
    #[serde(default = "default_temp_token_timeout")]
    pub session_temp_token_timeout: u64,

    /// Backend selection.
    #[serde(default)]
    pub session_strategy: SessionStrategy,

    /// Networked store connection URL.
    #[serde(rename = "MemcachedURL", alias = "StoreURL", default = "default_store_url")]
    pub store_url: String,

    /// Username accepted by the bundled authenticator.
    #[serde(default)]
    pub default_username: Option<String>,

    /// Password accepted by the bundled authenticator.
    #[serde(default)]
    pub default_password: Option<String>,

    /// Initial pass-through URL set.
    #[serde(rename = "PassthroughURLs", default = "default_passthrough_urls")]
    pub passthrough_urls: Vec<String>,

    /// In-memory prune threshold.
    #[serde(default = "default_prune_ops")]
    pub prune_ops: u32,

    /// Optional deadline for every store call, in milliseconds.
    #[serde(default)]
    pub store_timeout_millis: Option<u64>,

    /// Marker of the internal multi-tenant domain (three-label cookie domains).
    #[serde(default = "default_internal_domain")]
    pub internal_domain: String,

    /// Version tag stamped into new packets.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

const fn default_temp_token_timeout() -> u64 {
    DEFAULT_TEMP_TOKEN_TIMEOUT_MINUTES
}

fn default_store_url() -> String {
    DEFAULT_STORE_URL.to_string()
}

fn default_passthrough_urls() -> Vec<String> {
    DEFAULT_PASSTHROUGH_URLS.iter().map(ToString::to_string).collect()
}

const fn default_prune_ops() -> u32 {
    DEFAULT_PRUNE_OPS
}

fn default_internal_domain() -> String {
    DEFAULT_INTERNAL_DOMAIN.to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl SessionConfig {
    /// Create a configuration with the given session lifetime and defaults
    /// for everything else.
    #[must_use]
    pub fn new(session_timeout_seconds: u64) -> Self {
        Self {
            session_cookie_name: default_cookie_name(),
            session_timeout: session_timeout_seconds,
            session_temp_token_timeout: DEFAULT_TEMP_TOKEN_TIMEOUT_MINUTES,
            session_strategy: SessionStrategy::default(),
            store_url: default_store_url(),
            default_username: None,
            default_password: None,
            passthrough_urls: default_passthrough_urls(),
            prune_ops: DEFAULT_PRUNE_OPS,
            store_timeout_millis: None,
            internal_domain: default_internal_domain(),
            version: default_version(),
        }
    }

    /// Set the session cookie name.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.session_cookie_name = name.into();
        self
    }

    /// Set the temp token lifetime in minutes.
    #[must_use]
    pub const fn with_temp_token_timeout(mut self, minutes: u64) -> Self {
        self.session_temp_token_timeout = minutes;
        self
    }

    /// Set the backend strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: SessionStrategy) -> Self {
        self.session_strategy = strategy;
        self
    }

    /// Set the networked store URL.
    #[must_use]
    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.store_url = url.into();
        self
    }

    /// Set the credentials accepted by the bundled authenticator.
    #[must_use]
    pub fn with_default_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.default_username = Some(username.into());
        self.default_password = Some(password.into());
        self
    }

    /// Replace the initial pass-through URL set.
    #[must_use]
    pub fn with_passthrough_urls<I, U>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        self.passthrough_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    /// Set the in-memory prune threshold.
    #[must_use]
    pub const fn with_prune_ops(mut self, ops: u32) -> Self {
        self.prune_ops = ops;
        self
    }

    /// Bound every store call by `timeout`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_millis = Some(timeout.as_millis() as u64);
        self
    }

    /// Set the internal multi-tenant domain marker.
    #[must_use]
    pub fn with_internal_domain(mut self, domain: impl Into<String>) -> Self {
        self.internal_domain = domain.into();
        self
    }

    /// Set the version tag.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Temp token lifetime in seconds.
    #[must_use]
    pub const fn temp_token_timeout_seconds(&self) -> u64 {
        self.session_temp_token_timeout.saturating_mul(60)
    }

    /// Per-call store deadline, if configured.
    #[must_use]
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_millis.map(Duration::from_millis)
    }

    /// Resolve the backend selection.
    #[must_use]
    pub fn store_kind(&self) -> StoreKind {
        match self.session_strategy {
            SessionStrategy::Memcached => StoreKind::Networked {
                url: self.store_url.clone(),
            },
            SessionStrategy::InMemory => StoreKind::InProcess {
                prune_ops: self.prune_ops,
            },
        }
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] if the session timeout is
    /// zero or the cookie name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.session_timeout == 0 {
            return Err(SessionError::Configuration(
                "SessionTimeout must be supplied and greater than zero".to_string(),
            ));
        }
        if self.session_cookie_name.trim().is_empty() {
            return Err(SessionError::Configuration(
                "SessionCookieName must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a JSON settings object.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] if the JSON is malformed,
    /// `SessionTimeout` is missing, or validation fails.
    pub fn from_json(settings: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(settings)
            .map_err(|e| SessionError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `SESSION_TIMEOUT` | required |
    /// | `SESSION_COOKIE_NAME` | `UserSession` |
    /// | `SESSION_TEMP_TOKEN_TIMEOUT` | `60` (minutes) |
    /// | `SESSION_STRATEGY` | `Memcached` |
    /// | `SESSION_STORE_URL` | `redis://127.0.0.1:6379` |
    /// | `SESSION_DEFAULT_USERNAME` / `SESSION_DEFAULT_PASSWORD` | unset |
    /// | `SESSION_PASSTHROUGH_URLS` | `/ping.html,/version` |
    /// | `SESSION_PRUNE_OPS` | `100` |
    /// | `SESSION_STORE_TIMEOUT_MS` | unset |
    /// | `SESSION_INTERNAL_DOMAIN` | `paviasystems` |
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] if `SESSION_TIMEOUT` is
    /// missing or not a positive integer.
    pub fn from_env() -> Result<Self> {
        let session_timeout = env::var("SESSION_TIMEOUT")
            .map_err(|_| SessionError::Configuration("SESSION_TIMEOUT is not set".to_string()))?
            .parse::<u64>()
            .map_err(|e| SessionError::Configuration(format!("SESSION_TIMEOUT: {e}")))?;

        let mut config = Self::new(session_timeout);

        if let Ok(name) = env::var("SESSION_COOKIE_NAME") {
            config.session_cookie_name = name;
        }
        if let Some(minutes) = env::var("SESSION_TEMP_TOKEN_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.session_temp_token_timeout = minutes;
        }
        if let Ok(strategy) = env::var("SESSION_STRATEGY") {
            config.session_strategy = SessionStrategy::from(strategy);
        }
        if let Ok(url) = env::var("SESSION_STORE_URL") {
            config.store_url = url;
        }
        config.default_username = env::var("SESSION_DEFAULT_USERNAME").ok();
        config.default_password = env::var("SESSION_DEFAULT_PASSWORD").ok();
        if let Ok(urls) = env::var("SESSION_PASSTHROUGH_URLS") {
            config.passthrough_urls = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(ops) = env::var("SESSION_PRUNE_OPS").ok().and_then(|s| s.parse().ok()) {
            config.prune_ops = ops;
        }
        config.store_timeout_millis = env::var("SESSION_STORE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok());
        if let Ok(domain) = env::var("SESSION_INTERNAL_DOMAIN") {
            config.internal_domain = domain;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::new(60)
            .with_cookie_name("Sess")
            .with_temp_token_timeout(5)
            .with_strategy(SessionStrategy::InMemory)
            .with_default_credentials("user", "test")
            .with_prune_ops(10)
            .with_store_timeout(Duration::from_millis(250))
            .with_version("9.9.9");

        assert_eq!(config.session_cookie_name, "Sess");
        assert_eq!(config.temp_token_timeout_seconds(), 300);
        assert_eq!(config.store_kind(), StoreKind::InProcess { prune_ops: 10 });
        assert_eq!(config.default_username.as_deref(), Some("user"));
        assert_eq!(config.store_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.version, "9.9.9");
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new(60);
        assert_eq!(config.session_cookie_name, "UserSession");
        assert_eq!(config.session_temp_token_timeout, 60);
        assert_eq!(config.session_strategy, SessionStrategy::Memcached);
        assert_eq!(config.passthrough_urls, vec!["/ping.html", "/version"]);
        assert_eq!(config.prune_ops, 100);
        assert!(config.store_timeout().is_none());
        assert_eq!(
            config.store_kind(),
            StoreKind::Networked {
                url: "redis://127.0.0.1:6379".to_string()
            }
        );
    }

    #[test]
    fn test_settings_object_uses_legacy_names() {
        let config = SessionConfig::from_json(
            r#"{
                "SessionCookieName": "UserSession",
                "SessionTimeout": 60,
                "SessionStrategy": "InMemory",
                "DefaultUsername": "user",
                "DefaultPassword": "test"
            }"#,
        )
        .unwrap();

        assert_eq!(config.session_timeout, 60);
        assert_eq!(config.session_strategy, SessionStrategy::InMemory);
        assert_eq!(config.default_password.as_deref(), Some("test"));
        assert_eq!(config.passthrough_urls.len(), 2);
    }

    #[test]
    fn test_session_timeout_is_required() {
        let result = SessionConfig::from_json(r#"{"SessionCookieName": "UserSession"}"#);
        assert!(matches!(result, Err(SessionError::Configuration(_))));

        let result = SessionConfig::from_json(r#"{"SessionTimeout": 0}"#);
        assert!(matches!(result, Err(SessionError::Configuration(_))));
    }

    #[test]
    fn test_unknown_strategy_falls_back_to_networked() {
        let config =
            SessionConfig::from_json(r#"{"SessionTimeout": 60, "SessionStrategy": "Bogus"}"#)
                .unwrap();
        assert_eq!(config.session_strategy, SessionStrategy::Memcached);
    }

    #[test]
    fn test_store_url_alias() {
        let config = SessionConfig::from_json(
            r#"{"SessionTimeout": 60, "StoreURL": "redis://cache:6379"}"#,
        )
        .unwrap();
        assert_eq!(config.store_url, "redis://cache:6379");
    }
}

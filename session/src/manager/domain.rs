//! Cookie domain policy.

use super::SessionManager;
use crate::providers::{SessionRequest, SessionStore};
use std::net::IpAddr;

/// User-agent marker of mobile webviews that must get host-only cookies.
pub const MOBILE_USER_AGENT_MARKER: &str = "iOS";

/// Wildcard cookie domain for `host`.
///
/// - mobile user agents get `None` (host-only cookie)
/// - hosts containing `internal_domain` with at least three labels keep
///   the last three (`a.app.internal.com` → `app.internal.com`)
/// - any other host with at least two labels keeps the last two
/// - everything else, including IP literals, gets `None`
///
/// ```
/// use composable_rust_session::manager::cookie_domain_for_host;
///
/// assert_eq!(
///     cookie_domain_for_host("a.headlight.paviasystems.com", None, "paviasystems").as_deref(),
///     Some("headlight.paviasystems.com")
/// );
/// assert_eq!(
///     cookie_domain_for_host("app.example.com", None, "paviasystems").as_deref(),
///     Some("example.com")
/// );
/// assert_eq!(cookie_domain_for_host("localhost", None, "paviasystems"), None);
/// ```
#[must_use]
pub fn cookie_domain_for_host(
    host: &str,
    user_agent: Option<&str>,
    internal_domain: &str,
) -> Option<String> {
    if user_agent.is_some_and(|ua| ua.contains(MOBILE_USER_AGENT_MARKER)) {
        return None;
    }
    if host.is_empty() || host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    let internal = !internal_domain.is_empty() && host.contains(internal_domain);
    let keep = if internal { 3 } else { 2 };

    if labels.len() < keep || labels[labels.len() - keep..].iter().any(|l| l.is_empty()) {
        return None;
    }
    Some(labels[labels.len() - keep..].join("."))
}

impl<S: SessionStore> SessionManager<S> {
    /// Public-facing host of the server, without scheme or port.
    ///
    /// Read from the `Origin` header when a reverse proxy supplies it,
    /// otherwise from `Host`.
    #[must_use]
    pub fn server_host_domain<R: SessionRequest + ?Sized>(&self, request: &R) -> Option<String> {
        let raw = match request.header("origin") {
            Some(origin) => origin
                .strip_prefix("https://")
                .or_else(|| origin.strip_prefix("http://"))
                .unwrap_or(origin),
            None => request.header("host")?,
        };

        let host = if raw.starts_with('[') {
            // IPv6 literal: keep the brackets, drop the port
            raw.split_inclusive(']').next().unwrap_or(raw)
        } else {
            raw.split([':', '/']).next().unwrap_or(raw)
        };

        if host.is_empty() { None } else { Some(host.to_string()) }
    }

    /// Cookie domain for a session cookie set on `request`.
    #[must_use]
    pub fn wildcard_cookie_domain<R: SessionRequest + ?Sized>(&self, request: &R) -> Option<String> {
        let host = self.server_host_domain(request)?;
        cookie_domain_for_host(
            &host,
            request.header("user-agent"),
            &self.config.internal_domain,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::mocks::{MockRequest, MockSessionStore};

    const INTERNAL: &str = "paviasystems";

    fn manager() -> SessionManager<MockSessionStore> {
        SessionManager::with_store(SessionConfig::new(60), MockSessionStore::new()).unwrap()
    }

    #[test]
    fn test_host_domain_prefers_origin() {
        let request = MockRequest::new("/")
            .with_header("Origin", "https://app.example.com:8443")
            .with_header("Host", "internal-lb:8080");
        assert_eq!(manager().server_host_domain(&request).as_deref(), Some("app.example.com"));
    }

    #[test]
    fn test_host_domain_falls_back_to_host() {
        let request = MockRequest::new("/").with_header("Host", "api.example.com:3000");
        assert_eq!(manager().server_host_domain(&request).as_deref(), Some("api.example.com"));

        assert_eq!(manager().server_host_domain(&MockRequest::new("/")), None);
    }

    #[test]
    fn test_internal_domain_keeps_three_labels() {
        assert_eq!(
            cookie_domain_for_host("x.headlight.paviasystems.com", None, INTERNAL).as_deref(),
            Some("headlight.paviasystems.com")
        );
        // Too short to scope below the internal apex
        assert_eq!(cookie_domain_for_host("paviasystems.com", None, INTERNAL), None);
    }

    #[test]
    fn test_other_domains_keep_two_labels() {
        assert_eq!(
            cookie_domain_for_host("a.b.idoteconstruction.com", None, INTERNAL).as_deref(),
            Some("idoteconstruction.com")
        );
        assert_eq!(
            cookie_domain_for_host("example.com", None, INTERNAL).as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn test_single_label_and_ip_hosts_get_no_domain() {
        assert_eq!(cookie_domain_for_host("localhost", None, INTERNAL), None);
        assert_eq!(cookie_domain_for_host("127.0.0.1", None, INTERNAL), None);
        assert_eq!(cookie_domain_for_host("[::1]", None, INTERNAL), None);
    }

    #[test]
    fn test_mobile_user_agent_suppresses_domain() {
        let ua = "Headlight/3.1 (iPhone; iOS 17.2; Scale/3.00)";
        assert_eq!(cookie_domain_for_host("app.example.com", Some(ua), INTERNAL), None);

        let request = MockRequest::new("/")
            .with_header("Host", "app.example.com")
            .with_header("User-Agent", ua);
        assert_eq!(manager().wildcard_cookie_domain(&request), None);
    }
}

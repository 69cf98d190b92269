//! The hostname currently being served.
//!
//! Purge requests name the domain to evict and the header probe needs a URL to
//! hit, both derived from the request context a web server hands to its
//! handlers: the `Host` header when present, otherwise the configured server
//! name, plus whether the request came in over HTTPS.

use std::env;

/// Raw request context, as exposed by CGI-style servers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Value of the `Host` request header (`HTTP_HOST`).
    pub http_host: Option<String>,
    /// Server's configured name (`SERVER_NAME`).
    pub server_name: Option<String>,
    /// `HTTPS` variable; any non-empty value other than `off` means TLS.
    pub https: Option<String>,
}

impl RequestContext {
    /// Reads `HTTP_HOST`, `SERVER_NAME` and `HTTPS` from the environment.
    pub fn from_env() -> Self {
        Self {
            http_host: env::var("HTTP_HOST").ok(),
            server_name: env::var("SERVER_NAME").ok(),
            https: env::var("HTTPS").ok(),
        }
    }

    /// The served host, or `None` when neither variable carries one.
    pub fn site_host(&self) -> Option<SiteHost> {
        let host = non_empty(self.http_host.as_deref())
            .or_else(|| non_empty(self.server_name.as_deref()))?;
        let https = self
            .https
            .as_deref()
            .map(str::trim)
            .is_some_and(|value| !value.is_empty() && !value.eq_ignore_ascii_case("off"));
        Some(SiteHost::new(host, https))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Hostname plus scheme of the site being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteHost {
    host: String,
    https: bool,
}

impl SiteHost {
    /// Accepts a bare host or a URL-ish value; any scheme prefix and trailing
    /// slashes are dropped so the sentinel payload is always a bare host.
    pub fn new(host: impl AsRef<str>, https: bool) -> Self {
        let raw = host.as_ref().trim();
        let without_scheme = raw
            .strip_prefix("https://")
            .or_else(|| raw.strip_prefix("http://"))
            .unwrap_or(raw);
        Self {
            host: without_scheme.trim_end_matches('/').to_string(),
            https,
        }
    }

    /// Host without scheme, e.g. `example.com`.
    pub fn bare(&self) -> &str {
        &self.host
    }

    pub fn is_https(&self) -> bool {
        self.https
    }

    /// Host with scheme, e.g. `https://example.com`.
    pub fn url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}", scheme, self.host)
    }
}

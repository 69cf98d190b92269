//! Header-only HTTP probe and the header classifier.
//!
//! The fast installation check fetches the site's own response headers and
//! looks for markers. Rules are evaluated in order and the first hit wins:
//! the product signature must come before the generic `nginx` token because
//! every accelerated site also says `server: nginx`.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::redirect::Policy;
use wsa_protocol::{InstallationStatus, PRODUCT_SIGNATURE};

use crate::error::{Result, WsaError};

/// Ordered `(needle, status)` rules; matching is case-sensitive.
pub const HEADER_RULES: &[(&str, InstallationStatus)] = &[
    (PRODUCT_SIGNATURE, InstallationStatus::Installed),
    ("nginx", InstallationStatus::MaybeNginx),
    ("cloudflare", InstallationStatus::MaybeCloudflare),
];

/// Default probe timeout. Unresponsive hosts would otherwise stall the caller.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maps raw header text to an installation status.
pub fn classify_headers(header_text: &str) -> InstallationStatus {
    HEADER_RULES
        .iter()
        .find(|(needle, _)| header_text.contains(needle))
        .map(|(_, status)| *status)
        .unwrap_or(InstallationStatus::NotInstalled)
}

/// Fetches response headers for a URL without downloading the body.
pub trait HeaderProbe {
    /// Returns the status line followed by one `name: value` line per header.
    fn fetch_headers(&self, url: &str) -> Result<String>;
}

/// Blocking HEAD request over reqwest. Redirects are not followed so the
/// headers inspected are the site's own.
#[derive(Debug, Clone)]
pub struct HttpHeaderProbe {
    client: Client,
}

impl HttpHeaderProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .user_agent(concat!("wsa-purge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| WsaError::Probe {
                url: String::new(),
                details: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self { client })
    }
}

impl HeaderProbe for HttpHeaderProbe {
    fn fetch_headers(&self, url: &str) -> Result<String> {
        let response = self.client.head(url).send().map_err(|err| WsaError::Probe {
            url: url.to_string(),
            details: err.to_string(),
        })?;
        Ok(render_headers(&response))
    }
}

fn render_headers(response: &Response) -> String {
    let status = response.status();
    let mut text = format!(
        "{:?} {} {}\r\n",
        response.version(),
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    for (name, value) in response.headers() {
        text.push_str(name.as_str());
        text.push_str(": ");
        text.push_str(&String::from_utf8_lossy(value.as_bytes()));
        text.push_str("\r\n");
    }
    text
}

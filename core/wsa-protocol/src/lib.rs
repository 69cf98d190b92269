//! Contract between cache-purge clients and the WSA cache daemon.
//!
//! The daemon watches a `.wsa` directory in the hosting account and evicts
//! cached pages whenever an `empty.me` file shows up there. Clients and the
//! daemon never talk directly; this crate pins the names and payloads both
//! sides rely on so they cannot drift.
//!
//! ```text
//! /home/<account>/.wsa/
//! └── empty.me     # "example.com" or "Purge all my cache please!!!"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directory the daemon watches, relative to the hosting account root.
pub const SIGNAL_DIR_NAME: &str = ".wsa";

/// Sentinel file whose presence means "purge pending".
pub const SENTINEL_FILE_NAME: &str = "empty.me";

/// Sentinel payload that evicts every cached domain of the account.
///
/// Any payload that is not one of the account's domains has the same effect;
/// this literal is the one clients have always sent.
pub const PURGE_ALL_MARKER: &str = "Purge all my cache please!!!";

/// Signature the accelerator adds to the response headers of sites it serves.
pub const PRODUCT_SIGNATURE: &str = "Nginx for WHM/cPanel by Astral Internet";

/// Maximum number of directory levels walked upward while looking for
/// [`SIGNAL_DIR_NAME`].
pub const MAX_BACKTRACE: usize = 5;

/// Permission bits for a freshly created signal directory.
pub const SIGNAL_DIR_MODE: u32 = 0o750;

/// Outcome of probing whether the accelerator fronts the current site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStatus {
    #[default]
    NotInstalled,
    Installed,
    /// Served by nginx without the product signature; the accelerator may
    /// still be active.
    MaybeNginx,
    /// Behind Cloudflare's proxy, which hides the origin headers.
    MaybeCloudflare,
}

impl InstallationStatus {
    /// Numeric code used by earlier clients (0 not installed, 1 installed,
    /// 2 maybe behind nginx, 3 maybe behind Cloudflare).
    pub fn legacy_code(self) -> u8 {
        match self {
            InstallationStatus::NotInstalled => 0,
            InstallationStatus::Installed => 1,
            InstallationStatus::MaybeNginx => 2,
            InstallationStatus::MaybeCloudflare => 3,
        }
    }

    pub fn from_legacy_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(InstallationStatus::NotInstalled),
            1 => Some(InstallationStatus::Installed),
            2 => Some(InstallationStatus::MaybeNginx),
            3 => Some(InstallationStatus::MaybeCloudflare),
            _ => None,
        }
    }

    pub fn is_installed(self) -> bool {
        self == InstallationStatus::Installed
    }

    /// True for the two "could be installed" outcomes.
    pub fn is_uncertain(self) -> bool {
        matches!(
            self,
            InstallationStatus::MaybeNginx | InstallationStatus::MaybeCloudflare
        )
    }
}

impl fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallationStatus::NotInstalled => "not_installed",
            InstallationStatus::Installed => "installed",
            InstallationStatus::MaybeNginx => "maybe_nginx",
            InstallationStatus::MaybeCloudflare => "maybe_cloudflare",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_codes_are_stable() {
        for status in [
            InstallationStatus::NotInstalled,
            InstallationStatus::Installed,
            InstallationStatus::MaybeNginx,
            InstallationStatus::MaybeCloudflare,
        ] {
            assert_eq!(
                InstallationStatus::from_legacy_code(status.legacy_code()),
                Some(status)
            );
        }
        assert_eq!(InstallationStatus::Installed.legacy_code(), 1);
        assert_eq!(InstallationStatus::from_legacy_code(9), None);
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&InstallationStatus::MaybeCloudflare).unwrap();
        assert_eq!(json, r#""maybe_cloudflare""#);
        assert_eq!(InstallationStatus::MaybeNginx.to_string(), "maybe_nginx");
    }

    #[test]
    fn only_nginx_and_cloudflare_are_uncertain() {
        assert!(InstallationStatus::MaybeNginx.is_uncertain());
        assert!(InstallationStatus::MaybeCloudflare.is_uncertain());
        assert!(!InstallationStatus::Installed.is_uncertain());
        assert!(!InstallationStatus::NotInstalled.is_uncertain());
    }
}

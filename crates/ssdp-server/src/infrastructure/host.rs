//! Discovery of the process-wide values every SSDP message carries.
//!
//! Run once at startup to build the [`ProcessEnvironment`]:
//!
//! - **boot id**: epoch seconds now;
//! - **server string**: `<OS name>/<OS release> UPnP/1.1 <product>`, with the
//!   OS parts taken from `os_info`;
//! - **host address**: the address put into `LOCATION` URLs.
//!
//! # Host address resolution
//!
//! The host's own name is resolved and a non-loopback IPv4 address is
//! preferred.  Many hosts map their bare name to `127.0.1.1` in `/etc/hosts`;
//! when that happens and the name has no dot, the fully-qualified form
//! `<name>.` is tried as well.  Failures are never fatal: the best address
//! found so far is kept, and `127.0.0.1` is used if nothing resolves.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::time::{SystemTime, UNIX_EPOCH};

use ssdp_core::domain::process::server_string;
use ssdp_core::ProcessEnvironment;
use tracing::{debug, info};

/// Epoch seconds at the time of the call.
pub fn boot_id() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Operating system name and release for the `SERVER` header, from `os_info`.
pub fn os_identity() -> (String, String) {
    let info = os_info::get();
    os_identity_of(info.os_type(), info.version())
}

/// `("Macos", "14.2.1")` style pair; the release is `"unknown"` when the
/// platform does not report one.
fn os_identity_of(os_type: os_info::Type, version: &os_info::Version) -> (String, String) {
    let name = format!("{os_type:?}");
    let release = match version {
        os_info::Version::Unknown => "unknown".to_string(),
        known => known.to_string(),
    };
    (name, release)
}

/// Resolves the address advertised in `LOCATION` URLs from the host name.
pub fn resolve_host_address() -> IpAddr {
    let name = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok());
    let address = choose_host_address(name.as_deref(), resolve_ipv4);
    debug!(hostname = ?name, %address, "host address resolved");
    address
}

/// The resolution policy, with the lookup injected.
///
/// `resolve` returns the preferred address for a name, or `None` on failure.
pub fn choose_host_address<F>(hostname: Option<&str>, resolve: F) -> IpAddr
where
    F: Fn(&str) -> Option<IpAddr>,
{
    let mut best = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let Some(name) = hostname.filter(|n| !n.is_empty()) else {
        return best;
    };

    if let Some(address) = resolve(name) {
        best = address;
    }
    if best.is_loopback() && !name.contains('.') {
        if let Some(address) = resolve(&format!("{name}.")) {
            best = address;
        }
    }
    best
}

/// Looks up `name`, preferring a non-loopback IPv4 address over a loopback one.
fn resolve_ipv4(name: &str) -> Option<IpAddr> {
    let addrs: Vec<IpAddr> = (name, 0)
        .to_socket_addrs()
        .ok()?
        .map(|sa| sa.ip())
        .filter(IpAddr::is_ipv4)
        .collect();
    addrs
        .iter()
        .find(|a| !a.is_loopback())
        .or_else(|| addrs.first())
        .copied()
}

/// Builds the process environment.  `host_override` skips resolution.
pub fn process_environment(product: &str, host_override: Option<IpAddr>) -> ProcessEnvironment {
    let (os_name, os_release) = os_identity();
    let server = server_string(&os_name, &os_release, product);
    let host_address = host_override.unwrap_or_else(resolve_host_address);
    let boot_id = boot_id();
    info!(boot_id, %server, %host_address, "process environment ready");
    ProcessEnvironment::new(boot_id, server, host_address)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lan() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))
    }

    fn debian_loopback() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 1, 1))
    }

    #[test]
    fn test_non_loopback_address_is_used_directly() {
        let address = choose_host_address(Some("media"), |_| Some(lan()));
        assert_eq!(address, lan());
    }

    #[test]
    fn test_loopback_bare_name_retries_with_trailing_dot() {
        // Arrange: /etc/hosts maps "media" to 127.0.1.1, DNS knows "media."
        let resolve = |name: &str| match name {
            "media" => Some(debian_loopback()),
            "media." => Some(lan()),
            _ => None,
        };

        // Act
        let address = choose_host_address(Some("media"), resolve);

        // Assert
        assert_eq!(address, lan());
    }

    #[test]
    fn test_failed_retry_keeps_first_result() {
        let resolve = |name: &str| (name == "media").then(debian_loopback);

        let address = choose_host_address(Some("media"), resolve);

        assert_eq!(address, debian_loopback());
    }

    #[test]
    fn test_dotted_name_is_not_retried() {
        let resolve = |name: &str| match name {
            "media.lan" => Some(debian_loopback()),
            _ => panic!("unexpected lookup of {name}"),
        };

        assert_eq!(choose_host_address(Some("media.lan"), resolve), debian_loopback());
    }

    #[test]
    fn test_unresolvable_name_falls_back_to_localhost() {
        let address = choose_host_address(Some("nowhere"), |_| None);
        assert_eq!(address, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_missing_hostname_falls_back_to_localhost() {
        assert_eq!(
            choose_host_address(None, |_| Some(lan())),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
        assert_eq!(
            choose_host_address(Some(""), |_| Some(lan())),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn test_os_identity_uses_type_and_semantic_version() {
        // Arrange
        let version = os_info::Version::Semantic(14, 2, 1);

        // Act
        let (name, release) = os_identity_of(os_info::Type::Macos, &version);

        // Assert
        assert_eq!(name, "Macos");
        assert_eq!(release, "14.2.1");
    }

    #[test]
    fn test_os_identity_reports_unknown_release() {
        let (name, release) = os_identity_of(os_info::Type::Windows, &os_info::Version::Unknown);

        assert_eq!(name, "Windows");
        assert_eq!(release, "unknown");
    }

    #[test]
    fn test_current_os_has_name_without_spaces() {
        let (name, release) = os_identity();

        assert!(!name.is_empty());
        assert!(!name.contains(' '));
        assert!(!release.is_empty());
    }

    #[test]
    fn test_override_skips_resolution() {
        let env = process_environment("ssdp-server/0.1.0", Some(lan()));

        assert_eq!(env.host_address, lan());
        assert!(env.server.ends_with(" UPnP/1.1 ssdp-server/0.1.0"));
        assert!(env.boot_id > 1_600_000_000);
    }
}

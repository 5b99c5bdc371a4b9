//! Values that are fixed for the lifetime of the process.
//!
//! The boot identifier, server string, and host address are computed once at
//! startup (see the server crate's `infrastructure::host` module) and then
//! only read.  Every outbound message starts from
//! [`ProcessEnvironment::message_environment`].

use std::net::IpAddr;

use crate::protocol::constants::UPNP_VERSION;
use crate::protocol::environment::{fields, MessageEnvironment};

/// Process-wide values shared read-only by every outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEnvironment {
    /// Epoch seconds at process start.  Changes only across a restart.
    pub boot_id: u64,
    /// `SERVER` header value, see [`server_string`].
    pub server: String,
    /// Address advertised in `LOCATION` URLs.
    pub host_address: IpAddr,
}

impl ProcessEnvironment {
    pub fn new(boot_id: u64, server: impl Into<String>, host_address: IpAddr) -> Self {
        Self {
            boot_id,
            server: server.into(),
            host_address,
        }
    }

    /// Returns a fresh environment holding the process-wide fields
    /// (`BOOTID`, `SERVER`).  Callers add the per-message fields.
    pub fn message_environment(&self) -> MessageEnvironment {
        MessageEnvironment::new()
            .with(fields::BOOTID, self.boot_id)
            .with(fields::SERVER, &self.server)
    }

    /// URL of a device's description document as served by the external
    /// web server.
    pub fn location(&self, web_server_port: u16, uuid: &str) -> String {
        format!(
            "http://{}:{}/{}/description.xml",
            self.host_address, web_server_port, uuid
        )
    }
}

/// Builds a `SERVER` header value: `<os>/<release> UPnP/1.1 <product>`.
///
/// # Examples
///
/// ```rust
/// use ssdp_core::domain::process::server_string;
///
/// assert_eq!(
///     server_string("Linux", "6.1.0", "ssdp-server/0.1.0"),
///     "Linux/6.1.0 UPnP/1.1 ssdp-server/0.1.0"
/// );
/// ```
pub fn server_string(os_name: &str, os_release: &str, product: &str) -> String {
    format!("{os_name}/{os_release} {UPNP_VERSION} {product}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

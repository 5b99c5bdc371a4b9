//! QueryResponder: turns inbound `M-SEARCH` datagrams into registry queries.
//!
//! The responder itself sends nothing.  It recognises a search, asks the
//! [`DeviceRegistry`] once for the devices that match, and returns them; the
//! dispatch loop then answers each match through the announcer.

use std::net::SocketAddr;
use std::sync::Arc;

use ssdp_core::{parse_search, Device, DeviceFilter};
use tracing::debug;

/// Source of the devices a search is answered with.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceRegistry: Send + Sync {
    /// Returns every device accepted by `filter`.  `inquirer` is the address
    /// the search came from, for registries that answer per network.
    fn query(&self, filter: DeviceFilter, inquirer: SocketAddr) -> Vec<Device>;
}

/// Recognises discovery queries and resolves them against a registry.
pub struct QueryResponder {
    registry: Arc<dyn DeviceRegistry>,
}

impl QueryResponder {
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Handles one inbound datagram.
    ///
    /// Returns the devices that must be answered, in registry order.  A
    /// datagram that is not a usable `M-SEARCH` yields no devices and causes
    /// no registry query.
    pub fn on_datagram(&self, source: SocketAddr, payload: &[u8]) -> Vec<Device> {
        let request = match parse_search(payload) {
            Ok(request) => request,
            Err(reason) => {
                debug!(%source, len = payload.len(), "datagram ignored: {reason}");
                return Vec::new();
            }
        };

        let matches = self.registry.query(request.filter, source);
        debug!(
            %source,
            st = %request.search_target,
            matches = matches.len(),
            "search received"
        );
        matches
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

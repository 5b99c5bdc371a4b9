//! A fixed device list loaded from the configuration file.

use std::net::SocketAddr;

use ssdp_core::{Device, DeviceFilter};

use crate::application::query_responder::DeviceRegistry;

/// Answers searches from a list that does not change while the process runs.
#[derive(Debug, Clone, Default)]
pub struct StaticDeviceRegistry {
    devices: Vec<Device>,
}

impl StaticDeviceRegistry {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }
}

impl DeviceRegistry for StaticDeviceRegistry {
    fn query(&self, filter: DeviceFilter, _inquirer: SocketAddr) -> Vec<Device> {
        self.devices
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! The UPnP device being advertised.
//!
//! A [`Device`] is owned by the device registry; the announcer only keeps a
//! clone for as long as its renewal timer is alive.  None of the fields change
//! while a device is advertised: a changed description produces a new
//! `config_id`, and therefore a new `Device` value.

use crate::protocol::constants::SSDP_SCHEMAS;

/// A device advertised over SSDP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Globally unique identifier, without the `uuid:` prefix.
    pub uuid: String,
    /// Device type and version, e.g. `"MediaRenderer:1"`.
    pub type_ver: String,
    /// Changes whenever the device description document changes.
    pub config_id: u32,
    /// `true` for a device that is not embedded within another device.
    pub root_device: bool,
    /// Devices embedded in this one's description document.
    pub embedded: Vec<EmbeddedDevice>,
}

/// A device embedded in a root device's description.
///
/// Embedded devices share their root's description document (and therefore
/// its `LOCATION` and `CONFIGID`), but announce their own uuid and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedDevice {
    pub uuid: String,
    pub type_ver: String,
}

impl Device {
    /// Creates a root device with no embedded devices.
    pub fn new(uuid: impl Into<String>, type_ver: impl Into<String>, config_id: u32) -> Self {
        Self {
            uuid: uuid.into(),
            type_ver: type_ver.into(),
            config_id,
            root_device: true,
            embedded: Vec::new(),
        }
    }

    /// Marks this device as embedded (not a root device).
    #[must_use]
    pub fn non_root(mut self) -> Self {
        self.root_device = false;
        self
    }

    /// Appends an embedded device.
    #[must_use]
    pub fn with_embedded(mut self, uuid: impl Into<String>, type_ver: impl Into<String>) -> Self {
        self.embedded.push(EmbeddedDevice {
            uuid: uuid.into(),
            type_ver: type_ver.into(),
        });
        self
    }

    /// The `NT` value announcing this device's type.
    pub fn device_type_urn(&self) -> String {
        device_type_urn(&self.type_ver)
    }
}

impl EmbeddedDevice {
    /// The `NT` value announcing this embedded device's type.
    pub fn device_type_urn(&self) -> String {
        device_type_urn(&self.type_ver)
    }
}

fn device_type_urn(type_ver: &str) -> String {
    format!("{SSDP_SCHEMAS}:device:{type_ver}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

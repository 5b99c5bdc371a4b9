//! Search targets and the device filters they resolve to.
//!
//! An `M-SEARCH` carries an `ST:` (search target) header naming what the
//! control point is looking for: `ssdp:all`, `upnp:rootdevice`, a specific
//! `uuid:...`, or a device/service type URN.  Only the root-device target is
//! distinguished at the moment; every other target matches all devices and
//! the registry's answers are filtered no further.

use crate::domain::device::Device;
use crate::protocol::constants::ROOT_DEVICE_NT;

/// A predicate over [`Device`] derived from a search target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Accepts every device.
    All,
    /// Accepts only devices with the root-device flag set.
    RootDevices,
}

impl DeviceFilter {
    /// Resolves an `ST:` header value to a filter.
    pub fn from_search_target(search_target: &str) -> Self {
        if search_target == ROOT_DEVICE_NT {
            DeviceFilter::RootDevices
        } else {
            DeviceFilter::All
        }
    }

    /// Returns `true` if `device` satisfies this filter.
    pub fn matches(&self, device: &Device) -> bool {
        match self {
            DeviceFilter::All => true,
            DeviceFilter::RootDevices => device.root_device,
        }
    }
}

/// A recognised `M-SEARCH` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// The trimmed value of the first `ST:` header.
    pub search_target: String,
    /// The filter `search_target` resolves to.
    pub filter: DeviceFilter,
}

impl SearchRequest {
    pub fn new(search_target: impl Into<String>) -> Self {
        let search_target = search_target.into();
        let filter = DeviceFilter::from_search_target(&search_target);
        Self {
            search_target,
            filter,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rootdevice_target_resolves_to_root_filter() {
        assert_eq!(
            DeviceFilter::from_search_target("upnp:rootdevice"),
            DeviceFilter::RootDevices
        );
    }

    #[test]
    fn test_ssdp_all_resolves_to_match_all() {
        assert_eq!(DeviceFilter::from_search_target("ssdp:all"), DeviceFilter::All);
    }

    #[test]
    fn test_device_type_target_currently_matches_all() {
        // Arrange
        let filter =
            DeviceFilter::from_search_target("urn:schemas-upnp-org:device:MediaRenderer:1");
        let unrelated = Device::new("1", "Printer:1", 0).non_root();

        // Act / Assert
        assert_eq!(filter, DeviceFilter::All);
        assert!(filter.matches(&unrelated));
    }

    #[test]
    fn test_root_filter_rejects_non_root_devices() {
        // Arrange
        let root = Device::new("1", "MediaRenderer:1", 0);
        let embedded = Device::new("2", "MediaRenderer:1", 0).non_root();

        // Act / Assert
        assert!(DeviceFilter::RootDevices.matches(&root));
        assert!(!DeviceFilter::RootDevices.matches(&embedded));
    }

    #[test]
    fn test_search_target_match_is_case_sensitive() {
        assert_eq!(
            DeviceFilter::from_search_target("UPNP:ROOTDEVICE"),
            DeviceFilter::All
        );
    }

    #[test]
    fn test_search_request_new_derives_filter() {
        let request = SearchRequest::new("upnp:rootdevice");
        assert_eq!(request.search_target, "upnp:rootdevice");
        assert_eq!(request.filter, DeviceFilter::RootDevices);
    }
}

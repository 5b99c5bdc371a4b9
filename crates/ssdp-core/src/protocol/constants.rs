//! SSDP wire constants.

use std::net::Ipv4Addr;
use std::time::Duration;

/// The well-known SSDP multicast group.
pub const SSDP_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// The well-known SSDP port.
pub const SSDP_PORT: u16 = 1900;

/// Multicast time-to-live: SSDP traffic should not leave the local network.
pub const MULTICAST_TTL: u32 = 2;

/// Schema prefix for standard UPnP device and service types.
pub const SSDP_SCHEMAS: &str = "urn:schemas-upnp-org";

/// Protocol token used in the `SERVER` header.
pub const UPNP_VERSION: &str = "UPnP/1.1";

/// Notification type announcing a root device.
pub const ROOT_DEVICE_NT: &str = "upnp:rootdevice";

/// Request-line prefix identifying a discovery query.
pub const M_SEARCH_PREFIX: &str = "M-SEARCH ";

/// Default cache lifetime (`max-age`) in seconds.
pub const DEFAULT_MAX_AGE: u32 = 1800;

/// Interval between the rapid retransmissions following a first announcement.
pub const BURST_INTERVAL: Duration = Duration::from_millis(250);

/// Number of rapid retransmissions before switching to the renewal interval.
pub const BURST_RETRIES: u8 = 3;

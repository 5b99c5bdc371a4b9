//! Which (NT, USN) pairs a device is announced under.
//!
//! UPnP announces one device as several separate datagrams so that control
//! points searching by any of its identities see it:
//!
//! ```text
//! root only   NT: upnp:rootdevice                       USN: uuid:<id>::upnp:rootdevice
//! always      NT: uuid:<id>                             USN: uuid:<id>
//! always      NT: urn:schemas-upnp-org:device:<type>    USN: uuid:<id>::<NT>
//! ```
//!
//! Embedded devices follow their root with their own uuid and type pairs.
//! The same set is used for `ssdp:alive`, `ssdp:byebye`, and search
//! responses; only the template differs ([`MessageKind`]).

use crate::domain::device::Device;
use crate::protocol::constants::ROOT_DEVICE_NT;

/// The three kinds of outbound message, each rendered from its own template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// `NOTIFY` with `NTS: ssdp:alive`.
    Available,
    /// `NOTIFY` with `NTS: ssdp:byebye`.
    Unavailable,
    /// `HTTP/1.1 200 OK` answer to an `M-SEARCH`.
    Response,
}

impl MessageKind {
    /// Name of the template this kind is rendered from.
    pub fn template_name(self) -> &'static str {
        match self {
            MessageKind::Available => "notify-available",
            MessageKind::Unavailable => "notify-unavailable",
            MessageKind::Response => "notify-response",
        }
    }
}

/// One (NT, USN) pair; rendered into exactly one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub notification_type: String,
    pub unique_service_name: String,
}

impl Notification {
    fn new(notification_type: String, unique_service_name: String) -> Self {
        Self {
            notification_type,
            unique_service_name,
        }
    }
}

/// Returns the notifications announcing `device`, in sending order.
///
/// # Examples
///
/// ```rust
/// use ssdp_core::{notification_set, Device};
///
/// let root = Device::new("1234", "MediaRenderer:1", 1);
/// assert_eq!(notification_set(&root).len(), 3);
///
/// let embedded = Device::new("5678", "MediaRenderer:1", 1).non_root();
/// assert_eq!(notification_set(&embedded).len(), 2);
/// ```
pub fn notification_set(device: &Device) -> Vec<Notification> {
    let uuid_nt = format!("uuid:{}", device.uuid);
    let mut set = Vec::with_capacity(3 + 2 * device.embedded.len());

    if device.root_device {
        set.push(Notification::new(
            ROOT_DEVICE_NT.to_string(),
            format!("{uuid_nt}::{ROOT_DEVICE_NT}"),
        ));
    }
    set.push(Notification::new(uuid_nt.clone(), uuid_nt.clone()));

    let type_nt = device.device_type_urn();
    let type_usn = format!("{uuid_nt}::{type_nt}");
    set.push(Notification::new(type_nt, type_usn));

    for embedded in &device.embedded {
        let uuid_nt = format!("uuid:{}", embedded.uuid);
        set.push(Notification::new(uuid_nt.clone(), uuid_nt.clone()));
        let type_nt = embedded.device_type_urn();
        let type_usn = format!("{uuid_nt}::{type_nt}");
        set.push(Notification::new(type_nt, type_usn));
    }

    set
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! # ssdp-core
//!
//! Shared library for the SSDP announcer containing the message renderer,
//! the M-SEARCH parser, and the device domain types.
//!
//! This crate has zero dependencies on OS APIs or network sockets.  Everything
//! here is a pure function of its inputs (the template cache being the one
//! piece of interior state), so it can be unit-tested without a network.
//!
//! # Architecture overview (for beginners)
//!
//! SSDP (Simple Service Discovery Protocol) is how UPnP devices find each other
//! on a local network.  A device periodically multicasts `NOTIFY` messages
//! saying "I am here, my description lives at this URL", multicasts a final
//! `NOTIFY ... ssdp:byebye` when it leaves, and answers `M-SEARCH` queries from
//! control points that want to know what is on the network.
//!
//! - **`domain`** – The things being announced: [`Device`], the
//!   [`DeviceFilter`] derived from a search target, and the
//!   [`ProcessEnvironment`] values that stay constant for the process lifetime.
//!
//! - **`protocol`** – How those things look on the wire.  Messages are
//!   rendered from named templates ([`TemplateRenderer`]) using a per-message
//!   [`MessageEnvironment`], and inbound datagrams are recognised with
//!   [`parse_search`].

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `ssdp_core::Device` instead of `ssdp_core::domain::device::Device`.
pub use domain::device::{Device, EmbeddedDevice};
pub use domain::process::ProcessEnvironment;
pub use domain::search_target::{DeviceFilter, SearchRequest};
pub use protocol::environment::MessageEnvironment;
pub use protocol::notification::{notification_set, MessageKind, Notification};
pub use protocol::search::parse_search;
pub use protocol::template::{TemplateError, TemplateRenderer, TemplateSource};

//! Infrastructure layer for the SSDP server.
//!
//! Contains OS-facing adapters: the multicast socket, host name and OS
//! discovery, the static device registry, and configuration file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and `ssdp_core`,
//! but MUST NOT be imported by the `application` or domain layers.

pub mod host;
pub mod network;
pub mod registry;
pub mod storage;

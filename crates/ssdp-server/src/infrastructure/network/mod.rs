//! Network infrastructure for the SSDP server.
//!
//! # Sub-modules
//!
//! - **`multicast`** – The shared UDP socket on `239.255.255.250:1900`: the
//!   production [`Transport`](crate::application::announcer::Transport) and
//!   the receive loop that feeds inbound datagrams to the dispatch queue.
//!
//! - **`mock`** – A recording transport that stores datagrams instead of
//!   sending them.  Used by unit and integration tests.

pub mod mock;
pub mod multicast;

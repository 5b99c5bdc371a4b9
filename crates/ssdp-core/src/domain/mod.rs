//! Domain entities for the SSDP announcer.
//!
//! This module contains plain data and pure predicates with no infrastructure
//! dependencies:
//!
//! - [`device`] – the UPnP device being advertised (owned by the external
//!   device registry; this crate only ever borrows or clones it).
//! - [`search_target`] – the filter a control point's `ST:` header resolves to.
//! - [`process`] – values computed once at startup and shared read-only by
//!   every outbound message.

pub mod device;
pub mod process;
pub mod search_target;

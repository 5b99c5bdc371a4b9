//! Application layer use cases for the SSDP announcer.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure protocol rules in `ssdp_core`) and the infrastructure
//! (sockets, host name lookup, configuration files).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a goal (e.g., "keep announcing
//!   this device until it goes away").
//! - **Depend on abstractions** (the [`announcer::Transport`] and
//!   [`query_responder::DeviceRegistry`] traits) rather than concrete sockets
//!   or registries, so tests can substitute recording fakes.
//! - **Contain no socket calls and no file system access**.
//!
//! # Sub-modules
//!
//! - **`announcer`** – Renders and sends `ssdp:alive`, `ssdp:byebye`, and
//!   search-response salvos for a device, and keeps its renewal timer alive.
//!
//! - **`renewal`** – The per-device timer table and the retry cadence
//!   (rapid burst, then `max-age / 4`).
//!
//! - **`query_responder`** – Recognises `M-SEARCH` datagrams and asks the
//!   device registry which devices match.
//!
//! - **`dispatch`** – The single event loop that owns all of the above and
//!   processes one [`dispatch::SsdpEvent`] at a time.

pub mod announcer;
pub mod dispatch;
pub mod query_responder;
pub mod renewal;

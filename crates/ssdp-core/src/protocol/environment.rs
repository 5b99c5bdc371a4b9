//! The placeholder values used to render one message.
//!
//! A [`MessageEnvironment`] is a plain value built immediately before a
//! render and dropped right after it.  Nothing is shared between messages, so
//! a field set for one notification (say `NT`) can never leak into the next.
//!
//! # Examples
//!
//! ```rust
//! use ssdp_core::protocol::environment::{fields, MessageEnvironment};
//!
//! let env = MessageEnvironment::new()
//!     .with(fields::NT, "upnp:rootdevice")
//!     .with(fields::CACHE_CONTROL, 1800);
//!
//! assert_eq!(env.get(fields::CACHE_CONTROL), Some("1800"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;

/// Placeholder names understood by the built-in templates.
pub mod fields {
    pub const NT: &str = "NT";
    pub const USN: &str = "USN";
    pub const CACHE_CONTROL: &str = "CACHE-CONTROL";
    pub const CONFIGID: &str = "CONFIGID";
    pub const DATE: &str = "DATE";
    pub const LOCATION: &str = "LOCATION";
    pub const BOOTID: &str = "BOOTID";
    pub const SERVER: &str = "SERVER";
}

/// Mapping of placeholder name to rendered value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageEnvironment {
    values: BTreeMap<String, String>,
}

impl MessageEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing any previous value.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Display) -> Self {
        self.set(name, value);
        self
    }

    /// Sets `name` to `value` in place.
    pub fn set(&mut self, name: &str, value: impl Display) {
        self.values.insert(name.to_string(), value.to_string());
    }

    /// Returns the value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

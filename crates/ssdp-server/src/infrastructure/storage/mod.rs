//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from `--config` or the
//!   platform-appropriate directory.
//! - Writing it back after device uuids were generated, so devices keep their
//!   identity across restarts.
//! - Providing sensible defaults when the file does not exist yet (first run).

pub mod config;

//! TOML-based configuration for the SSDP server.
//!
//! The file is looked up at, in order:
//! - the path given with `--config` (or the `SSDP_CONFIG` environment variable);
//! - Windows:  `%APPDATA%\SsdpServer\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/ssdp-server/config.toml` or `~/.config/ssdp-server/config.toml`
//! - macOS:    `~/Library/Application Support/SsdpServer/config.toml`
//!
//! A missing file means "all defaults, no devices".
//!
//! # Example
//!
//! ```toml
//! [upnp]
//! max-age = 1800
//! web_server_port = 8080
//! response_mode = "multicast"
//!
//! [logging]
//! log_level = "info"
//!
//! [[devices]]
//! uuid = "0f6b1a2e-1111-2222-3333-444455556666"
//! type_ver = "MediaRenderer:1"
//! config_id = 1
//!
//!   [[devices.embedded]]
//!   type_ver = "MediaServer:1"
//! ```
//!
//! # Serde default values
//!
//! Every field has a default, so a file only needs the settings it changes.
//! Devices without a `uuid` get a random (v4) one from
//! [`AppConfig::assign_missing_uuids`]; the caller saves the file afterwards
//! so the identity survives restarts.

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ssdp_core::protocol::constants::DEFAULT_MAX_AGE;
use ssdp_core::{Device, EmbeddedDevice, TemplateSource};
use thiserror::Error;
use uuid::Uuid;

use crate::application::announcer::{AnnouncerSettings, ResponseMode};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file parsed but holds values the server cannot run with.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub upnp: UpnpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// SSDP and advertisement settings (section `[upnp]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpnpConfig {
    /// Cache lifetime in seconds; also sets the renewal period (a quarter of it).
    #[serde(rename = "max-age", default = "default_max_age")]
    pub max_age: u32,
    /// Port of the web server that serves description documents.
    #[serde(default = "default_web_server_port")]
    pub web_server_port: u16,
    /// Where search responses go: `"multicast"` or `"unicast"`.
    #[serde(default)]
    pub response_mode: ResponseMode,
    /// Address advertised in `LOCATION`; resolved from the host name if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_address: Option<IpAddr>,
    /// Directory whose files override the built-in message templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
    /// Product token at the end of the `SERVER` header.
    #[serde(default = "default_product")]
    pub product: String,
}

/// Logging settings (section `[logging]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One advertised root device (`[[devices]]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    /// Device type and version, e.g. `"MediaRenderer:1"`.
    pub type_ver: String,
    #[serde(default = "default_config_id")]
    pub config_id: u32,
    #[serde(default = "default_true")]
    pub root_device: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedded: Vec<EmbeddedEntry>,
}

/// A device embedded in a root device (`[[devices.embedded]]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    pub type_ver: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_max_age() -> u32 {
    DEFAULT_MAX_AGE
}
fn default_web_server_port() -> u16 {
    8080
}
fn default_product() -> String {
    format!("ssdp-server/{}", env!("CARGO_PKG_VERSION"))
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_config_id() -> u32 {
    1
}
fn default_true() -> bool {
    true
}

impl Default for UpnpConfig {
    fn default() -> Self {
        Self {
            max_age: default_max_age(),
            web_server_port: default_web_server_port(),
            response_mode: ResponseMode::default(),
            host_address: None,
            template_dir: None,
            product: default_product(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Values end up inside header lines; CR/LF would start a new header.
fn has_control_chars(value: &str) -> bool {
    value.chars().any(char::is_control)
}

// ── Derived settings ──────────────────────────────────────────────────────────

impl AppConfig {
    /// Checks the values that serde alone cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upnp.max_age == 0 {
            return Err(ConfigError::Invalid(
                "upnp.max-age must be at least 1 second".to_string(),
            ));
        }

        if has_control_chars(&self.upnp.product) {
            return Err(ConfigError::Invalid(
                "upnp.product must not contain control characters".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (index, device) in self.devices.iter().enumerate() {
            if device.type_ver.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "devices[{index}].type_ver must not be empty"
                )));
            }
            if has_control_chars(&device.type_ver) {
                return Err(ConfigError::Invalid(format!(
                    "devices[{index}].type_ver must not contain control characters"
                )));
            }
            if device.embedded.iter().any(|e| e.type_ver.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "devices[{index}] has an embedded device without type_ver"
                )));
            }
            if device.embedded.iter().any(|e| has_control_chars(&e.type_ver)) {
                return Err(ConfigError::Invalid(format!(
                    "devices[{index}] has an embedded type_ver with control characters"
                )));
            }
            let uuids = device
                .uuid
                .iter()
                .chain(device.embedded.iter().filter_map(|e| e.uuid.as_ref()));
            for uuid in uuids {
                if !seen.insert(*uuid) {
                    return Err(ConfigError::Invalid(format!("duplicate device uuid {uuid}")));
                }
            }
        }
        Ok(())
    }

    /// Gives every device and embedded device without a uuid a fresh one.
    ///
    /// Returns `true` if anything changed.
    pub fn assign_missing_uuids(&mut self) -> bool {
        let mut changed = false;
        for device in &mut self.devices {
            changed |= assign(&mut device.uuid);
            for embedded in &mut device.embedded {
                changed |= assign(&mut embedded.uuid);
            }
        }
        changed
    }

    /// The configured devices in announcement order.
    ///
    /// Call [`AppConfig::assign_missing_uuids`] first; a device still without
    /// a uuid here gets a throwaway one.
    pub fn devices(&self) -> Vec<Device> {
        self.devices
            .iter()
            .map(|entry| Device {
                uuid: uuid_string(entry.uuid),
                type_ver: entry.type_ver.clone(),
                config_id: entry.config_id,
                root_device: entry.root_device,
                embedded: entry
                    .embedded
                    .iter()
                    .map(|e| EmbeddedDevice {
                        uuid: uuid_string(e.uuid),
                        type_ver: e.type_ver.clone(),
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn announcer_settings(&self) -> AnnouncerSettings {
        AnnouncerSettings {
            web_server_port: self.upnp.web_server_port,
            max_age: self.upnp.max_age,
            response_mode: self.upnp.response_mode,
        }
    }

    pub fn template_source(&self) -> TemplateSource {
        match &self.upnp.template_dir {
            Some(dir) => TemplateSource::Directory(dir.clone()),
            None => TemplateSource::Builtin,
        }
    }
}

fn assign(uuid: &mut Option<Uuid>) -> bool {
    if uuid.is_some() {
        return false;
    }
    *uuid = Some(Uuid::new_v4());
    true
}

fn uuid_string(uuid: Option<Uuid>) -> String {
    uuid.unwrap_or_else(Uuid::new_v4).to_string()
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads and validates `AppConfig` from `path`, returning
/// `AppConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if validation fails.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            cfg.validate()?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`.
///
/// Creates the parent directory if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the `ssdp-server`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("SsdpServer"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("ssdp-server"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("SsdpServer")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Announcer: advertises devices on the SSDP multicast group.
//!
//! For each device lifecycle transition the announcer renders one datagram per
//! entry of the device's [`notification_set`] and hands it to the
//! [`Transport`]:
//!
//! | Operation                | Template             | Destination                  |
//! |--------------------------|----------------------|------------------------------|
//! | `announce_available`     | `notify-available`   | multicast group              |
//! | `announce_unavailable`   | `notify-unavailable` | multicast group              |
//! | `respond_to_query`       | `notify-response`    | group, or inquirer (unicast) |
//!
//! An available device is re-announced by its renewal timer (see
//! [`crate::application::renewal`]) until it becomes unavailable or the
//! announcer shuts down.
//!
//! Every datagram gets a freshly built [`MessageEnvironment`]: the process-wide
//! fields from [`ProcessEnvironment`] plus `CACHE-CONTROL`, `CONFIGID`, `DATE`,
//! `LOCATION`, `NT`, and `USN` computed at send time.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ssdp_core::protocol::constants::DEFAULT_MAX_AGE;
use ssdp_core::protocol::date::http_date_now;
use ssdp_core::protocol::environment::fields;
use ssdp_core::{
    notification_set, Device, MessageEnvironment, MessageKind, ProcessEnvironment, TemplateError,
    TemplateRenderer,
};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace, warn};

use crate::application::dispatch::SsdpEvent;
use crate::application::renewal::{next_retry_count, renewal_delay, RenewalTimers};

/// Configuration section and option that carry the cache lifetime.
pub const UPNP_SECTION: &str = "upnp";
pub const MAX_AGE_OPTION: &str = "max-age";

// ── Ports ─────────────────────────────────────────────────────────────────────

/// Error returned by a [`Transport`] when a datagram could not be handed to
/// the network stack.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send to {destination} failed: {source}")]
    Send {
        destination: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Sends datagrams over the shared SSDP socket.
///
/// Implementations must not block: a datagram that cannot be queued
/// immediately is reported as an error and dropped.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Sends `payload` to the SSDP multicast group.
    fn send(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Sends `payload` to a specific address.
    fn send_to(&self, payload: &[u8], destination: SocketAddr) -> Result<(), TransportError>;
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Where search responses are addressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// To the multicast group, like announcements.
    #[default]
    Multicast,
    /// Directly to the address the `M-SEARCH` came from.
    Unicast,
}

/// Tunables for an [`Announcer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncerSettings {
    /// Port of the external web server that serves description documents.
    pub web_server_port: u16,
    /// Cache lifetime in seconds.
    pub max_age: u32,
    pub response_mode: ResponseMode,
}

impl Default for AnnouncerSettings {
    fn default() -> Self {
        Self {
            web_server_port: 8080,
            max_age: DEFAULT_MAX_AGE,
            response_mode: ResponseMode::Multicast,
        }
    }
}

/// Error type for announcer operations.
#[derive(Debug, Error)]
pub enum AnnounceError {
    #[error("cannot render {kind:?} for device {uuid}: {source}")]
    Render {
        kind: MessageKind,
        uuid: String,
        #[source]
        source: TemplateError,
    },
}

// ── Announcer ─────────────────────────────────────────────────────────────────

/// Advertises devices and answers searches on their behalf.
///
/// Owned by the dispatch loop; none of its methods may be called concurrently.
pub struct Announcer {
    process: ProcessEnvironment,
    renderer: Arc<TemplateRenderer>,
    transport: Arc<dyn Transport>,
    timers: RenewalTimers,
    settings: AnnouncerSettings,
}

impl Announcer {
    /// Creates an announcer whose renewal timers post to `events`.
    pub fn new(
        process: ProcessEnvironment,
        renderer: Arc<TemplateRenderer>,
        transport: Arc<dyn Transport>,
        events: UnboundedSender<SsdpEvent>,
        settings: AnnouncerSettings,
    ) -> Self {
        Self {
            process,
            renderer,
            transport,
            timers: RenewalTimers::new(events),
            settings,
        }
    }

    /// Current cache lifetime in seconds.
    pub fn max_age(&self) -> u32 {
        self.settings.max_age
    }

    /// Returns `true` while `uuid` holds a renewal timer.
    pub fn is_advertising(&self, uuid: &str) -> bool {
        self.timers.is_scheduled(uuid)
    }

    /// Announces `device` now and starts its retransmission burst.
    ///
    /// Replaces any renewal timer the device already had.
    ///
    /// # Errors
    ///
    /// Returns [`AnnounceError::Render`] if a message cannot be rendered; in
    /// that case nothing is sent and no timer is left for the device.
    pub fn announce_available(&mut self, device: &Device) -> Result<(), AnnounceError> {
        info!(uuid = %device.uuid, type_ver = %device.type_ver, "device available");
        self.advertise(device, 0)
    }

    /// Cancels the renewal timer of `device`, then sends its `ssdp:byebye`s.
    ///
    /// # Errors
    ///
    /// Returns [`AnnounceError::Render`] if a message cannot be rendered.
    pub fn announce_unavailable(&mut self, device: &Device) -> Result<(), AnnounceError> {
        info!(uuid = %device.uuid, "device unavailable");
        self.timers.cancel(&device.uuid);
        self.send_all(device, MessageKind::Unavailable, None)
    }

    /// Sends the search response salvo for `device` to `inquirer`'s search.
    ///
    /// # Errors
    ///
    /// Returns [`AnnounceError::Render`] if a message cannot be rendered.
    pub fn respond_to_query(
        &self,
        device: &Device,
        inquirer: SocketAddr,
    ) -> Result<(), AnnounceError> {
        let destination = match self.settings.response_mode {
            ResponseMode::Multicast => None,
            ResponseMode::Unicast => Some(inquirer),
        };
        debug!(uuid = %device.uuid, %inquirer, mode = ?self.settings.response_mode, "responding to search");
        self.send_all(device, MessageKind::Response, destination)
    }

    /// Handles a renewal timer firing.
    ///
    /// Firings whose token no longer matches the device's live timer were
    /// overtaken by a replacement or a cancellation and are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AnnounceError::Render`] if the re-announcement cannot be
    /// rendered; the device's timer is dropped.
    pub fn on_timer_fired(
        &mut self,
        uuid: &str,
        retry_count: u8,
        token: u64,
    ) -> Result<(), AnnounceError> {
        let Some(device) = self.timers.claim(uuid, token) else {
            trace!(uuid, token, "stale renewal firing dropped");
            return Ok(());
        };
        self.advertise(&device, retry_count)
    }

    /// Applies a runtime configuration value.
    ///
    /// Only `upnp`/`max-age` is understood.  The new lifetime is used by the
    /// next message sent; pending timers keep their delay and pick up the new
    /// value when they reschedule.
    pub fn set_config_value(&mut self, section: &str, option: &str, value: &str) {
        if section != UPNP_SECTION || option != MAX_AGE_OPTION {
            debug!(section, option, "ignoring unknown configuration value");
            return;
        }
        match value.trim().parse::<u32>() {
            Ok(0) => warn!("max-age must be at least 1 second, keeping {}", self.settings.max_age),
            Ok(max_age) => {
                info!(old = self.settings.max_age, new = max_age, "max-age updated");
                self.settings.max_age = max_age;
            }
            Err(e) => warn!(value, "invalid max-age ({e}), keeping {}", self.settings.max_age),
        }
    }

    /// Withdraws every device still being advertised and cancels all timers.
    pub fn shutdown(&mut self) {
        let devices = self.timers.live_devices();
        info!(count = devices.len(), "withdrawing advertised devices");
        self.timers.cancel_all();
        for device in devices {
            if let Err(e) = self.send_all(&device, MessageKind::Unavailable, None) {
                warn!("byebye for {} not sent: {e}", device.uuid);
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Sends an `ssdp:alive` salvo and schedules the next one.
    fn advertise(&mut self, device: &Device, retry_count: u8) -> Result<(), AnnounceError> {
        if let Err(e) = self.send_all(device, MessageKind::Available, None) {
            self.timers.cancel(&device.uuid);
            return Err(e);
        }
        let delay = renewal_delay(retry_count, self.settings.max_age);
        self.timers
            .reschedule(device, next_retry_count(retry_count), delay);
        Ok(())
    }

    /// Renders the whole salvo first so a template error sends nothing, then
    /// sends each datagram.  Send failures are logged and skipped.
    fn send_all(
        &self,
        device: &Device,
        kind: MessageKind,
        destination: Option<SocketAddr>,
    ) -> Result<(), AnnounceError> {
        let payloads = self.render_all(device, kind)?;
        for payload in &payloads {
            let result = match destination {
                Some(addr) => self.transport.send_to(payload, addr),
                None => self.transport.send(payload),
            };
            if let Err(e) = result {
                warn!(uuid = %device.uuid, "{e}");
            }
        }
        trace!(uuid = %device.uuid, ?kind, count = payloads.len(), "salvo sent");
        Ok(())
    }

    fn render_all(&self, device: &Device, kind: MessageKind) -> Result<Vec<Vec<u8>>, AnnounceError> {
        let location = self
            .process
            .location(self.settings.web_server_port, &device.uuid);
        let date = http_date_now();

        notification_set(device)
            .into_iter()
            .map(|n| {
                let env: MessageEnvironment = self
                    .process
                    .message_environment()
                    .with(fields::CACHE_CONTROL, self.settings.max_age)
                    .with(fields::CONFIGID, device.config_id)
                    .with(fields::DATE, &date)
                    .with(fields::LOCATION, &location)
                    .with(fields::NT, &n.notification_type)
                    .with(fields::USN, &n.unique_service_name);
                self.renderer
                    .render(kind.template_name(), &env)
                    .map_err(|source| AnnounceError::Render {
                        kind,
                        uuid: device.uuid.clone(),
                        source,
                    })
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! The SSDP dispatch loop.
//!
//! All inputs to the announcer and the query responder arrive as typed
//! [`SsdpEvent`]s on one queue and are handled one at a time:
//!
//! ```text
//!  SsdpHandle ──────────────┐  DeviceAvailable / DeviceUnavailable
//!  (lifecycle, config,      │  ConfigValue / Shutdown
//!   shutdown)               │
//!  multicast receive loop ──┼─ InboundDatagram ──►  SsdpService::run
//!  renewal timer tasks ─────┘  TimerFired              ├─ Announcer
//!                                                      └─ QueryResponder
//! ```
//!
//! Because only the loop touches the announcer and the timer table, neither
//! needs a lock.  The loop ends after handling [`SsdpEvent::Shutdown`], which
//! withdraws every device still being advertised.

use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;

use ssdp_core::{Device, ProcessEnvironment, TemplateRenderer};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, trace};

use crate::application::announcer::{Announcer, AnnouncerSettings, Transport};
use crate::application::query_responder::{DeviceRegistry, QueryResponder};

/// Everything the dispatch loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsdpEvent {
    /// Start advertising a device.
    DeviceAvailable(Device),
    /// Stop advertising a device and send its byebyes.
    DeviceUnavailable(Device),
    /// A datagram received on the SSDP socket.
    InboundDatagram { source: SocketAddr, payload: Vec<u8> },
    /// A renewal timer expired.  `token` identifies the timer instance.
    TimerFired {
        uuid: String,
        retry_count: u8,
        token: u64,
    },
    /// A runtime configuration value, e.g. `upnp`/`max-age`.
    ConfigValue {
        section: String,
        option: String,
        value: String,
    },
    /// Withdraw all devices and stop the loop.
    Shutdown,
}

/// Returned by [`SsdpHandle`] methods once the loop has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("SSDP service has stopped")]
pub struct ServiceStopped;

/// Cloneable handle for posting events to a running [`SsdpService`].
#[derive(Debug, Clone)]
pub struct SsdpHandle {
    events: UnboundedSender<SsdpEvent>,
}

impl SsdpHandle {
    pub fn announce_available(&self, device: Device) -> Result<(), ServiceStopped> {
        self.post(SsdpEvent::DeviceAvailable(device))
    }

    pub fn announce_unavailable(&self, device: Device) -> Result<(), ServiceStopped> {
        self.post(SsdpEvent::DeviceUnavailable(device))
    }

    pub fn config_value(
        &self,
        section: impl Into<String>,
        option: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ServiceStopped> {
        self.post(SsdpEvent::ConfigValue {
            section: section.into(),
            option: option.into(),
            value: value.into(),
        })
    }

    /// Delivers a received datagram to the query responder.
    pub fn inbound(&self, source: SocketAddr, payload: Vec<u8>) -> Result<(), ServiceStopped> {
        self.post(SsdpEvent::InboundDatagram { source, payload })
    }

    pub fn shutdown(&self) -> Result<(), ServiceStopped> {
        self.post(SsdpEvent::Shutdown)
    }

    fn post(&self, event: SsdpEvent) -> Result<(), ServiceStopped> {
        self.events.send(event).map_err(|_| ServiceStopped)
    }
}

/// Owns the announcer, the query responder, and the event queue.
pub struct SsdpService {
    announcer: Announcer,
    responder: QueryResponder,
    events: UnboundedReceiver<SsdpEvent>,
}

impl SsdpService {
    /// Builds the service and a handle for feeding it events.
    pub fn new(
        process: ProcessEnvironment,
        renderer: Arc<TemplateRenderer>,
        transport: Arc<dyn Transport>,
        registry: Arc<dyn DeviceRegistry>,
        settings: AnnouncerSettings,
    ) -> (Self, SsdpHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let announcer = Announcer::new(process, renderer, transport, tx.clone(), settings);
        let service = Self {
            announcer,
            responder: QueryResponder::new(registry),
            events: rx,
        };
        (service, SsdpHandle { events: tx })
    }

    /// Runs until a [`SsdpEvent::Shutdown`] has been handled.
    pub async fn run(mut self) {
        info!("SSDP dispatch loop started");
        while let Some(event) = self.next_event().await {
            if self.handle_event(event).is_break() {
                break;
            }
        }
        info!("SSDP dispatch loop stopped");
    }

    /// Waits for the next queued event without handling it.
    pub async fn next_event(&mut self) -> Option<SsdpEvent> {
        self.events.recv().await
    }

    /// Handles one event.  Returns [`ControlFlow::Break`] after `Shutdown`.
    ///
    /// Errors are logged here; none of them stop the loop.
    pub fn handle_event(&mut self, event: SsdpEvent) -> ControlFlow<()> {
        match event {
            SsdpEvent::DeviceAvailable(device) => {
                if let Err(e) = self.announcer.announce_available(&device) {
                    error!("{e}");
                }
            }
            SsdpEvent::DeviceUnavailable(device) => {
                if let Err(e) = self.announcer.announce_unavailable(&device) {
                    error!("{e}");
                }
            }
            SsdpEvent::InboundDatagram { source, payload } => {
                trace!(%source, len = payload.len(), "datagram received");
                for device in self.responder.on_datagram(source, &payload) {
                    if let Err(e) = self.announcer.respond_to_query(&device, source) {
                        error!("{e}");
                    }
                }
            }
            SsdpEvent::TimerFired {
                uuid,
                retry_count,
                token,
            } => {
                if let Err(e) = self.announcer.on_timer_fired(&uuid, retry_count, token) {
                    error!("{e}");
                }
            }
            SsdpEvent::ConfigValue {
                section,
                option,
                value,
            } => self.announcer.set_config_value(&section, &option, &value),
            SsdpEvent::Shutdown => {
                self.announcer.shutdown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    pub fn announcer(&self) -> &Announcer {
        &self.announcer
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

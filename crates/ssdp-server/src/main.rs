//! SSDP announcer entry point.
//!
//! Advertises the devices listed in the configuration file on the SSDP
//! multicast group, answers `M-SEARCH` discovery queries for them, and sends
//! `ssdp:byebye` for each of them on shutdown.
//!
//! # Usage
//!
//! ```text
//! ssdp-server [OPTIONS]
//!
//! Options:
//!   --config    <PATH>   Configuration file [env: SSDP_CONFIG]
//!   --log-level <LEVEL>  Log level when RUST_LOG is unset [env: SSDP_LOG_LEVEL]
//! ```
//!
//! # Signals
//!
//! - `Ctrl+C` / `SIGINT`: withdraw all devices and exit.
//! - `SIGHUP` (Unix): reload the configuration file and apply its `max-age`.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()               -- TOML file, defaults when absent
//!  └─ process_environment()       -- boot id, SERVER string, host address
//!  └─ MulticastTransport::bind()  -- 0.0.0.0:1900, joined to 239.255.255.250
//!  └─ SsdpService::run()          -- the dispatch loop
//!       ├─ receive loop  (InboundDatagram)
//!       ├─ renewal timers (TimerFired)
//!       └─ signal tasks  (Shutdown / ConfigValue)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ssdp_core::{MessageKind, TemplateRenderer};
use ssdp_server::application::announcer::{MAX_AGE_OPTION, UPNP_SECTION};
use ssdp_server::application::dispatch::{SsdpHandle, SsdpService};
use ssdp_server::application::query_responder::DeviceRegistry;
use ssdp_server::infrastructure::host::process_environment;
use ssdp_server::infrastructure::network::multicast::{spawn_receive_loop, MulticastTransport};
use ssdp_server::infrastructure::registry::StaticDeviceRegistry;
use ssdp_server::infrastructure::storage::config::{
    config_file_path, load_config, save_config, AppConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// SSDP announcer for UPnP devices.
#[derive(Debug, Parser)]
#[command(
    name = "ssdp-server",
    about = "Advertises UPnP devices over SSDP and answers M-SEARCH queries",
    version
)]
struct Cli {
    /// Path of the TOML configuration file.
    ///
    /// Defaults to `config.toml` in the platform configuration directory.
    #[arg(long, env = "SSDP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.  Overrides `[logging]`.
    #[arg(long, env = "SSDP_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("no --config given and no platform config dir"),
        }
    }

    /// `RUST_LOG` wins, then `--log-level`, then the configuration file.
    fn env_filter(&self, config: &AppConfig) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = self
                .log_level
                .as_deref()
                .unwrap_or(&config.logging.log_level);
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path()?;

    // The configuration is read before logging starts because it holds the
    // log level.
    let mut config = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(cli.env_filter(&config))
        .init();

    info!("SSDP announcer starting, config {}", config_path.display());

    if config.assign_missing_uuids() {
        match save_config(&config, &config_path) {
            Ok(()) => info!("generated device uuids saved to {}", config_path.display()),
            Err(e) => warn!("generated device uuids not saved, they will change on restart: {e}"),
        }
    }

    // ── Process environment and templates ─────────────────────────────────────
    let process = process_environment(&config.upnp.product, config.upnp.host_address);

    let renderer = Arc::new(TemplateRenderer::new(config.template_source()));
    for kind in [
        MessageKind::Available,
        MessageKind::Unavailable,
        MessageKind::Response,
    ] {
        renderer
            .template(kind.template_name())
            .with_context(|| format!("loading template {}", kind.template_name()))?;
    }

    // ── Socket, registry, and dispatch loop ───────────────────────────────────
    let transport = MulticastTransport::bind().context("binding the SSDP socket")?;
    let socket = transport.socket();
    let registry = Arc::new(StaticDeviceRegistry::new(config.devices()));

    let (service, handle) = SsdpService::new(
        process,
        renderer,
        Arc::new(transport),
        Arc::clone(&registry) as Arc<dyn DeviceRegistry>,
        config.announcer_settings(),
    );

    let receiver = spawn_receive_loop(socket, handle.clone());
    spawn_shutdown_handler(handle.clone());
    #[cfg(unix)]
    spawn_reload_handler(handle.clone(), config_path);

    if registry.devices().is_empty() {
        warn!("no devices configured; only the socket will be open");
    }
    for device in registry.devices() {
        handle.announce_available(device.clone())?;
    }

    info!("SSDP announcer ready.  Press Ctrl-C to exit.");
    service.run().await;

    receiver.abort();
    info!("SSDP announcer stopped");
    Ok(())
}

// ── Signal handling ───────────────────────────────────────────────────────────

/// Posts `Shutdown` on Ctrl+C.
fn spawn_shutdown_handler(handle: SsdpHandle) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = handle.shutdown();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });
}

/// Re-reads the configuration file on every SIGHUP and posts its `max-age`.
#[cfg(unix)]
fn spawn_reload_handler(handle: SsdpHandle, config_path: PathBuf) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("SIGHUP reload unavailable: {e}");
                return;
            }
        };
        while hangups.recv().await.is_some() {
            info!("SIGHUP received, reloading {}", config_path.display());
            let max_age = match load_config(&config_path) {
                Ok(config) => config.upnp.max_age,
                Err(e) => {
                    warn!("reload failed, keeping current settings: {e}");
                    continue;
                }
            };
            if handle
                .config_value(UPNP_SECTION, MAX_AGE_OPTION, max_age.to_string())
                .is_err()
            {
                break;
            }
        }
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────

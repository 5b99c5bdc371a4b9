//! The shared SSDP multicast socket.
//!
//! One UDP socket, bound to port 1900 on all interfaces and joined to
//! `239.255.255.250`, carries all SSDP traffic in both directions:
//!
//! - [`MulticastTransport`] implements the announcer's [`Transport`] port.
//!   Sends use `try_send_to` and never wait: a full socket buffer drops the
//!   datagram, which SSDP's repeated announcements tolerate.
//! - [`spawn_receive_loop`] reads every datagram that arrives on the socket and
//!   posts it to the dispatch loop as an `InboundDatagram` event.
//!
//! # Why socket2? (for beginners)
//!
//! Several SSDP stacks usually run on one host (media servers, smart TVs, the
//! OS's own discovery service).  Each needs to bind port 1900, which the
//! standard library refuses unless `SO_REUSEADDR` (and on Unix
//! `SO_REUSEPORT`) is set *before* `bind`.  `socket2` exposes those options;
//! the configured socket is then converted into a `tokio::net::UdpSocket`.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use ssdp_core::protocol::constants::{MULTICAST_TTL, SSDP_ADDR, SSDP_PORT};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::announcer::{Transport, TransportError};
use crate::application::dispatch::SsdpHandle;

/// Largest datagram accepted.  SSDP messages are a few hundred bytes.
const RECV_BUFFER_SIZE: usize = 8192;

/// Error type for multicast socket setup.
#[derive(Debug, Error)]
pub enum MulticastError {
    #[error("failed to create UDP socket: {0}")]
    Create(#[source] io::Error),

    #[error("failed to bind SSDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to join multicast group {group} on {interface}: {source}")]
    JoinGroup {
        group: Ipv4Addr,
        interface: Ipv4Addr,
        #[source]
        source: io::Error,
    },

    #[error("failed to configure SSDP socket: {0}")]
    Configure(#[source] io::Error),
}

/// Sends datagrams through the shared SSDP socket.
pub struct MulticastTransport {
    socket: Arc<UdpSocket>,
    group: SocketAddr,
}

impl MulticastTransport {
    /// Binds the standard SSDP socket (`0.0.0.0:1900`, group joined on every
    /// interface).
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`MulticastError`] naming the setup step that failed.
    pub fn bind() -> Result<Self, MulticastError> {
        Self::bind_to(SSDP_PORT, Ipv4Addr::UNSPECIFIED)
    }

    /// Binds `0.0.0.0:<port>` and joins the SSDP group on `interface`.
    ///
    /// # Errors
    ///
    /// Returns a [`MulticastError`] naming the setup step that failed.
    pub fn bind_to(port: u16, interface: Ipv4Addr) -> Result<Self, MulticastError> {
        let std_socket = create_multicast_socket(port, interface)?;
        let socket = UdpSocket::from_std(std_socket).map_err(MulticastError::Configure)?;
        info!("SSDP socket bound on UDP {port}, joined {SSDP_ADDR} on {interface}");
        Ok(Self::with_socket(
            Arc::new(socket),
            SocketAddr::V4(SocketAddrV4::new(SSDP_ADDR, SSDP_PORT)),
        ))
    }

    /// Wraps an already configured socket; group sends go to `group`.
    pub fn with_socket(socket: Arc<UdpSocket>, group: SocketAddr) -> Self {
        Self { socket, group }
    }

    /// The underlying socket, shared with the receive loop.
    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }

    fn try_send(&self, payload: &[u8], destination: SocketAddr) -> Result<(), TransportError> {
        self.socket
            .try_send_to(payload, destination)
            .map(|_| ())
            .map_err(|source| TransportError::Send {
                destination,
                source,
            })
    }
}

impl Transport for MulticastTransport {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.try_send(payload, self.group)
    }

    fn send_to(&self, payload: &[u8], destination: SocketAddr) -> Result<(), TransportError> {
        self.try_send(payload, destination)
    }
}

/// Creates the non-blocking, group-joined socket.
fn create_multicast_socket(
    port: u16,
    interface: Ipv4Addr,
) -> Result<std::net::UdpSocket, MulticastError> {
    let socket =
        Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(MulticastError::Create)?;

    socket
        .set_reuse_address(true)
        .map_err(MulticastError::Configure)?;
    #[cfg(unix)]
    socket.set_reuse_port(true).map_err(MulticastError::Configure)?;

    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    socket
        .bind(&addr.into())
        .map_err(|source| MulticastError::Bind { addr, source })?;

    socket
        .join_multicast_v4(&SSDP_ADDR, &interface)
        .map_err(|source| MulticastError::JoinGroup {
            group: SSDP_ADDR,
            interface,
            source,
        })?;
    socket
        .set_multicast_ttl_v4(MULTICAST_TTL)
        .map_err(MulticastError::Configure)?;
    socket
        .set_nonblocking(true)
        .map_err(MulticastError::Configure)?;

    Ok(socket.into())
}

/// Spawns the task that forwards every received datagram to the dispatch loop.
///
/// The task ends when the dispatch loop has stopped.  Receive errors are
/// logged and the loop keeps reading.
pub fn spawn_receive_loop(socket: Arc<UdpSocket>, handle: SsdpHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let (len, source) = match socket.recv_from(&mut buf).await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("SSDP recv error: {e}");
                    continue;
                }
            };
            if handle.inbound(source, buf[..len].to_vec()).is_err() {
                debug!("dispatch loop gone, receive loop exiting");
                break;
            }
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

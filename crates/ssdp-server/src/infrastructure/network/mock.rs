//! Recording transport for tests and dry runs.
//!
//! [`RecordingTransport`] implements the announcer's [`Transport`] port
//! without a socket.  Every datagram is stored with the (tokio) instant it was
//! sent, so tests running on a paused clock can assert the exact announcement
//! cadence.

use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;

use crate::application::announcer::{Transport, TransportError};

/// One datagram handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    pub at: Instant,
    /// `None` for the multicast group, `Some` for a unicast send.
    pub destination: Option<SocketAddr>,
    pub payload: Vec<u8>,
}

impl SentDatagram {
    /// The payload as text; SSDP messages are ASCII.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// The trimmed value of the first header line starting with `name`
    /// (include the colon, e.g. `"NT:"`).
    pub fn header(&self, name: &str) -> Option<String> {
        self.text()
            .split("\r\n")
            .find_map(|line| line.strip_prefix(name).map(|v| v.trim().to_string()))
    }
}

/// A [`Transport`] that records instead of sending.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentDatagram>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.lock().clone()
    }

    /// Number of datagrams sent so far.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn record(&self, payload: &[u8], destination: Option<SocketAddr>) {
        self.lock().push(SentDatagram {
            at: Instant::now(),
            destination,
            payload: payload.to_vec(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SentDatagram>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for RecordingTransport {
    fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.record(payload, None);
        Ok(())
    }

    fn send_to(&self, payload: &[u8], destination: SocketAddr) -> Result<(), TransportError> {
        self.record(payload, Some(destination));
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

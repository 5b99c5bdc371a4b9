//! Per-device renewal timers.
//!
//! Every available device owns exactly one pending timer.  A timer is a tokio
//! task that sleeps and then posts [`SsdpEvent::TimerFired`] back to the
//! dispatch queue; it never touches the announcer directly, so all state
//! changes still happen on the dispatch loop.
//!
//! # Cadence
//!
//! ```text
//! t = 0        announce (retry 0)  ─┐
//! t = 0.25 s   announce (retry 1)   │ burst: BURST_INTERVAL apart
//! t = 0.50 s   announce (retry 2)   │
//! t = 0.75 s   announce (retry 3)  ─┘
//! t = 0.75 s + max_age/4           announce (retry 3)
//! t = 0.75 s + 2 * max_age/4       announce (retry 3) ... forever
//! ```
//!
//! # Stale firings
//!
//! A timer task may already have posted its event when the entry is replaced
//! or cancelled.  Each entry carries a token; a firing whose token does not
//! match the live entry for its uuid is rejected by [`RenewalTimers::claim`].

use std::collections::HashMap;
use std::time::Duration;

use ssdp_core::protocol::constants::{BURST_INTERVAL, BURST_RETRIES};
use ssdp_core::Device;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::application::dispatch::SsdpEvent;

/// Delay before the retransmission that follows a send carrying `retry_count`.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use ssdp_server::application::renewal::renewal_delay;
///
/// assert_eq!(renewal_delay(0, 1800), Duration::from_millis(250));
/// assert_eq!(renewal_delay(3, 1800), Duration::from_secs(450));
/// ```
pub fn renewal_delay(retry_count: u8, max_age: u32) -> Duration {
    if retry_count < BURST_RETRIES {
        BURST_INTERVAL
    } else {
        // max_age / 4 seconds, kept exact for ages that are not multiples of 4.
        Duration::from_millis(u64::from(max_age) * 250)
    }
}

/// Retry counter carried by the next firing.  Saturates at the end of the burst.
pub fn next_retry_count(retry_count: u8) -> u8 {
    retry_count.saturating_add(1).min(BURST_RETRIES)
}

struct TimerEntry {
    handle: JoinHandle<()>,
    token: u64,
    device: Device,
}

/// Timer table keyed by device uuid.
pub struct RenewalTimers {
    events: UnboundedSender<SsdpEvent>,
    entries: HashMap<String, TimerEntry>,
    next_token: u64,
}

impl RenewalTimers {
    /// Creates an empty table whose timers post to `events`.
    pub fn new(events: UnboundedSender<SsdpEvent>) -> Self {
        Self {
            events,
            entries: HashMap::new(),
            next_token: 0,
        }
    }

    /// Schedules a firing for `device` after `delay`, replacing (and aborting)
    /// any timer already held for the same uuid.
    ///
    /// Returns the token the firing will carry.
    ///
    /// Must be called from within a tokio runtime.
    pub fn reschedule(&mut self, device: &Device, retry_count: u8, delay: Duration) -> u64 {
        self.cancel(&device.uuid);

        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);

        let events = self.events.clone();
        let uuid = device.uuid.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A closed queue means the dispatch loop is gone; nothing to do.
            let _ = events.send(SsdpEvent::TimerFired {
                uuid,
                retry_count,
                token,
            });
        });

        trace!(uuid = %device.uuid, retry_count, ?delay, token, "renewal scheduled");
        self.entries.insert(
            device.uuid.clone(),
            TimerEntry {
                handle,
                token,
                device: device.clone(),
            },
        );
        token
    }

    /// Cancels the timer for `uuid`.  Returns `true` if one was live.
    ///
    /// Cancelling an unknown uuid is a no-op.
    pub fn cancel(&mut self, uuid: &str) -> bool {
        match self.entries.remove(uuid) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels every timer.
    pub fn cancel_all(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.handle.abort();
        }
    }

    /// Returns the device behind a firing, or `None` if the firing is stale.
    pub fn claim(&self, uuid: &str, token: u64) -> Option<Device> {
        self.entries
            .get(uuid)
            .filter(|entry| entry.token == token)
            .map(|entry| entry.device.clone())
    }

    /// Returns `true` if a timer is held for `uuid`.
    pub fn is_scheduled(&self, uuid: &str) -> bool {
        self.entries.contains_key(uuid)
    }

    /// Devices that currently hold a timer, i.e. are being advertised.
    pub fn live_devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.entries.values().map(|e| e.device.clone()).collect();
        devices.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        devices
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for RenewalTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_device(uuid: &str) -> Device {
        Device::new(uuid, "MediaRenderer:1", 1)
    }

    // ── Delay schedule ────────────────────────────────────────────────────────

    #[test]
    fn test_burst_delay_is_quarter_second() {
        assert_eq!(renewal_delay(0, 1800), Duration::from_millis(250));
        assert_eq!(renewal_delay(1, 1800), Duration::from_millis(250));
        assert_eq!(renewal_delay(2, 1800), Duration::from_millis(250));
    }

    #[test]
    fn test_steady_state_delay_is_quarter_of_max_age() {
        assert_eq!(renewal_delay(3, 1800), Duration::from_secs(450));
        assert_eq!(renewal_delay(3, 100), Duration::from_secs(25));
    }

    #[test]
    fn test_steady_state_delay_is_exact_for_odd_max_age() {
        assert_eq!(renewal_delay(3, 5), Duration::from_millis(1250));
    }

    #[test]
    fn test_retry_count_saturates_at_burst_end() {
        assert_eq!(next_retry_count(0), 1);
        assert_eq!(next_retry_count(2), 3);
        assert_eq!(next_retry_count(3), 3);
        assert_eq!(next_retry_count(u8::MAX), 3);
    }

    // ── Timer table ───────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_timer_posts_firing_after_delay() {
        // Arrange
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = RenewalTimers::new(tx);

        // Act
        let token = timers.reschedule(&make_device("dev-1"), 1, Duration::from_millis(250));
        let event = rx.recv().await.expect("firing");

        // Assert
        match event {
            SsdpEvent::TimerFired {
                uuid,
                retry_count,
                token: fired,
            } => {
                assert_eq!(uuid, "dev-1");
                assert_eq!(retry_count, 1);
                assert_eq!(fired, token);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(timers.claim("dev-1", token).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_existing_timer() {
        // Arrange
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = RenewalTimers::new(tx);
        let device = make_device("dev-1");
        let first = timers.reschedule(&device, 1, Duration::from_millis(100));

        // Act
        let second = timers.reschedule(&device, 2, Duration::from_millis(500));
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Assert: only the replacement fired
        let mut fired = Vec::new();
        while let Ok(SsdpEvent::TimerFired { token, .. }) = rx.try_recv() {
            fired.push(token);
        }
        assert_eq!(fired, vec![second]);
        assert_ne!(first, second);
        assert_eq!(timers.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = RenewalTimers::new(tx);
        timers.reschedule(&make_device("dev-1"), 1, Duration::from_millis(250));

        assert!(timers.cancel("dev-1"));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(rx.try_recv().is_err());
        assert!(timers.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timers = RenewalTimers::new(tx);
        timers.reschedule(&make_device("dev-1"), 1, Duration::from_secs(60));

        assert!(timers.cancel("dev-1"));
        assert!(!timers.cancel("dev-1"));
        assert!(!timers.cancel("never-scheduled"));
    }

    #[tokio::test]
    async fn test_claim_rejects_stale_token() {
        // Arrange
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timers = RenewalTimers::new(tx);
        let device = make_device("dev-1");
        let old = timers.reschedule(&device, 1, Duration::from_secs(60));
        let new = timers.reschedule(&device, 1, Duration::from_secs(60));

        // Act / Assert
        assert!(timers.claim("dev-1", old).is_none());
        assert_eq!(timers.claim("dev-1", new), Some(device));
    }

    #[tokio::test]
    async fn test_claim_after_cancel_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timers = RenewalTimers::new(tx);
        let token = timers.reschedule(&make_device("dev-1"), 1, Duration::from_secs(60));
        timers.cancel("dev-1");

        assert!(timers.claim("dev-1", token).is_none());
    }

    #[tokio::test]
    async fn test_live_devices_lists_each_scheduled_device_once() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timers = RenewalTimers::new(tx);
        timers.reschedule(&make_device("b"), 1, Duration::from_secs(60));
        timers.reschedule(&make_device("a"), 1, Duration::from_secs(60));
        timers.reschedule(&make_device("b"), 2, Duration::from_secs(60));

        let uuids: Vec<String> = timers.live_devices().into_iter().map(|d| d.uuid).collect();

        assert_eq!(uuids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_clears_table_and_silences_timers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = RenewalTimers::new(tx);
        timers.reschedule(&make_device("a"), 1, Duration::from_millis(250));
        timers.reschedule(&make_device("b"), 1, Duration::from_millis(250));

        timers.cancel_all();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(timers.is_empty());
        assert!(rx.try_recv().is_err());
    }
}

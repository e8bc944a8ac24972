//! Network activity monitor.
//!
//! Tracks in-flight request count and exposes the debounced network-idle
//! condition: idle means zero in-flight requests for a continuous quiet
//! window, not an instantaneous zero-check — a burst where one request ends
//! and the next starts moments later never reads as idle.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct NetworkInner {
    in_flight: usize,
    last_activity: Option<Instant>,
    total_started: u64,
}

/// Shared monitor for the page's network activity.
///
/// The host notifies request starts and finishes; the engine polls
/// [`NetworkMonitor::is_idle`] through the Retry/Poll Engine.
#[derive(Debug, Clone, Default)]
pub struct NetworkMonitor {
    inner: Arc<Mutex<NetworkInner>>,
}

impl NetworkMonitor {
    /// Create a monitor with no recorded activity (idle)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request starting
    pub fn request_started(&self) {
        let mut inner = self.lock();
        inner.in_flight += 1;
        inner.total_started += 1;
        inner.last_activity = Some(Instant::now());
    }

    /// Record a request finishing (completion or failure)
    pub fn request_finished(&self) {
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);
        inner.last_activity = Some(Instant::now());
    }

    /// Number of requests currently in flight
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Total requests ever started
    #[must_use]
    pub fn total_started(&self) -> u64 {
        self.lock().total_started
    }

    /// Whether the network has been quiet for the full window: zero
    /// in-flight requests and no activity for at least `quiet_window`.
    /// A page with no recorded activity at all counts as idle.
    #[must_use]
    pub fn is_idle(&self, quiet_window: Duration) -> bool {
        let inner = self.lock();
        if inner.in_flight > 0 {
            return false;
        }
        match inner.last_activity {
            Some(last) => last.elapsed() >= quiet_window,
            None => true,
        }
    }

    /// Describe the current state for timeout diagnostics
    #[must_use]
    pub fn describe(&self) -> String {
        let inner = self.lock();
        match (inner.in_flight, inner.last_activity) {
            (0, Some(last)) => format!(
                "0 in flight, last activity {}ms ago",
                last.elapsed().as_millis()
            ),
            (0, None) => "no network activity".to_string(),
            (n, _) => format!("{n} request(s) in flight"),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkInner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

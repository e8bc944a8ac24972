//! Engine configuration and per-call overrides.
//!
//! Every action, read, and assertion accepts a timeout override; the
//! process-wide defaults live in [`EngineConfig`] on the page.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default timeout for auto-waiting (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval for auto-waiting (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Floor on the polling interval. Bounds predicate evaluations per second
/// so a tight override cannot busy-spin the host.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Grace period before an unhandled dialog is auto-dismissed (1 second)
pub const DEFAULT_DIALOG_GRACE_MS: u64 = 1_000;

/// Continuous quiet window required for network idle (500ms)
pub const DEFAULT_NETWORK_QUIET_MS: u64 = 500;

/// Process-wide engine defaults, owned by the page and overridable per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Default timeout for actions, reads, and assertions
    pub timeout_ms: u64,
    /// Default polling interval
    pub poll_interval_ms: u64,
    /// Grace period before unhandled dialogs are auto-dismissed
    pub dialog_grace_ms: u64,
    /// Quiet window for the network-idle condition
    pub network_quiet_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            dialog_grace_ms: DEFAULT_DIALOG_GRACE_MS,
            network_quiet_ms: DEFAULT_NETWORK_QUIET_MS,
        }
    }
}

impl EngineConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the polling interval (clamped to the interval floor)
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = (interval.as_millis() as u64).max(MIN_POLL_INTERVAL_MS);
        self
    }

    /// Set the dialog grace period
    #[must_use]
    pub const fn with_dialog_grace(mut self, grace: Duration) -> Self {
        self.dialog_grace_ms = grace.as_millis() as u64;
        self
    }

    /// Set the network quiet window
    #[must_use]
    pub const fn with_network_quiet_window(mut self, window: Duration) -> Self {
        self.network_quiet_ms = window.as_millis() as u64;
        self
    }

    /// Default timeout as a Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Polling interval as a Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Dialog grace period as a Duration
    #[must_use]
    pub const fn dialog_grace(&self) -> Duration {
        Duration::from_millis(self.dialog_grace_ms)
    }

    /// Network quiet window as a Duration
    #[must_use]
    pub const fn network_quiet_window(&self) -> Duration {
        Duration::from_millis(self.network_quiet_ms)
    }
}

/// Per-locator overrides of the engine defaults.
///
/// `None` means "use the page's [`EngineConfig`] value".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Timeout override for actions and assertions through this locator
    pub timeout: Option<Duration>,
    /// Polling interval override
    pub poll_interval: Option<Duration>,
}

impl LocatorOptions {
    /// Resolve the effective timeout against the engine defaults
    #[must_use]
    pub fn effective_timeout(&self, config: &EngineConfig) -> Duration {
        self.timeout.unwrap_or_else(|| config.timeout())
    }

    /// Resolve the effective polling interval against the engine defaults,
    /// applying the interval floor
    #[must_use]
    pub fn effective_interval(&self, config: &EngineConfig) -> Duration {
        self.poll_interval
            .unwrap_or_else(|| config.poll_interval())
            .max(Duration::from_millis(MIN_POLL_INTERVAL_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod engine_config {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = EngineConfig::default();
            assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
            assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
            assert_eq!(config.dialog_grace_ms, DEFAULT_DIALOG_GRACE_MS);
            assert_eq!(config.network_quiet_ms, DEFAULT_NETWORK_QUIET_MS);
        }

        #[test]
        fn test_chained_builders() {
            let config = EngineConfig::new()
                .with_timeout(Duration::from_secs(10))
                .with_poll_interval(Duration::from_millis(50))
                .with_dialog_grace(Duration::from_millis(200))
                .with_network_quiet_window(Duration::from_millis(250));
            assert_eq!(config.timeout(), Duration::from_secs(10));
            assert_eq!(config.poll_interval(), Duration::from_millis(50));
            assert_eq!(config.dialog_grace(), Duration::from_millis(200));
            assert_eq!(config.network_quiet_window(), Duration::from_millis(250));
        }

        #[test]
        fn test_poll_interval_floor() {
            let config = EngineConfig::new().with_poll_interval(Duration::from_millis(1));
            assert_eq!(config.poll_interval_ms, MIN_POLL_INTERVAL_MS);
        }
    }

    mod locator_options {
        use super::*;

        #[test]
        fn test_defaults_fall_through_to_engine_config() {
            let opts = LocatorOptions::default();
            let config = EngineConfig::default();
            assert_eq!(opts.effective_timeout(&config), config.timeout());
            assert_eq!(opts.effective_interval(&config), config.poll_interval());
        }

        #[test]
        fn test_override_wins() {
            let opts = LocatorOptions {
                timeout: Some(Duration::from_secs(6)),
                poll_interval: Some(Duration::from_millis(25)),
            };
            let config = EngineConfig::default();
            assert_eq!(opts.effective_timeout(&config), Duration::from_secs(6));
            assert_eq!(opts.effective_interval(&config), Duration::from_millis(25));
        }

        #[test]
        fn test_interval_override_respects_floor() {
            let opts = LocatorOptions {
                timeout: None,
                poll_interval: Some(Duration::from_millis(1)),
            };
            let config = EngineConfig::default();
            assert_eq!(
                opts.effective_interval(&config),
                Duration::from_millis(MIN_POLL_INTERVAL_MS)
            );
        }
    }
}

//! Page facade.
//!
//! A [`Page`] is the per-test-case entry point: it owns the live document,
//! the dialog bridge, the network monitor, the cancellation token, and the
//! engine defaults, and it constructs locators. The external test runner is
//! expected to hand each test case a fresh page; the engine keeps no state
//! across pages.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::dialog::{Dialog, DialogBridge};
use crate::dom::Document;
use crate::locator::Locator;
use crate::network::NetworkMonitor;
use crate::poll::{poll_until, CancelToken, PollError, PollOutcome, PollSuccess};
use crate::result::{EsperarError, EsperarResult};
use crate::selector::{Selector, TextMatch};

/// Shared engine state behind every locator built from one page
#[derive(Debug)]
pub(crate) struct PageCore {
    pub(crate) doc: Document,
    pub(crate) dialogs: DialogBridge,
    pub(crate) network: NetworkMonitor,
    pub(crate) cancel: CancelToken,
    pub(crate) config: EngineConfig,
}

impl PageCore {
    /// Poll with page-level tick servicing: the dialog bridge is serviced
    /// before every tick (grace-period auto-dismissal), a closed page aborts
    /// the poll, and an unresolved dialog blocks the caller's predicate.
    pub(crate) fn poll<T, R, F, B>(
        &self,
        timeout: Duration,
        interval: Duration,
        blocked: B,
        mut tick: F,
    ) -> Result<PollSuccess<T>, PollError<R>>
    where
        R: std::fmt::Display,
        F: FnMut() -> PollOutcome<T, R>,
        B: Fn() -> R,
    {
        poll_until(timeout, interval, &self.cancel, |_| {
            self.dialogs.service(self.config.dialog_grace());
            if self.doc.is_closed() {
                return PollOutcome::Abort(EsperarError::PageClosed);
            }
            if self.dialogs.has_blocking() {
                return PollOutcome::Pending(blocked());
            }
            tick()
        })
    }
}

/// A live page under test.
///
/// Cloning is intentionally not provided: one test case, one page. The
/// host-side handles ([`Document`], [`NetworkMonitor`], [`DialogBridge`])
/// are cheaply cloneable and may be moved into spawned threads to simulate
/// concurrent page behavior.
#[derive(Debug)]
pub struct Page {
    id: Uuid,
    core: Arc<PageCore>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// Create a fresh page with default engine configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a fresh page with custom engine configuration
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(page = %id, "page created");
        Self {
            id,
            core: Arc::new(PageCore {
                doc: Document::new(),
                dialogs: DialogBridge::new(),
                network: NetworkMonitor::new(),
                cancel: CancelToken::new(),
                config,
            }),
        }
    }

    /// Unique page instance id
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Engine configuration defaults for this page
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// The live document, for host-side mutation
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.core.doc
    }

    /// The network monitor, for host-side request notifications
    #[must_use]
    pub fn network(&self) -> &NetworkMonitor {
        &self.core.network
    }

    /// The dialog bridge, for inspection of resolved dialogs
    #[must_use]
    pub fn dialog_bridge(&self) -> &DialogBridge {
        &self.core.dialogs
    }

    // =========================================================================
    // LOCATOR CONSTRUCTION
    // =========================================================================

    /// Locator from a CSS selector expression
    #[must_use]
    pub fn locator(&self, css: impl Into<String>) -> Locator {
        Locator::new(Arc::clone(&self.core), Selector::css(css))
    }

    /// Locator by ARIA role, optionally constrained by accessible name
    #[must_use]
    pub fn get_by_role(&self, role: impl Into<String>, name: Option<TextMatch>) -> Locator {
        Locator::new(Arc::clone(&self.core), Selector::role(role, name))
    }

    /// Locator by rendered text
    #[must_use]
    pub fn get_by_text(&self, text: impl Into<TextMatch>) -> Locator {
        Locator::new(Arc::clone(&self.core), Selector::text(text))
    }

    /// Locator by placeholder text
    #[must_use]
    pub fn get_by_placeholder(&self, text: impl Into<TextMatch>) -> Locator {
        Locator::new(Arc::clone(&self.core), Selector::placeholder(text))
    }

    /// Locator by test identifier
    #[must_use]
    pub fn get_by_test_id(&self, id: impl Into<String>) -> Locator {
        Locator::new(Arc::clone(&self.core), Selector::test_id(id))
    }

    // =========================================================================
    // DIALOGS
    // =========================================================================

    /// Register a persistent dialog handler
    pub fn on_dialog<F>(&self, handler: F)
    where
        F: Fn(&mut Dialog) + Send + Sync + 'static,
    {
        self.core.dialogs.on_dialog(handler);
    }

    /// Register a single-fire dialog handler
    pub fn once_dialog<F>(&self, handler: F)
    where
        F: Fn(&mut Dialog) + Send + Sync + 'static,
    {
        self.core.dialogs.once_dialog(handler);
    }

    /// Raise a native dialog from the page (host side)
    pub fn raise_dialog(&self, dialog: Dialog) {
        self.core.dialogs.raise(dialog);
    }

    // =========================================================================
    // WAITS AND LIFECYCLE
    // =========================================================================

    /// Wait until the network has been quiet for the configured window,
    /// using the default timeout
    pub fn wait_for_network_idle(&self) -> EsperarResult<()> {
        self.wait_for_network_idle_within(self.core.config.timeout())
    }

    /// Wait until the network has been quiet for the configured window,
    /// with a per-call timeout override
    pub fn wait_for_network_idle_within(&self, timeout: Duration) -> EsperarResult<()> {
        let quiet = self.core.config.network_quiet_window();
        let interval = self.core.config.poll_interval();
        let result = self.core.poll(
            timeout,
            interval,
            || "dialog open".to_string(),
            || {
                if self.core.network.is_idle(quiet) {
                    PollOutcome::Ready(())
                } else {
                    PollOutcome::Pending(self.core.network.describe())
                }
            },
        );
        match result {
            Ok(success) => {
                tracing::debug!(
                    elapsed_ms = success.elapsed.as_millis() as u64,
                    attempts = success.attempts,
                    "network idle"
                );
                Ok(())
            }
            Err(err) => Err(err.into_error(|last, elapsed| EsperarError::NetworkIdleTimeout {
                state: last.unwrap_or_else(|| "no tick ran".to_string()),
                elapsed_ms: elapsed.as_millis() as u64,
            })),
        }
    }

    /// Cancellation token governing every poll on this page
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.core.cancel.clone()
    }

    /// Abort the test case: any in-progress poll unwinds within one tick
    pub fn cancel(&self) {
        self.core.cancel.cancel();
    }

    /// Close the page. Dialog subscriptions are torn down and every
    /// subsequent engine operation fails with [`EsperarError::PageClosed`].
    pub fn close(&self) {
        self.core.dialogs.clear();
        self.core.doc.close();
        tracing::debug!(page = %self.id, "page closed");
    }
}

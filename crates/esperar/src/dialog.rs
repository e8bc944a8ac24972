//! Native dialog bridge.
//!
//! A native dialog (alert, confirm, prompt) blocks all page activity until
//! resolved. Handlers are registered as subscriptions, decoupled from the
//! call site of whatever action triggered the dialog; a dialog nobody
//! handles is auto-dismissed after a bounded grace period so a test case can
//! never hang on it. The poll loop services the bridge on every tick.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Type of native dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogType {
    /// Alert dialog (OK button only)
    Alert,
    /// Confirm dialog (OK/Cancel buttons)
    Confirm,
    /// Prompt dialog (text input + OK/Cancel)
    Prompt,
}

impl std::fmt::Display for DialogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alert => write!(f, "alert"),
            Self::Confirm => write!(f, "confirm"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// Resolution applied to a dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogAction {
    /// Accepted (OK)
    Accept,
    /// Accepted with input text (prompts)
    AcceptWith(String),
    /// Dismissed (Cancel)
    Dismiss,
    /// Not yet resolved
    Pending,
}

fn now() -> Instant {
    Instant::now()
}

/// A native dialog raised by the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialog {
    dialog_type: DialogType,
    message: String,
    default_value: Option<String>,
    action: DialogAction,
    #[serde(skip, default = "now")]
    raised_at: Instant,
}

impl Dialog {
    /// Create a dialog of the given type
    #[must_use]
    pub fn new(dialog_type: DialogType, message: impl Into<String>) -> Self {
        Self {
            dialog_type,
            message: message.into(),
            default_value: None,
            action: DialogAction::Pending,
            raised_at: Instant::now(),
        }
    }

    /// Create an alert dialog
    #[must_use]
    pub fn alert(message: impl Into<String>) -> Self {
        Self::new(DialogType::Alert, message)
    }

    /// Create a confirm dialog
    #[must_use]
    pub fn confirm(message: impl Into<String>) -> Self {
        Self::new(DialogType::Confirm, message)
    }

    /// Create a prompt dialog with an optional default value
    #[must_use]
    pub fn prompt(message: impl Into<String>, default: Option<String>) -> Self {
        let mut dialog = Self::new(DialogType::Prompt, message);
        dialog.default_value = default;
        dialog
    }

    /// Dialog type
    #[must_use]
    pub const fn dialog_type(&self) -> DialogType {
        self.dialog_type
    }

    /// Message text
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Default value (prompts)
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Resolution applied so far
    #[must_use]
    pub const fn action(&self) -> &DialogAction {
        &self.action
    }

    /// Whether the dialog has been resolved
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        !matches!(self.action, DialogAction::Pending)
    }

    /// How long the dialog has been open
    #[must_use]
    pub fn age(&self) -> Duration {
        self.raised_at.elapsed()
    }

    /// Accept the dialog
    pub fn accept(&mut self) {
        self.action = DialogAction::Accept;
    }

    /// Accept with input text (prompts)
    pub fn accept_with(&mut self, text: impl Into<String>) {
        self.action = DialogAction::AcceptWith(text.into());
    }

    /// Dismiss the dialog
    pub fn dismiss(&mut self) {
        self.action = DialogAction::Dismiss;
    }
}

/// Handler function type for dialog subscriptions
pub type DialogHandlerFn = Box<dyn Fn(&mut Dialog) + Send + Sync>;

struct Subscription {
    persistent: bool,
    handler: DialogHandlerFn,
}

#[derive(Default)]
struct BridgeInner {
    subscriptions: Vec<Subscription>,
    pending: Vec<Dialog>,
    history: Vec<Dialog>,
    auto_dismissed: usize,
}

impl BridgeInner {
    /// Run the front subscription against `dialog`. Single-fire
    /// subscriptions are consumed. Returns whether the dialog got resolved.
    fn deliver(&mut self, dialog: &mut Dialog) -> bool {
        if self.subscriptions.is_empty() {
            return false;
        }
        let subscription = self.subscriptions.remove(0);
        (subscription.handler)(dialog);
        if subscription.persistent {
            self.subscriptions.insert(0, subscription);
        }
        dialog.is_handled()
    }
}

/// Subscription bridge between the page's dialog events and test handlers.
///
/// Lifecycle-bound to the page; torn down with it.
#[derive(Clone, Default)]
pub struct DialogBridge {
    inner: Arc<Mutex<BridgeInner>>,
}

impl DialogBridge {
    /// Create an empty bridge
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent handler: invoked for every dialog until the
    /// page is torn down
    pub fn on_dialog<F>(&self, handler: F)
    where
        F: Fn(&mut Dialog) + Send + Sync + 'static,
    {
        self.subscribe(true, handler);
    }

    /// Register a single-fire handler: auto-deregisters after its first
    /// invocation
    pub fn once_dialog<F>(&self, handler: F)
    where
        F: Fn(&mut Dialog) + Send + Sync + 'static,
    {
        self.subscribe(false, handler);
    }

    fn subscribe<F>(&self, persistent: bool, handler: F)
    where
        F: Fn(&mut Dialog) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        inner.subscriptions.push(Subscription {
            persistent,
            handler: Box::new(handler),
        });
        // A dialog may already be waiting; drain what the new handler can take.
        let mut still_pending = Vec::new();
        let pending = std::mem::take(&mut inner.pending);
        for mut dialog in pending {
            if inner.deliver(&mut dialog) {
                inner.history.push(dialog);
            } else {
                still_pending.push(dialog);
            }
        }
        inner.pending = still_pending;
    }

    /// Raise a dialog from the page. Delivered to the front subscription if
    /// one exists; otherwise it stays pending and blocks page activity until
    /// handled or auto-dismissed.
    pub fn raise(&self, mut dialog: Dialog) {
        let mut inner = self.lock();
        if inner.deliver(&mut dialog) {
            inner.history.push(dialog);
        } else {
            inner.pending.push(dialog);
        }
    }

    /// Service the bridge: auto-dismiss pending dialogs older than `grace`.
    /// Called by the poll loop on every tick. Returns how many dialogs were
    /// dismissed.
    pub fn service(&self, grace: Duration) -> usize {
        let mut inner = self.lock();
        let mut dismissed = 0;
        let mut still_pending = Vec::new();
        let pending = std::mem::take(&mut inner.pending);
        for mut dialog in pending {
            if dialog.age() >= grace {
                tracing::warn!(
                    dialog_type = %dialog.dialog_type(),
                    message = dialog.message(),
                    "unhandled dialog auto-dismissed after grace period"
                );
                dialog.dismiss();
                inner.auto_dismissed += 1;
                inner.history.push(dialog);
                dismissed += 1;
            } else {
                still_pending.push(dialog);
            }
        }
        inner.pending = still_pending;
        dismissed
    }

    /// Whether an unresolved dialog is currently blocking page activity
    #[must_use]
    pub fn has_blocking(&self) -> bool {
        !self.lock().pending.is_empty()
    }

    /// All resolved dialogs, in resolution order
    #[must_use]
    pub fn history(&self) -> Vec<Dialog> {
        self.lock().history.clone()
    }

    /// Number of resolved dialogs
    #[must_use]
    pub fn dialog_count(&self) -> usize {
        self.lock().history.len()
    }

    /// Number of dialogs that were auto-dismissed after the grace period
    #[must_use]
    pub fn auto_dismissed_count(&self) -> usize {
        self.lock().auto_dismissed
    }

    /// Tear down: drop subscriptions and queues with the page
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.subscriptions.clear();
        inner.pending.clear();
        inner.history.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BridgeInner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for DialogBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("DialogBridge")
            .field("subscriptions", &inner.subscriptions.len())
            .field("pending", &inner.pending.len())
            .field("history", &inner.history.len())
            .finish_non_exhaustive()
    }
}

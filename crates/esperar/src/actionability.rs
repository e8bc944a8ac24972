//! Actionability probing.
//!
//! Before an interactive action runs, the prober polls the live element set
//! until the element satisfies the action's required conditions on a single
//! tick. Layout stability is judged across two consecutive ticks, so the
//! prober carries a little state between evaluations; everything else is
//! recomputed fresh each tick.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::dom::{BoundingBox, ElementState};
use crate::poll::PollOutcome;
use crate::result::EsperarError;

// =============================================================================
// CONDITIONS
// =============================================================================

/// One actionability condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Element is present in the document
    Attached,
    /// Element is rendered visible
    Visible,
    /// Bounding box unchanged across two consecutive polls
    Stable,
    /// Element is enabled
    Enabled,
    /// Element accepts text input
    Editable,
    /// Pointer events reach the element
    ReceivesEvents,
}

impl Condition {
    /// The condition's name, as used in error messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Attached => "attached",
            Self::Visible => "visible",
            Self::Stable => "stable",
            Self::Enabled => "enabled",
            Self::Editable => "editable",
            Self::ReceivesEvents => "receives-events",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// The interactive action classes, each with its required condition set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// click
    Click,
    /// fill, clear, select_option
    Fill,
    /// check, uncheck
    Check,
    /// drag source or drop target
    Drag,
    /// read-only value extraction
    Read,
}

impl Action {
    /// The action's name for error messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Fill => "fill",
            Self::Check => "check",
            Self::Drag => "drag",
            Self::Read => "read",
        }
    }

    /// Conditions that must all hold simultaneously on one tick, in the
    /// order they are reported when unsatisfied
    #[must_use]
    pub const fn required(&self) -> &'static [Condition] {
        use Condition::{Attached, Editable, Enabled, ReceivesEvents, Stable, Visible};
        match self {
            Self::Click | Self::Check | Self::Drag => {
                &[Attached, Visible, Stable, Enabled, ReceivesEvents]
            }
            Self::Fill => &[Attached, Visible, Stable, Enabled, Editable],
            Self::Read => &[Attached],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// STATE SNAPSHOT
// =============================================================================

/// Actionability snapshot for one element on one tick.
///
/// Recomputed every poll tick; never cached across ticks because the page
/// mutates concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionabilityState {
    /// Present in the document
    pub attached: bool,
    /// Rendered visible
    pub visible: bool,
    /// Bounding box unchanged since the previous tick
    pub stable: bool,
    /// Enabled
    pub enabled: bool,
    /// Accepts text input
    pub editable: bool,
    /// Pointer events reach it
    pub receives_events: bool,
}

impl ActionabilityState {
    /// Snapshot an attached element. `stable` comes from the prober's
    /// cross-tick bounding-box comparison.
    #[must_use]
    pub const fn of(el: &ElementState, stable: bool) -> Self {
        Self {
            attached: true,
            visible: el.visible,
            stable,
            enabled: el.enabled,
            editable: el.editable,
            receives_events: el.receives_events,
        }
    }

    /// The all-false snapshot of a detached element
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            attached: false,
            visible: false,
            stable: false,
            enabled: false,
            editable: false,
            receives_events: false,
        }
    }

    /// Whether one condition holds
    #[must_use]
    pub const fn satisfies(&self, condition: Condition) -> bool {
        match condition {
            Condition::Attached => self.attached,
            Condition::Visible => self.visible,
            Condition::Stable => self.stable,
            Condition::Enabled => self.enabled,
            Condition::Editable => self.editable,
            Condition::ReceivesEvents => self.receives_events,
        }
    }

    /// First unsatisfied condition from `required`, in table order
    #[must_use]
    pub fn first_unsatisfied(&self, required: &[Condition]) -> Option<Condition> {
        required.iter().copied().find(|c| !self.satisfies(*c))
    }

    /// Slash-separated list of the conditions that currently hold, for
    /// diagnostic messages ("attached/stable/enabled")
    #[must_use]
    pub fn summary(&self) -> String {
        const ALL: [Condition; 6] = [
            Condition::Attached,
            Condition::Visible,
            Condition::Stable,
            Condition::Enabled,
            Condition::Editable,
            Condition::ReceivesEvents,
        ];
        let held: Vec<&str> = ALL
            .iter()
            .filter(|c| self.satisfies(**c))
            .map(|c| c.name())
            .collect();
        if held.is_empty() {
            "detached".to_string()
        } else {
            held.join("/")
        }
    }
}

// =============================================================================
// PROBER
// =============================================================================

/// Why a probe tick did not succeed
#[derive(Debug, Clone)]
pub enum ProbeFailure {
    /// No element matched the selector this tick
    NoMatch,
    /// More than one element matched when exactly one was required
    Ambiguous {
        /// Number of matching elements
        count: usize,
    },
    /// The element resolved on a previous tick has disappeared
    Detached,
    /// The element is attached but a required condition is unsatisfied
    NotYet {
        /// First unsatisfied condition in table order
        condition: Condition,
        /// Full snapshot for the diagnostic message
        state: ActionabilityState,
    },
    /// An unresolved native dialog is blocking all page activity
    DialogOpen,
    /// The element is actionable but the requested select option is absent
    OptionMissing {
        /// The requested option label or value
        option: String,
    },
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatch => write!(f, "no matching element"),
            Self::Ambiguous { count } => write!(f, "{count} elements matched"),
            Self::Detached => write!(f, "element detached"),
            Self::NotYet { condition, state } => {
                write!(f, "not {condition} (currently {})", state.summary())
            }
            Self::DialogOpen => write!(f, "dialog open"),
            Self::OptionMissing { option } => write!(f, "option {option:?} not present"),
        }
    }
}

/// Per-action readiness prober.
///
/// One prober instance lives for the duration of one poll loop; it holds the
/// previous tick's bounding box so stability can be judged. A detached or
/// replaced element resets that state and resolution starts from scratch on
/// the next tick.
#[derive(Debug)]
pub struct Prober {
    action: Action,
    last_box: Option<(u64, BoundingBox)>,
}

impl Prober {
    /// Create a prober for one action
    #[must_use]
    pub const fn new(action: Action) -> Self {
        Self {
            action,
            last_box: None,
        }
    }

    /// Evaluate one tick against the freshly resolved candidate set
    pub fn evaluate(&mut self, candidates: &[ElementState]) -> PollOutcome<ElementState, ProbeFailure> {
        match candidates {
            [] => {
                let was_tracking = self.last_box.take().is_some();
                if was_tracking {
                    PollOutcome::Pending(ProbeFailure::Detached)
                } else {
                    PollOutcome::Pending(ProbeFailure::NoMatch)
                }
            }
            [el] => {
                let stable = self.last_box == Some((el.id, el.bounding_box));
                self.last_box = Some((el.id, el.bounding_box));
                let state = ActionabilityState::of(el, stable);
                match state.first_unsatisfied(self.action.required()) {
                    Some(condition) => {
                        PollOutcome::Pending(ProbeFailure::NotYet { condition, state })
                    }
                    None => PollOutcome::Ready(el.clone()),
                }
            }
            many => {
                self.last_box = None;
                PollOutcome::Pending(ProbeFailure::Ambiguous { count: many.len() })
            }
        }
    }
}

/// Map a probe timeout into the matching error variant
#[must_use]
pub(crate) fn timeout_error(
    last: Option<ProbeFailure>,
    selector: &str,
    action: Action,
    elapsed: Duration,
) -> EsperarError {
    let elapsed_ms = elapsed.as_millis() as u64;
    match last {
        None | Some(ProbeFailure::NoMatch) => EsperarError::NotFound {
            selector: selector.to_string(),
            count: 0,
            elapsed_ms,
        },
        Some(ProbeFailure::Ambiguous { count }) => EsperarError::NotFound {
            selector: selector.to_string(),
            count,
            elapsed_ms,
        },
        Some(ProbeFailure::Detached) => EsperarError::ActionabilityTimeout {
            selector: selector.to_string(),
            action: action.name().to_string(),
            condition: Condition::Attached.name().to_string(),
            state: "detached".to_string(),
            elapsed_ms,
        },
        Some(ProbeFailure::NotYet { condition, state }) => EsperarError::ActionabilityTimeout {
            selector: selector.to_string(),
            action: action.name().to_string(),
            condition: condition.name().to_string(),
            state: state.summary(),
            elapsed_ms,
        },
        Some(ProbeFailure::DialogOpen) => EsperarError::ActionabilityTimeout {
            selector: selector.to_string(),
            action: action.name().to_string(),
            condition: Condition::ReceivesEvents.name().to_string(),
            state: "blocked by open dialog".to_string(),
            elapsed_ms,
        },
        Some(ProbeFailure::OptionMissing { option }) => EsperarError::OptionNotFound {
            selector: selector.to_string(),
            option,
        },
    }
}

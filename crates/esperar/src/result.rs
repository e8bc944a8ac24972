//! Result and error types for Esperar.

use thiserror::Error;

/// Result type for Esperar operations
pub type EsperarResult<T> = Result<T, EsperarError>;

/// Errors that can occur in Esperar
#[derive(Debug, Error)]
pub enum EsperarError {
    /// Locator resolved to an unexpected cardinality when exactly one
    /// element was required
    #[error("No unique element for {selector}: {count} element(s) matched after {elapsed_ms}ms")]
    NotFound {
        /// Selector description
        selector: String,
        /// Number of elements observed on the last poll attempt
        count: usize,
        /// Time spent waiting
        elapsed_ms: u64,
    },

    /// An element never became actionable within the timeout
    #[error(
        "Timed out waiting for {selector} to be {condition} for {action} after {elapsed_ms}ms (last observed: {state})"
    )]
    ActionabilityTimeout {
        /// Selector description
        selector: String,
        /// The action that was blocked
        action: String,
        /// First unsatisfied condition, in table order
        condition: String,
        /// Last observed actionability snapshot
        state: String,
        /// Time spent waiting
        elapsed_ms: u64,
    },

    /// A retried assertion never passed within the timeout
    #[error("Assertion {matcher} on {locator} failed after {elapsed_ms}ms: expected {expected}, last saw {actual}")]
    AssertionTimeout {
        /// Matcher name (e.g. `to_be_visible`)
        matcher: String,
        /// Locator description
        locator: String,
        /// Expected state description
        expected: String,
        /// Last observed actual state
        actual: String,
        /// Time spent retrying
        elapsed_ms: u64,
    },

    /// The network never stayed quiet for the full window within the timeout
    #[error("Timed out waiting for network idle after {elapsed_ms}ms (last observed: {state})")]
    NetworkIdleTimeout {
        /// Last observed network state
        state: String,
        /// Time spent waiting
        elapsed_ms: u64,
    },

    /// A native dialog was never handled and had to be auto-dismissed
    #[error("Dialog auto-dismissed after grace period: {message}")]
    DialogUnhandled {
        /// The dialog's message text
        message: String,
    },

    /// The governing test case was cancelled while a poll was in progress
    #[error("Operation cancelled after {elapsed_ms}ms")]
    Cancelled {
        /// Time spent before cancellation was observed
        elapsed_ms: u64,
    },

    /// The page crashed or was closed underneath the engine
    #[error("Page closed or crashed")]
    PageClosed,

    /// A requested select option does not exist on the element
    #[error("No option {option:?} on {selector}")]
    OptionNotFound {
        /// Selector description
        selector: String,
        /// The requested option label or value
        option: String,
    },

    /// JSON error (failure report serialization)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = EsperarError::NotFound {
            selector: "#missing".into(),
            count: 0,
            elapsed_ms: 5000,
        };
        let msg = format!("{err}");
        assert!(msg.contains("#missing"));
        assert!(msg.contains("0 element(s)"));
        assert!(msg.contains("5000ms"));
    }

    #[test]
    fn test_actionability_timeout_names_condition() {
        let err = EsperarError::ActionabilityTimeout {
            selector: "#target".into(),
            action: "click".into(),
            condition: "visible".into(),
            state: "attached/stable/enabled".into(),
            elapsed_ms: 5000,
        };
        let msg = format!("{err}");
        assert!(msg.contains("visible"));
        assert!(msg.contains("click"));
        assert!(msg.contains("attached/stable/enabled"));
    }

    #[test]
    fn test_assertion_timeout_carries_actual() {
        let err = EsperarError::AssertionTimeout {
            matcher: "to_be_visible".into(),
            locator: "#target".into(),
            expected: "visible".into(),
            actual: "hidden".into(),
            elapsed_ms: 6000,
        };
        let msg = format!("{err}");
        assert!(msg.contains("expected visible"));
        assert!(msg.contains("last saw hidden"));
    }

    #[test]
    fn test_cancelled_display() {
        let err = EsperarError::Cancelled { elapsed_ms: 120 };
        assert!(format!("{err}").contains("cancelled"));
    }
}

//! Retrying assertions over locators.
//!
//! Every matcher is a pure predicate over the freshly resolved candidate
//! set; no matcher polls on its own. All retry logic is centralized in the
//! poll engine, so a matcher satisfied on tick *k* returns at tick *k*'s
//! true elapsed time, and a matcher that never passes fails with the last
//! observed actual state.

pub mod soft;

use std::fmt;
use std::time::Duration;

use crate::dom::ElementState;
use crate::locator::Locator;
use crate::poll::{PollError, PollOutcome};
use crate::result::{EsperarError, EsperarResult};
use crate::selector::TextMatch;
use soft::AssertionFailure;

// =============================================================================
// MATCHERS
// =============================================================================

/// Verdict of one matcher evaluation against one resolved candidate set
#[derive(Debug, Clone)]
pub enum Verdict {
    /// The matcher is satisfied
    Pass,
    /// The matcher is not satisfied; `actual` describes what was observed
    Fail {
        /// Observed state for the diagnostic message
        actual: String,
    },
}

impl Verdict {
    fn fail(actual: impl Into<String>) -> Self {
        Self::Fail {
            actual: actual.into(),
        }
    }
}

/// A retryable assertion predicate
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Element is visible
    Visible,
    /// Element is hidden or absent
    Hidden,
    /// Element is checked
    Checked,
    /// Element is disabled
    Disabled,
    /// Element text matches
    HasText(TextMatch),
    /// Element text contains a substring
    ContainsText(String),
    /// Element value equals
    HasValue(String),
    /// Element has an attribute, optionally with an exact value
    HasAttribute {
        /// Attribute name
        name: String,
        /// Required value; `None` checks presence only
        expected: Option<String>,
    },
    /// Candidate count equals
    HasCount(usize),
}

impl Matcher {
    /// The matcher's name, as it appears in failure messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Visible => "to_be_visible",
            Self::Hidden => "to_be_hidden",
            Self::Checked => "to_be_checked",
            Self::Disabled => "to_be_disabled",
            Self::HasText(_) => "to_have_text",
            Self::ContainsText(_) => "to_contain_text",
            Self::HasValue(_) => "to_have_value",
            Self::HasAttribute { .. } => "to_have_attribute",
            Self::HasCount(_) => "to_have_count",
        }
    }

    /// Describe the expected state for failure messages
    #[must_use]
    pub fn expected_description(&self) -> String {
        match self {
            Self::Visible => "visible".to_string(),
            Self::Hidden => "hidden".to_string(),
            Self::Checked => "checked".to_string(),
            Self::Disabled => "disabled".to_string(),
            Self::HasText(text) => format!("text{text}"),
            Self::ContainsText(text) => format!("text containing {text:?}"),
            Self::HasValue(value) => format!("value {value:?}"),
            Self::HasAttribute {
                name,
                expected: Some(value),
            } => format!("attribute {name}={value:?}"),
            Self::HasAttribute {
                name,
                expected: None,
            } => format!("attribute {name} present"),
            Self::HasCount(count) => format!("count {count}"),
        }
    }

    /// Evaluate against one tick's resolved candidates. Pure: performs no
    /// waiting and touches no shared state.
    #[must_use]
    pub fn evaluate(&self, candidates: &[ElementState]) -> Verdict {
        match self {
            Self::Hidden => match candidates {
                [] => Verdict::Pass,
                [el] if !el.visible => Verdict::Pass,
                [_] => Verdict::fail("visible"),
                many => Verdict::fail(format!("{} elements matched", many.len())),
            },
            Self::HasCount(expected) => {
                if candidates.len() == *expected {
                    Verdict::Pass
                } else {
                    Verdict::fail(format!("count {}", candidates.len()))
                }
            }
            _ => match Self::single(candidates) {
                Err(actual) => Verdict::fail(actual),
                Ok(el) => self.evaluate_one(el),
            },
        }
    }

    fn single(candidates: &[ElementState]) -> Result<&ElementState, String> {
        match candidates {
            [] => Err("no matching element".to_string()),
            [el] => Ok(el),
            many => Err(format!("{} elements matched", many.len())),
        }
    }

    fn evaluate_one(&self, el: &ElementState) -> Verdict {
        match self {
            Self::Visible => {
                if el.visible {
                    Verdict::Pass
                } else {
                    Verdict::fail("hidden")
                }
            }
            Self::Checked => {
                if el.checked {
                    Verdict::Pass
                } else {
                    Verdict::fail("unchecked")
                }
            }
            Self::Disabled => {
                if el.enabled {
                    Verdict::fail("enabled")
                } else {
                    Verdict::Pass
                }
            }
            Self::HasText(text) => {
                if text.matches(&el.text) {
                    Verdict::Pass
                } else {
                    Verdict::fail(format!("text {:?}", el.text))
                }
            }
            Self::ContainsText(text) => {
                if el.text.contains(text.as_str()) {
                    Verdict::Pass
                } else {
                    Verdict::fail(format!("text {:?}", el.text))
                }
            }
            Self::HasValue(value) => {
                if el.value == *value {
                    Verdict::Pass
                } else {
                    Verdict::fail(format!("value {:?}", el.value))
                }
            }
            Self::HasAttribute { name, expected } => match (el.attribute(name), expected) {
                (None, _) => Verdict::fail(format!("attribute {name} absent")),
                (Some(_), None) => Verdict::Pass,
                (Some(actual), Some(value)) => {
                    if actual == *value {
                        Verdict::Pass
                    } else {
                        Verdict::fail(format!("attribute {name}={actual:?}"))
                    }
                }
            },
            // Handled in evaluate()
            Self::Hidden | Self::HasCount(_) => Verdict::Pass,
        }
    }
}

// =============================================================================
// EXPECT
// =============================================================================

/// Reason a matcher tick did not pass
struct MatchFailure {
    actual: String,
}

impl fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.actual)
    }
}

/// Outcome of running one matcher to completion
pub(crate) enum RunFailure {
    /// The matcher timed out; hard path raises, soft path records
    Assertion(AssertionFailure),
    /// Cancellation or page loss; always raises, never recorded as soft
    Fatal(EsperarError),
}

/// Retrying assertion builder for a locator (hard mode).
///
/// Obtained from [`expect`]. On timeout the assertion raises
/// [`EsperarError::AssertionTimeout`], aborting the current test case; the
/// soft variant lives on [`soft::SoftAssertions`].
#[derive(Debug, Clone)]
pub struct Expect<'a> {
    locator: &'a Locator,
    timeout: Option<Duration>,
    poll_interval: Option<Duration>,
}

/// Create a retrying expectation for a locator
#[must_use]
pub fn expect(locator: &Locator) -> Expect<'_> {
    Expect {
        locator,
        timeout: None,
        poll_interval: None,
    }
}

impl Expect<'_> {
    /// Override the timeout for this assertion
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the polling interval for this assertion
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Assert the element is visible
    pub fn to_be_visible(&self) -> EsperarResult<()> {
        self.hard(Matcher::Visible)
    }

    /// Assert the element is hidden or absent
    pub fn to_be_hidden(&self) -> EsperarResult<()> {
        self.hard(Matcher::Hidden)
    }

    /// Assert the element is checked
    pub fn to_be_checked(&self) -> EsperarResult<()> {
        self.hard(Matcher::Checked)
    }

    /// Assert the element is disabled
    pub fn to_be_disabled(&self) -> EsperarResult<()> {
        self.hard(Matcher::Disabled)
    }

    /// Assert the element's text matches (exact, substring, or pattern via
    /// [`TextMatch`])
    pub fn to_have_text(&self, text: impl Into<TextMatch>) -> EsperarResult<()> {
        self.hard(Matcher::HasText(text.into()))
    }

    /// Assert the element's text contains a substring
    pub fn to_contain_text(&self, text: impl Into<String>) -> EsperarResult<()> {
        self.hard(Matcher::ContainsText(text.into()))
    }

    /// Assert the element's value equals
    pub fn to_have_value(&self, value: impl Into<String>) -> EsperarResult<()> {
        self.hard(Matcher::HasValue(value.into()))
    }

    /// Assert the element carries an attribute with the given value
    pub fn to_have_attribute(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> EsperarResult<()> {
        self.hard(Matcher::HasAttribute {
            name: name.into(),
            expected: Some(value.into()),
        })
    }

    /// Assert the candidate count equals
    pub fn to_have_count(&self, count: usize) -> EsperarResult<()> {
        self.hard(Matcher::HasCount(count))
    }

    fn hard(&self, matcher: Matcher) -> EsperarResult<()> {
        match self.run(matcher) {
            Ok(()) => Ok(()),
            Err(RunFailure::Assertion(failure)) => Err(failure.into_hard_error()),
            Err(RunFailure::Fatal(err)) => Err(err),
        }
    }

    /// Run a matcher through the poll engine. Shared by the hard and soft
    /// paths; only what happens to the failure differs.
    pub(crate) fn run(&self, matcher: Matcher) -> Result<(), RunFailure> {
        let timeout = self
            .timeout
            .unwrap_or_else(|| self.locator.effective_timeout());
        let interval = self
            .poll_interval
            .unwrap_or_else(|| self.locator.effective_interval());

        let result = self.locator.core().poll(
            timeout,
            interval,
            || MatchFailure {
                actual: "dialog open".to_string(),
            },
            || match self.locator.resolve_now() {
                Err(err) => PollOutcome::Abort(err),
                Ok(candidates) => match matcher.evaluate(&candidates) {
                    Verdict::Pass => PollOutcome::Ready(()),
                    Verdict::Fail { actual } => PollOutcome::Pending(MatchFailure { actual }),
                },
            },
        );

        match result {
            Ok(success) => {
                tracing::debug!(
                    locator = %self.locator.description(),
                    matcher = matcher.name(),
                    attempts = success.attempts,
                    elapsed_ms = success.elapsed.as_millis() as u64,
                    "assertion passed"
                );
                Ok(())
            }
            Err(PollError::Timeout { last, elapsed, .. }) => {
                Err(RunFailure::Assertion(AssertionFailure::new(
                    matcher.name(),
                    matcher.expected_description(),
                    last.map_or_else(|| "never evaluated".to_string(), |f| f.actual),
                    self.locator.description(),
                    elapsed,
                )))
            }
            Err(PollError::Cancelled { elapsed }) => {
                Err(RunFailure::Fatal(EsperarError::Cancelled {
                    elapsed_ms: elapsed.as_millis() as u64,
                }))
            }
            Err(PollError::Aborted(err)) => Err(RunFailure::Fatal(err)),
        }
    }
}

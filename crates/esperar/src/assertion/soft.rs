//! Soft assertions.
//!
//! A soft assertion evaluates exactly like a hard one — same matchers, same
//! retry loop — but a timeout records the failure into the test case's
//! accumulator and returns control to the caller instead of unwinding. At
//! test-case completion, a non-empty accumulator fails the test case,
//! reporting every failure in recorded order, not just the first.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::{Duration, Instant};

use crate::assertion::{expect, Matcher, RunFailure};
use crate::locator::Locator;
use crate::result::{EsperarError, EsperarResult};
use crate::selector::TextMatch;

/// Whether a failure aborted its test case or was deferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Raised immediately; the test case stopped at this assertion
    Hard,
    /// Recorded and deferred to test-case completion
    Soft,
}

/// A single assertion failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionFailure {
    /// Hard or soft
    pub kind: FailureKind,
    /// Matcher name
    pub matcher: String,
    /// Expected state description
    pub expected: String,
    /// Last observed actual state
    pub actual: String,
    /// Full rendered message
    pub message: String,
    /// Locator description
    pub locator: String,
    /// Time spent retrying before the failure
    pub elapsed_ms: u64,
    /// When the failure was recorded
    #[serde(skip)]
    pub timestamp: Option<Instant>,
    /// Position in the test case's failure sequence
    pub index: usize,
}

impl AssertionFailure {
    /// Build a failure from a timed-out matcher run. Kind defaults to
    /// `Hard`; the soft path re-tags it when recording.
    #[must_use]
    pub(crate) fn new(
        matcher: &str,
        expected: String,
        actual: String,
        locator: String,
        elapsed: Duration,
    ) -> Self {
        let elapsed_ms = elapsed.as_millis() as u64;
        let message =
            format!("{matcher} on {locator}: expected {expected}, last saw {actual} after {elapsed_ms}ms");
        Self {
            kind: FailureKind::Hard,
            matcher: matcher.to_string(),
            expected,
            actual,
            message,
            locator,
            elapsed_ms,
            timestamp: Some(Instant::now()),
            index: 0,
        }
    }

    /// Convert into the test-aborting error form
    #[must_use]
    pub fn into_hard_error(self) -> EsperarError {
        EsperarError::AssertionTimeout {
            matcher: self.matcher,
            locator: self.locator,
            expected: self.expected,
            actual: self.actual,
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Summary of a test case's assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionSummary {
    /// Total assertions checked
    pub total: usize,
    /// Assertions that passed
    pub passed: usize,
    /// Assertions that failed
    pub failed: usize,
}

/// Per-test-case soft failure accumulator.
///
/// The external test runner creates one per test case and calls
/// [`SoftAssertions::verify`] at completion.
#[derive(Debug, Default)]
pub struct SoftAssertions {
    failures: Vec<AssertionFailure>,
    assertion_count: usize,
}

impl SoftAssertions {
    /// Create an empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a soft expectation on a locator
    pub fn expect<'a>(&'a mut self, locator: &'a Locator) -> SoftExpect<'a> {
        SoftExpect {
            soft: self,
            locator,
            timeout: None,
            poll_interval: None,
        }
    }

    /// Soft-compare two values (for reads extracted earlier in the test)
    pub fn assert_eq<T: PartialEq + Debug>(&mut self, actual: &T, expected: &T, message: &str) {
        self.assertion_count += 1;
        if actual != expected {
            self.record_value_failure(
                "assert_eq",
                format!("{expected:?}"),
                format!("{actual:?}"),
                message,
            );
        }
    }

    /// Soft-assert a condition
    pub fn assert_true(&mut self, condition: bool, message: &str) {
        self.assertion_count += 1;
        if !condition {
            self.record_value_failure("assert_true", "true".to_string(), "false".to_string(), message);
        }
    }

    /// Record a custom failure
    pub fn fail(&mut self, message: impl Into<String>) {
        self.assertion_count += 1;
        let message = message.into();
        self.record_value_failure("fail", String::new(), String::new(), &message);
    }

    fn record_value_failure(&mut self, matcher: &str, expected: String, actual: String, message: &str) {
        let mut failure =
            AssertionFailure::new(matcher, expected, actual, "<value>".to_string(), Duration::ZERO);
        failure.message = message.to_string();
        self.record(failure);
    }

    /// Record a failure, tagging it soft and sequencing it
    pub(crate) fn record(&mut self, mut failure: AssertionFailure) {
        failure.kind = FailureKind::Soft;
        failure.index = self.failures.len();
        tracing::debug!(message = failure.message, "soft assertion failure recorded");
        self.failures.push(failure);
    }

    pub(crate) fn count_assertion(&mut self) {
        self.assertion_count += 1;
    }

    /// All recorded failures, in order
    #[must_use]
    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    /// Number of recorded failures
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Total assertions checked through this accumulator
    #[must_use]
    pub const fn assertion_count(&self) -> usize {
        self.assertion_count
    }

    /// Whether every assertion passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Verdict at test-case completion: `Err` listing every failure if any
    /// assertion failed.
    pub fn verify(&self) -> Result<(), SoftAssertionError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(SoftAssertionError::new(&self.failures))
        }
    }

    /// Summary of the assertions checked so far
    #[must_use]
    pub fn summary(&self) -> AssertionSummary {
        AssertionSummary {
            total: self.assertion_count,
            passed: self.assertion_count - self.failures.len(),
            failed: self.failures.len(),
        }
    }

    /// Serialize the failure list for an external reporter
    pub fn to_json(&self) -> EsperarResult<String> {
        Ok(serde_json::to_string_pretty(&self.failures)?)
    }

    /// Reset between test cases
    pub fn clear(&mut self) {
        self.failures.clear();
        self.assertion_count = 0;
    }
}

/// Error aggregating every soft failure of a test case
#[derive(Debug, Clone)]
pub struct SoftAssertionError {
    /// All failure messages, in recorded order
    pub failures: Vec<String>,
    /// Number of failed assertions
    pub count: usize,
}

impl SoftAssertionError {
    /// Create from the recorded failures
    #[must_use]
    pub fn new(failures: &[AssertionFailure]) -> Self {
        Self {
            failures: failures.iter().map(|f| f.message.clone()).collect(),
            count: failures.len(),
        }
    }
}

impl std::fmt::Display for SoftAssertionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} soft assertion(s) failed:", self.count)?;
        for (i, failure) in self.failures.iter().enumerate() {
            writeln!(f, "  {}. {failure}", i + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for SoftAssertionError {}

/// Soft expectation builder.
///
/// Matcher methods return `Ok(())` even when the assertion times out — the
/// failure is recorded instead. Only cancellation or page loss surfaces as
/// `Err`, since those must still unwind the test case.
#[derive(Debug)]
pub struct SoftExpect<'a> {
    soft: &'a mut SoftAssertions,
    locator: &'a Locator,
    timeout: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl SoftExpect<'_> {
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

    /// Soft-assert the element is visible
    pub fn to_be_visible(self) -> EsperarResult<()> {
        self.finish(Matcher::Visible)
    }

    /// Soft-assert the element is hidden or absent
    pub fn to_be_hidden(self) -> EsperarResult<()> {
        self.finish(Matcher::Hidden)
    }

    /// Soft-assert the element is checked
    pub fn to_be_checked(self) -> EsperarResult<()> {
        self.finish(Matcher::Checked)
    }

    /// Soft-assert the element is disabled
    pub fn to_be_disabled(self) -> EsperarResult<()> {
        self.finish(Matcher::Disabled)
    }

    /// Soft-assert the element's text matches
    pub fn to_have_text(self, text: impl Into<TextMatch>) -> EsperarResult<()> {
        self.finish(Matcher::HasText(text.into()))
    }

    /// Soft-assert the element's text contains a substring
    pub fn to_contain_text(self, text: impl Into<String>) -> EsperarResult<()> {
        self.finish(Matcher::ContainsText(text.into()))
    }

    /// Soft-assert the element's value equals
    pub fn to_have_value(self, value: impl Into<String>) -> EsperarResult<()> {
        self.finish(Matcher::HasValue(value.into()))
    }

    /// Soft-assert the element carries an attribute with the given value
    pub fn to_have_attribute(
        self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> EsperarResult<()> {
        self.finish(Matcher::HasAttribute {
            name: name.into(),
            expected: Some(value.into()),
        })
    }

    /// Soft-assert the candidate count equals
    pub fn to_have_count(self, count: usize) -> EsperarResult<()> {
        self.finish(Matcher::HasCount(count))
    }

    fn finish(self, matcher: Matcher) -> EsperarResult<()> {
        self.soft.count_assertion();
        let mut runner = expect(self.locator);
        if let Some(timeout) = self.timeout {
            runner = runner.with_timeout(timeout);
        }
        if let Some(interval) = self.poll_interval {
            runner = runner.with_poll_interval(interval);
        }
        match runner.run(matcher) {
            Ok(()) => Ok(()),
            Err(RunFailure::Assertion(failure)) => {
                self.soft.record(failure);
                Ok(())
            }
            Err(RunFailure::Fatal(err)) => Err(err),
        }
    }
}

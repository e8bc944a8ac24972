//! Locator abstraction for element selection and interaction.
//!
//! A locator is an inert, re-evaluatable description: selector expression
//! plus ordered refinement filters. It never holds an element reference;
//! every action, read, and assertion re-resolves against the live document
//! at the moment of use. Re-resolution is what makes auto-waiting work — a
//! locator built before its element exists observes the element the tick it
//! appears.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::actionability::{timeout_error, Action, ProbeFailure, Prober};
use crate::config::LocatorOptions;
use crate::dom::ElementState;
use crate::page::PageCore;
use crate::poll::{PollOutcome, PollSuccess};
use crate::result::EsperarResult;
use crate::selector::{Selector, TextMatch};

// =============================================================================
// FILTERS
// =============================================================================

/// A refinement applied to the resolved candidate sequence, in declaration
/// order, at evaluation time
#[derive(Debug, Clone)]
pub enum Filter {
    /// Keep candidates whose rendered text matches
    HasText(TextMatch),
    /// Keep candidates whose rendered text does not match
    HasNotText(TextMatch),
    /// Keep only the candidate at this index
    Nth(usize),
    /// Keep only the first candidate
    First,
    /// Keep only the last candidate
    Last,
}

impl Filter {
    /// Apply this filter to a candidate sequence
    #[must_use]
    pub fn apply(&self, candidates: Vec<ElementState>) -> Vec<ElementState> {
        match self {
            Self::HasText(text) => candidates
                .into_iter()
                .filter(|el| text.matches(&el.text))
                .collect(),
            Self::HasNotText(text) => candidates
                .into_iter()
                .filter(|el| !text.matches(&el.text))
                .collect(),
            Self::Nth(index) => candidates.into_iter().nth(*index).into_iter().collect(),
            Self::First => candidates.into_iter().take(1).collect(),
            Self::Last => match candidates.into_iter().last() {
                Some(el) => vec![el],
                None => Vec::new(),
            },
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HasText(text) => write!(f, ":has-text({text})"),
            Self::HasNotText(text) => write!(f, ":has-not-text({text})"),
            Self::Nth(index) => write!(f, ":nth({index})"),
            Self::First => write!(f, ":first"),
            Self::Last => write!(f, ":last"),
        }
    }
}

// =============================================================================
// LOCATOR
// =============================================================================

/// A deferred, re-evaluatable reference to zero or more elements.
///
/// Constructing or refining a locator performs no I/O and cannot fail.
#[derive(Debug, Clone)]
pub struct Locator {
    core: Arc<PageCore>,
    selector: Selector,
    filters: Vec<Filter>,
    options: LocatorOptions,
}

impl Locator {
    pub(crate) fn new(core: Arc<PageCore>, selector: Selector) -> Self {
        Self {
            core,
            selector,
            filters: Vec::new(),
            options: LocatorOptions::default(),
        }
    }

    // =========================================================================
    // REFINEMENT
    // =========================================================================

    /// Append a filter, producing a new locator
    #[must_use]
    pub fn filter(&self, filter: Filter) -> Self {
        let mut refined = self.clone();
        refined.filters.push(filter);
        refined
    }

    /// Keep candidates whose text matches
    #[must_use]
    pub fn has_text(&self, text: impl Into<TextMatch>) -> Self {
        self.filter(Filter::HasText(text.into()))
    }

    /// Keep candidates whose text does not match
    #[must_use]
    pub fn has_not_text(&self, text: impl Into<TextMatch>) -> Self {
        self.filter(Filter::HasNotText(text.into()))
    }

    /// Select the first candidate
    #[must_use]
    pub fn first(&self) -> Self {
        self.filter(Filter::First)
    }

    /// Select the last candidate
    #[must_use]
    pub fn last(&self) -> Self {
        self.filter(Filter::Last)
    }

    /// Select the candidate at `index`
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        self.filter(Filter::Nth(index))
    }

    /// Override the timeout for actions, reads, and assertions through this
    /// locator
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut refined = self.clone();
        refined.options.timeout = Some(timeout);
        refined
    }

    /// Override the polling interval
    #[must_use]
    pub fn with_poll_interval(&self, interval: Duration) -> Self {
        let mut refined = self.clone();
        refined.options.poll_interval = Some(interval);
        refined
    }

    /// Human-readable description for error messages
    #[must_use]
    pub fn description(&self) -> String {
        let mut out = self.selector.to_string();
        for filter in &self.filters {
            out.push_str(&filter.to_string());
        }
        out
    }

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    /// Resolve the candidate sequence against current document state, with
    /// no waiting: selector match in document order, then filters in
    /// declaration order.
    pub fn resolve_now(&self) -> EsperarResult<Vec<ElementState>> {
        let snapshot = self.core.doc.snapshot()?;
        let mut candidates: Vec<ElementState> = snapshot
            .into_iter()
            .filter(|el| self.selector.matches(el))
            .collect();
        for filter in &self.filters {
            candidates = filter.apply(candidates);
        }
        Ok(candidates)
    }

    /// Number of currently matching elements (a snapshot, no waiting)
    pub fn count(&self) -> EsperarResult<usize> {
        Ok(self.resolve_now()?.len())
    }

    /// Materialize the current candidate sequence as index-pinned locators.
    /// A snapshot of the present state, not auto-waiting.
    pub fn all(&self) -> EsperarResult<Vec<Self>> {
        let count = self.count()?;
        Ok((0..count).map(|index| self.nth(index)).collect())
    }

    pub(crate) fn effective_timeout(&self) -> Duration {
        self.options.effective_timeout(&self.core.config)
    }

    pub(crate) fn effective_interval(&self) -> Duration {
        self.options.effective_interval(&self.core.config)
    }

    pub(crate) fn core(&self) -> &Arc<PageCore> {
        &self.core
    }

    // =========================================================================
    // ACTIONABILITY
    // =========================================================================

    /// Poll until exactly one candidate satisfies the action's required
    /// conditions, returning its snapshot from the satisfying tick.
    fn wait_actionable(&self, action: Action) -> EsperarResult<ElementState> {
        let mut prober = Prober::new(action);
        let result = self.core.poll(
            self.effective_timeout(),
            self.effective_interval(),
            || ProbeFailure::DialogOpen,
            || match self.resolve_now() {
                Err(err) => PollOutcome::Abort(err),
                Ok(candidates) => prober.evaluate(&candidates),
            },
        );
        self.finish(action, result)
    }

    fn finish(
        &self,
        action: Action,
        result: Result<PollSuccess<ElementState>, crate::poll::PollError<ProbeFailure>>,
    ) -> EsperarResult<ElementState> {
        match result {
            Ok(success) => {
                tracing::debug!(
                    locator = %self.description(),
                    action = %action,
                    attempts = success.attempts,
                    elapsed_ms = success.elapsed.as_millis() as u64,
                    "actionable"
                );
                Ok(success.value)
            }
            Err(err) => Err(err.into_error(|last, elapsed| {
                timeout_error(last, &self.description(), action, elapsed)
            })),
        }
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Click the element once it is actionable
    pub fn click(&self) -> EsperarResult<()> {
        let el = self.wait_actionable(Action::Click)?;
        self.core.doc.deliver_click(el.id);
        Ok(())
    }

    /// Fill the element with text, replacing its current value
    pub fn fill(&self, text: impl Into<String>) -> EsperarResult<()> {
        let text = text.into();
        let el = self.wait_actionable(Action::Fill)?;
        self.core.doc.update(el.id, |el| el.value = text);
        Ok(())
    }

    /// Clear the element's value
    pub fn clear(&self) -> EsperarResult<()> {
        self.fill("")
    }

    /// Check the element. Already-checked elements are left alone.
    pub fn check(&self) -> EsperarResult<()> {
        let el = self.wait_actionable(Action::Check)?;
        if !el.checked {
            self.core.doc.update(el.id, |el| el.checked = true);
            self.core.doc.deliver_click(el.id);
        }
        Ok(())
    }

    /// Uncheck the element. Already-unchecked elements are left alone.
    pub fn uncheck(&self) -> EsperarResult<()> {
        let el = self.wait_actionable(Action::Check)?;
        if el.checked {
            self.core.doc.update(el.id, |el| el.checked = false);
            self.core.doc.deliver_click(el.id);
        }
        Ok(())
    }

    /// Select an option by label or value, returning the selected value.
    /// Waits for the element to be actionable and for the option to exist.
    pub fn select_option(&self, option: impl Into<String>) -> EsperarResult<String> {
        let option = option.into();
        let action = Action::Fill;
        let mut prober = Prober::new(action);
        let result = self.core.poll(
            self.effective_timeout(),
            self.effective_interval(),
            || ProbeFailure::DialogOpen,
            || match self.resolve_now() {
                Err(err) => PollOutcome::Abort(err),
                Ok(candidates) => match prober.evaluate(&candidates) {
                    PollOutcome::Ready(el) => {
                        let found = el
                            .select_options
                            .iter()
                            .find(|o| o.label == option || o.value == option)
                            .map(|o| o.value.clone());
                        match found {
                            Some(value) => PollOutcome::Ready((el, value)),
                            None => PollOutcome::Pending(ProbeFailure::OptionMissing {
                                option: option.clone(),
                            }),
                        }
                    }
                    PollOutcome::Pending(reason) => PollOutcome::Pending(reason),
                    PollOutcome::Abort(err) => PollOutcome::Abort(err),
                },
            },
        );
        match result {
            Ok(success) => {
                let (el, value) = success.value;
                self.core.doc.update(el.id, {
                    let value = value.clone();
                    move |el| el.value = value
                });
                Ok(value)
            }
            Err(err) => Err(err.into_error(|last, elapsed| {
                timeout_error(last, &self.description(), action, elapsed)
            })),
        }
    }

    /// Drag this element onto the target locator's element
    pub fn drag_to(&self, target: &Self) -> EsperarResult<()> {
        let source = self.wait_actionable(Action::Drag)?;
        let dest = target.wait_actionable(Action::Drag)?;
        self.core.doc.deliver_drag(source.id, dest.id);
        Ok(())
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Wait for exactly one attached element, then return its snapshot.
    /// Reads extract once; they do not retry the extracted value.
    fn read_one(&self) -> EsperarResult<ElementState> {
        self.wait_actionable(Action::Read)
    }

    /// The element's rendered text
    pub fn text_content(&self) -> EsperarResult<String> {
        Ok(self.read_one()?.text)
    }

    /// The element's current input value
    pub fn input_value(&self) -> EsperarResult<String> {
        Ok(self.read_one()?.value)
    }

    /// An attribute value, `None` if absent
    pub fn get_attribute(&self, name: &str) -> EsperarResult<Option<String>> {
        Ok(self.read_one()?.attribute(name))
    }

    /// Whether the element is checked
    pub fn is_checked(&self) -> EsperarResult<bool> {
        Ok(self.read_one()?.checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dom::{BoundingBox, SelectOption};
    use crate::page::Page;
    use crate::result::EsperarError;

    fn fast_page() -> Page {
        Page::with_config(
            EngineConfig::new()
                .with_timeout(Duration::from_millis(200))
                .with_poll_interval(Duration::from_millis(10)),
        )
    }

    mod refinement {
        use super::*;

        #[test]
        fn test_filtering_produces_a_new_locator() {
            let page = fast_page();
            let base = page.locator("button");
            let refined = base.has_text("Add to cart");
            assert_eq!(base.description(), "css=button");
            assert!(refined.description().contains("has-text"));
        }

        #[test]
        fn test_construction_performs_no_io() {
            // No elements exist; building deep chains still cannot fail.
            let page = fast_page();
            let locator = page
                .locator("#missing")
                .has_text("x")
                .has_not_text("y")
                .first()
                .nth(3)
                .last();
            assert_eq!(locator.count().unwrap(), 0);
        }
    }

    mod resolution {
        use super::*;

        #[test]
        fn test_filters_apply_in_declaration_order() {
            let page = fast_page();
            let doc = page.document();
            doc.insert(ElementState::new("li").with_text("alpha"));
            doc.insert(ElementState::new("li").with_text("beta"));
            doc.insert(ElementState::new("li").with_text("alpha beta"));

            // has_text("alpha") first narrows to two, then nth(1) picks the
            // second of those, not the document's second li.
            let resolved = page
                .locator("li")
                .has_text("alpha")
                .nth(1)
                .resolve_now()
                .unwrap();
            assert_eq!(resolved.len(), 1);
            assert_eq!(resolved[0].text, "alpha beta");
        }

        #[test]
        fn test_chained_filters_equal_combined_pass() {
            let page = fast_page();
            let doc = page.document();
            for text in ["one", "two", "twelve", "twenty"] {
                doc.insert(ElementState::new("li").with_text(text));
            }
            let chained = page
                .locator("li")
                .has_text("tw")
                .has_not_text("twelve")
                .resolve_now()
                .unwrap();
            let combined: Vec<ElementState> = page
                .locator("li")
                .resolve_now()
                .unwrap()
                .into_iter()
                .filter(|el| el.text.contains("tw") && !el.text.contains("twelve"))
                .collect();
            assert_eq!(chained, combined);
        }

        #[test]
        fn test_all_returns_index_pinned_snapshot() {
            let page = fast_page();
            let doc = page.document();
            for i in 0..6 {
                doc.insert(
                    ElementState::new("div")
                        .with_test_id("inventory-item")
                        .with_text(format!("item {i}")),
                );
            }
            let items = page.get_by_test_id("inventory-item").all().unwrap();
            assert_eq!(items.len(), 6);
            assert_eq!(items[2].text_content().unwrap(), "item 2");
        }

        #[test]
        fn test_nth_out_of_range_resolves_empty() {
            let page = fast_page();
            page.document().insert(ElementState::new("li"));
            assert_eq!(page.locator("li").nth(5).count().unwrap(), 0);
        }
    }

    mod actions {
        use super::*;

        #[test]
        fn test_click_delivers_to_element() {
            let page = fast_page();
            let id = page
                .document()
                .insert(ElementState::new("button").with_text("Login"));
            page.get_by_role("button", Some("Login".into()))
                .click()
                .unwrap();
            assert_eq!(page.document().get(id).unwrap().clicks, 1);
        }

        #[test]
        fn test_click_on_disabled_times_out_naming_enabled() {
            let page = fast_page();
            page.document()
                .insert(ElementState::new("button").with_dom_id("target").disabled());
            let err = page.locator("#target").click().unwrap_err();
            match err {
                EsperarError::ActionabilityTimeout { condition, .. } => {
                    assert_eq!(condition, "enabled");
                }
                other => panic!("expected ActionabilityTimeout, got {other}"),
            }
        }

        #[test]
        fn test_click_missing_element_is_not_found_after_timeout() {
            let page = fast_page();
            let start = std::time::Instant::now();
            let err = page.locator("#nothing").click().unwrap_err();
            assert!(matches!(err, EsperarError::NotFound { count: 0, .. }));
            // Poll-then-fail: the full (short) timeout was spent
            assert!(start.elapsed() >= Duration::from_millis(200));
        }

        #[test]
        fn test_click_ambiguous_is_not_found_with_count() {
            let page = fast_page();
            page.document().insert(ElementState::new("button"));
            page.document().insert(ElementState::new("button"));
            let err = page.locator("button").click().unwrap_err();
            assert!(matches!(err, EsperarError::NotFound { count: 2, .. }));
        }

        #[test]
        fn test_click_obscured_element_times_out_on_receives_events() {
            let page = fast_page();
            page.document().insert(
                ElementState::new("button")
                    .with_dom_id("covered")
                    .with_receives_events(false),
            );
            let err = page.locator("#covered").click().unwrap_err();
            match err {
                EsperarError::ActionabilityTimeout { condition, .. } => {
                    assert_eq!(condition, "receives-events");
                }
                other => panic!("expected ActionabilityTimeout, got {other}"),
            }
        }

        #[test]
        fn test_click_waits_out_animation() {
            let page = fast_page();
            let doc = page.document();
            let id = doc.insert(ElementState::new("button").with_dom_id("moving"));
            // Animate for ~60ms on a background thread, then hold still.
            let animator = doc.clone();
            std::thread::spawn(move || {
                for step in 0..6 {
                    animator.update(id, |el| {
                        el.bounding_box = BoundingBox::new(step as f32 * 10.0, 0.0, 100.0, 20.0);
                    });
                    std::thread::sleep(Duration::from_millis(10));
                }
            });
            page.locator("#moving")
                .with_timeout(Duration::from_secs(2))
                .click()
                .unwrap();
            assert_eq!(doc.get(id).unwrap().clicks, 1);
        }

        #[test]
        fn test_fill_sets_value_and_clear_empties_it() {
            let page = fast_page();
            let id = page
                .document()
                .insert(ElementState::new("input").with_dom_id("user-name"));
            let input = page.locator("#user-name");
            input.fill("testUserName").unwrap();
            assert_eq!(page.document().get(id).unwrap().value, "testUserName");
            input.clear().unwrap();
            assert_eq!(page.document().get(id).unwrap().value, "");
        }

        #[test]
        fn test_fill_on_non_editable_times_out_naming_editable() {
            let page = fast_page();
            page.document()
                .insert(ElementState::new("div").with_dom_id("label"));
            let err = page.locator("#label").fill("x").unwrap_err();
            match err {
                EsperarError::ActionabilityTimeout { condition, .. } => {
                    assert_eq!(condition, "editable");
                }
                other => panic!("expected ActionabilityTimeout, got {other}"),
            }
        }

        #[test]
        fn test_check_and_uncheck_are_idempotent() {
            let page = fast_page();
            let id = page.document().insert(
                ElementState::new("input")
                    .with_dom_id("monday")
                    .with_attribute("type", "checkbox"),
            );
            let checkbox = page.locator("#monday");
            checkbox.check().unwrap();
            checkbox.check().unwrap();
            let el = page.document().get(id).unwrap();
            assert!(el.checked);
            // The second check was a no-op: only one click delivered.
            assert_eq!(el.clicks, 1);

            checkbox.uncheck().unwrap();
            assert!(!page.document().get(id).unwrap().checked);
        }

        #[test]
        fn test_select_option_by_label_sets_value() {
            let page = fast_page();
            let id = page.document().insert(
                ElementState::new("select")
                    .with_dom_id("country")
                    .with_select_options(vec![
                        SelectOption::new("Japan", "japan"),
                        SelectOption::new("Brazil", "brazil"),
                    ]),
            );
            let value = page.locator("#country").select_option("Japan").unwrap();
            assert_eq!(value, "japan");
            assert_eq!(page.document().get(id).unwrap().value, "japan");
        }

        #[test]
        fn test_select_option_missing_fails_with_option_error() {
            let page = fast_page();
            page.document().insert(
                ElementState::new("select")
                    .with_dom_id("country")
                    .with_select_options(vec![SelectOption::new("Japan", "japan")]),
            );
            let err = page.locator("#country").select_option("Atlantis").unwrap_err();
            assert!(matches!(err, EsperarError::OptionNotFound { .. }));
        }

        #[test]
        fn test_drag_to_runs_drop_handler() {
            let page = fast_page();
            let doc = page.document();
            doc.insert(ElementState::new("div").with_dom_id("draggable"));
            let target = doc.insert(ElementState::new("div").with_dom_id("droppable"));
            doc.on_drop(target, move |d, _source| {
                d.update(target, |el| el.text = "Dropped!".to_string());
            });
            page.locator("#draggable")
                .drag_to(&page.locator("#droppable"))
                .unwrap();
            assert_eq!(doc.get(target).unwrap().text, "Dropped!");
        }
    }

    mod reads {
        use super::*;

        #[test]
        fn test_text_content_reads_once() {
            let page = fast_page();
            page.document().insert(
                ElementState::new("button")
                    .with_test_id("remove-sauce-labs-backpack")
                    .with_text("Remove"),
            );
            let text = page
                .get_by_test_id("remove-sauce-labs-backpack")
                .text_content()
                .unwrap();
            assert_eq!(text, "Remove");
        }

        #[test]
        fn test_reads_succeed_on_hidden_elements() {
            let page = fast_page();
            page.document()
                .insert(ElementState::new("span").with_dom_id("secret").with_text("42").hidden());
            assert_eq!(page.locator("#secret").text_content().unwrap(), "42");
        }

        #[test]
        fn test_get_attribute_placeholder() {
            let page = fast_page();
            page.document().insert(
                ElementState::new("input")
                    .with_dom_id("password")
                    .with_placeholder("Password"),
            );
            let placeholder = page
                .locator("#password")
                .get_attribute("placeholder")
                .unwrap();
            assert_eq!(placeholder.as_deref(), Some("Password"));
        }

        #[test]
        fn test_get_attribute_absent_is_none() {
            let page = fast_page();
            page.document()
                .insert(ElementState::new("input").with_dom_id("plain"));
            assert!(page
                .locator("#plain")
                .get_attribute("aria-label")
                .unwrap()
                .is_none());
        }

        #[test]
        fn test_is_checked_reflects_state() {
            let page = fast_page();
            page.document().insert(
                ElementState::new("input")
                    .with_dom_id("male")
                    .with_attribute("type", "radio")
                    .checked(),
            );
            page.document().insert(
                ElementState::new("input")
                    .with_dom_id("female")
                    .with_attribute("type", "radio"),
            );
            assert!(page.locator("#male").is_checked().unwrap());
            assert!(!page.locator("#female").is_checked().unwrap());
        }

        #[test]
        fn test_input_value_roundtrip() {
            let page = fast_page();
            page.document()
                .insert(ElementState::new("input").with_dom_id("user-name"));
            let input = page.locator("#user-name");
            input.fill("expected").unwrap();
            assert_eq!(input.input_value().unwrap(), "expected");
        }

        #[test]
        fn test_read_on_zero_matches_polls_then_fails_not_found() {
            let page = fast_page();
            let start = std::time::Instant::now();
            let err = page.locator("#ghost").text_content().unwrap_err();
            assert!(matches!(err, EsperarError::NotFound { count: 0, .. }));
            assert!(start.elapsed() >= Duration::from_millis(200));
        }
    }
}

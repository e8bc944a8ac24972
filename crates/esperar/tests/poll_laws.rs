//! Property-based tests for the poll loop and locator filter laws.
//!
//! Uses proptest to verify the bounded-polling and filter-composition
//! invariants hold for arbitrary inputs.

use esperar::{
    poll_until, CancelToken, ElementState, EngineConfig, Page, PollError, PollOutcome,
};
use proptest::prelude::*;
use std::time::Duration;

fn quick_page() -> Page {
    Page::with_config(
        EngineConfig::new()
            .with_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(10)),
    )
}

// === Poll loop laws (timing-sensitive, few cases) ===

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// A never-satisfied predicate is evaluated at most
    /// ceil(timeout / interval) + 1 times.
    #[test]
    fn prop_poll_never_exceeds_attempt_bound(
        timeout_ms in 10u64..80,
        interval_ms in 10u64..40,
    ) {
        let result = poll_until::<(), _, _>(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
            &CancelToken::new(),
            |_| PollOutcome::Pending("not yet"),
        );
        match result.unwrap_err() {
            PollError::Timeout { attempts, .. } => {
                let bound = (timeout_ms as usize).div_ceil(interval_ms as usize) + 1;
                prop_assert!(attempts <= bound, "attempts {} > bound {}", attempts, bound);
                prop_assert!(attempts >= 1);
            }
            other => prop_assert!(false, "expected timeout, got {:?}", other),
        }
    }

    /// A predicate satisfied on tick k returns after exactly k + 1
    /// evaluations, at that tick's elapsed time, never the full timeout.
    #[test]
    fn prop_success_at_tick_k_is_fail_fast(k in 0usize..5) {
        let result = poll_until::<_, &str, _>(
            Duration::from_secs(10),
            Duration::from_millis(10),
            &CancelToken::new(),
            |tick| {
                if tick >= k {
                    PollOutcome::Ready(tick)
                } else {
                    PollOutcome::Pending("not yet")
                }
            },
        )
        .unwrap();
        prop_assert_eq!(result.value, k);
        prop_assert_eq!(result.attempts, k + 1);
        prop_assert!(result.elapsed < Duration::from_secs(5));
    }
}

// === Filter composition laws (pure resolution, default case count) ===

proptest! {
    /// Chained filters resolve to the same set as the combined predicate
    /// applied in one pass.
    #[test]
    fn prop_chained_filters_equal_combined_single_pass(
        texts in prop::collection::vec("[ab]{0,4}", 0..12),
        needle_a in "[ab]{1,2}",
        needle_b in "[ab]{1,2}",
    ) {
        let page = quick_page();
        let doc = page.document();
        for text in &texts {
            doc.insert(ElementState::new("li").with_text(text.clone()));
        }

        let chained = page
            .locator("li")
            .has_text(needle_a.as_str())
            .has_not_text(needle_b.as_str())
            .resolve_now()
            .unwrap();
        let combined: Vec<ElementState> = page
            .locator("li")
            .resolve_now()
            .unwrap()
            .into_iter()
            .filter(|el| {
                el.text.contains(needle_a.as_str()) && !el.text.contains(needle_b.as_str())
            })
            .collect();
        prop_assert_eq!(chained, combined);
    }

    /// Text filters commute: narrowing by a then b equals b then a.
    #[test]
    fn prop_text_filters_commute(
        texts in prop::collection::vec("[ab]{0,4}", 0..12),
        needle_a in "[ab]{1,2}",
        needle_b in "[ab]{1,2}",
    ) {
        let page = quick_page();
        let doc = page.document();
        for text in &texts {
            doc.insert(ElementState::new("li").with_text(text.clone()));
        }

        let base = page.locator("li");
        let a_then_b = base
            .has_text(needle_a.as_str())
            .has_not_text(needle_b.as_str())
            .resolve_now()
            .unwrap();
        let b_then_a = base
            .has_not_text(needle_b.as_str())
            .has_text(needle_a.as_str())
            .resolve_now()
            .unwrap();
        prop_assert_eq!(a_then_b, b_then_a);
    }

    /// first() and last() agree with the equivalent nth() selections, and
    /// out-of-range indices resolve to the empty sequence.
    #[test]
    fn prop_first_last_agree_with_nth(count in 0usize..8) {
        let page = quick_page();
        let doc = page.document();
        for i in 0..count {
            doc.insert(ElementState::new("li").with_text(format!("row {i}")));
        }

        let base = page.locator("li");
        prop_assert_eq!(
            base.first().resolve_now().unwrap(),
            base.nth(0).resolve_now().unwrap()
        );
        if count > 0 {
            prop_assert_eq!(
                base.last().resolve_now().unwrap(),
                base.nth(count - 1).resolve_now().unwrap()
            );
        } else {
            prop_assert!(base.last().resolve_now().unwrap().is_empty());
        }
        prop_assert!(base.nth(count).resolve_now().unwrap().is_empty());
    }
}

//! Bounded-time polling loop shared by actionability probing, assertions,
//! and event waits.
//!
//! The loop is cooperative: it sleeps between ticks, yielding the thread so
//! concurrent page mutation, network callbacks, and dialog events can land.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::MIN_POLL_INTERVAL_MS;
use crate::result::EsperarError;

// =============================================================================
// CANCELLATION
// =============================================================================

/// Cooperative cancellation signal for in-progress polls.
///
/// Cloned freely; all clones observe the same flag. Once cancelled, no
/// further poll tick starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, un-cancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every holder of this token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation has been signalled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// =============================================================================
// OUTCOME TYPES
// =============================================================================

/// Verdict of a single poll tick.
///
/// `R` is the caller's failure-reason type; the engine carries the *last*
/// observed reason into the timeout error so failure messages stay
/// diagnostic.
#[derive(Debug)]
pub enum PollOutcome<T, R> {
    /// Condition satisfied; stop polling and return the value
    Ready(T),
    /// Condition not yet satisfied; keep polling
    Pending(R),
    /// Unrecoverable failure; stop polling immediately
    Abort(EsperarError),
}

/// Result of a successful poll
#[derive(Debug, Clone, Copy)]
pub struct PollSuccess<T> {
    /// The value produced by the satisfying tick
    pub value: T,
    /// Number of predicate evaluations, including the satisfying one
    pub attempts: usize,
    /// True elapsed time at the satisfying tick
    pub elapsed: Duration,
}

/// Failure of a poll loop
#[derive(Debug)]
pub enum PollError<R> {
    /// The timeout elapsed with the condition still unsatisfied
    Timeout {
        /// Last observed failure reason, if any tick ran
        last: Option<R>,
        /// Number of predicate evaluations
        attempts: usize,
        /// Total time spent
        elapsed: Duration,
    },
    /// Cancellation was observed before a tick started
    Cancelled {
        /// Time spent before cancellation was observed
        elapsed: Duration,
    },
    /// The predicate reported an unrecoverable failure
    Aborted(EsperarError),
}

impl<R: Display> PollError<R> {
    /// Convert into an [`EsperarError`] using a caller-supplied mapping for
    /// the timeout case. Cancellation and aborts map directly.
    pub fn into_error<F>(self, on_timeout: F) -> EsperarError
    where
        F: FnOnce(Option<R>, Duration) -> EsperarError,
    {
        match self {
            Self::Timeout { last, elapsed, .. } => on_timeout(last, elapsed),
            Self::Cancelled { elapsed } => EsperarError::Cancelled {
                elapsed_ms: elapsed.as_millis() as u64,
            },
            Self::Aborted(err) => err,
        }
    }
}

// =============================================================================
// POLL LOOP
// =============================================================================

/// Poll `predicate` until it reports [`PollOutcome::Ready`] or `timeout`
/// elapses.
///
/// Contract:
/// - The predicate runs immediately (tick 0), then on a fixed interval.
/// - The interval is clamped to [`MIN_POLL_INTERVAL_MS`], so the predicate
///   is never evaluated more than `ceil(timeout / interval) + 1` times.
/// - `cancel` is checked before every tick; no tick starts after
///   cancellation is observed.
/// - On timeout the error carries the last observed failure reason, the
///   attempt count, and the elapsed time.
pub fn poll_until<T, R, F>(
    timeout: Duration,
    interval: Duration,
    cancel: &CancelToken,
    mut predicate: F,
) -> Result<PollSuccess<T>, PollError<R>>
where
    R: Display,
    F: FnMut(usize) -> PollOutcome<T, R>,
{
    let interval = interval.max(Duration::from_millis(MIN_POLL_INTERVAL_MS));
    let start = Instant::now();
    let mut attempts = 0;
    let mut last: Option<R> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled {
                elapsed: start.elapsed(),
            });
        }

        match predicate(attempts) {
            PollOutcome::Ready(value) => {
                return Ok(PollSuccess {
                    value,
                    attempts: attempts + 1,
                    elapsed: start.elapsed(),
                });
            }
            PollOutcome::Pending(reason) => {
                tracing::trace!(tick = attempts, %reason, "poll tick pending");
                last = Some(reason);
            }
            PollOutcome::Abort(err) => return Err(PollError::Aborted(err)),
        }
        attempts += 1;

        if start.elapsed() >= timeout {
            return Err(PollError::Timeout {
                last,
                attempts,
                elapsed: start.elapsed(),
            });
        }

        std::thread::sleep(interval);
    }
}

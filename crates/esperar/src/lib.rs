//! Esperar: auto-waiting locators and retrying assertions for UI testing.
//!
//! Esperar (Spanish: "to wait / to expect") is the engine that lets a test
//! reference an element before it exists, wait for actionability before
//! interacting with it, and assert on eventually-consistent state without
//! manual sleeps.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     ESPERAR Architecture                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐   resolve per tick   ┌───────────────┐              │
//! │  │ Locator │─────────────────────►│ Live Document │◄─── host    │
//! │  └────┬────┘                      └───────────────┘   mutation  │
//! │       │ actions / reads / assertions                            │
//! │  ┌────▼───────────┐  ┌────────────────┐  ┌────────────────────┐ │
//! │  │ Actionability  │  │ Assertion      │  │ Event/Dialog       │ │
//! │  │ Prober         │  │ Engine         │  │ Bridge             │ │
//! │  └────┬───────────┘  └────┬───────────┘  └────┬───────────────┘ │
//! │       └───────────────────┴───────────────────┘                 │
//! │                   Retry/Poll Engine (cancellable)               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use esperar::{expect, ElementState, Page};
//!
//! let page = Page::new();
//! page.document()
//!     .insert(ElementState::new("button").with_dom_id("login").with_text("Login"));
//!
//! let button = page.locator("#login");
//! button.click()?;
//! expect(&button).to_be_visible()?;
//! # Ok::<(), esperar::EsperarError>(())
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod actionability;
mod assertion;
mod config;
mod dialog;
mod dom;
mod locator;
mod network;
mod page;
mod poll;
mod result;
mod selector;

pub use actionability::{Action, ActionabilityState, Condition, ProbeFailure, Prober};
pub use assertion::soft::{
    AssertionFailure, AssertionSummary, FailureKind, SoftAssertionError, SoftAssertions,
    SoftExpect,
};
pub use assertion::{expect, Expect, Matcher, Verdict};
pub use config::{
    EngineConfig, LocatorOptions, DEFAULT_DIALOG_GRACE_MS, DEFAULT_NETWORK_QUIET_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS, MIN_POLL_INTERVAL_MS,
};
pub use dialog::{Dialog, DialogAction, DialogBridge, DialogHandlerFn, DialogType};
pub use dom::{
    BoundingBox, ClickHandler, Document, DropHandler, ElementState, Point, SelectOption,
};
pub use locator::{Filter, Locator};
pub use network::NetworkMonitor;
pub use page::Page;
pub use poll::{poll_until, CancelToken, PollError, PollOutcome, PollSuccess};
pub use result::{EsperarError, EsperarResult};
pub use selector::{CssSelector, Selector, TextMatch};

//! In-memory document model.
//!
//! The engine never talks to a real DOM: the host owns a live, concurrently
//! mutable document behind a lock, and the engine reads per-tick snapshots
//! out of it. Host-side mutation hooks (insert/remove/update, click and drop
//! handlers) let integration tests script the concurrent page behavior the
//! auto-waiting machinery exists to absorb.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::result::{EsperarError, EsperarResult};

// =============================================================================
// GEOMETRY
// =============================================================================

/// A point in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Bounding box for an element.
///
/// Compared across consecutive poll ticks to decide layout stability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(0.0, 0.0, 100.0, 20.0)
    }
}

// =============================================================================
// ELEMENT STATE
// =============================================================================

/// A selectable option on a `<select>`-like element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Visible label
    pub label: String,
    /// Underlying value
    pub value: String,
}

impl SelectOption {
    /// Create a new option
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Per-tick snapshot of one element.
///
/// Snapshots are cheap clones of the live state; the engine never holds one
/// across ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    /// Document-assigned element id (0 until attached)
    pub id: u64,
    /// Tag name (lowercase)
    pub tag: String,
    /// DOM `id` attribute
    pub dom_id: Option<String>,
    /// CSS classes
    pub classes: Vec<String>,
    /// Other attributes
    pub attributes: HashMap<String, String>,
    /// Explicit ARIA role
    pub role: Option<String>,
    /// Placeholder text (inputs)
    pub placeholder: Option<String>,
    /// Test identifier (`data-testid`)
    pub test_id: Option<String>,
    /// Rendered text content
    pub text: String,
    /// Current input value
    pub value: String,
    /// Checked state (checkboxes, radios)
    pub checked: bool,
    /// Whether the element is rendered visible
    pub visible: bool,
    /// Whether the element is enabled
    pub enabled: bool,
    /// Whether the element accepts text input
    pub editable: bool,
    /// Whether pointer events reach the element (not obscured)
    pub receives_events: bool,
    /// Options, for select-like elements
    pub select_options: Vec<SelectOption>,
    /// Layout box, compared across ticks for stability
    pub bounding_box: BoundingBox,
    /// Number of clicks delivered to this element
    pub clicks: u32,
}

impl ElementState {
    /// Create a new element with the given tag.
    ///
    /// Inputs and textareas default to editable; everything else does not.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into().to_lowercase();
        let editable = matches!(tag.as_str(), "input" | "textarea" | "select");
        Self {
            id: 0,
            tag,
            dom_id: None,
            classes: Vec::new(),
            attributes: HashMap::new(),
            role: None,
            placeholder: None,
            test_id: None,
            text: String::new(),
            value: String::new(),
            checked: false,
            visible: true,
            enabled: true,
            editable,
            receives_events: true,
            select_options: Vec::new(),
            bounding_box: BoundingBox::default(),
            clicks: 0,
        }
    }

    /// Set the DOM `id` attribute
    #[must_use]
    pub fn with_dom_id(mut self, id: impl Into<String>) -> Self {
        self.dom_id = Some(id.into());
        self
    }

    /// Add a CSS class
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the ARIA role
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the placeholder text
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Set the test identifier
    #[must_use]
    pub fn with_test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    /// Set the rendered text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the input value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Mark checked
    #[must_use]
    pub const fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    /// Mark hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Mark disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Override editability
    #[must_use]
    pub const fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Override whether pointer events reach the element
    #[must_use]
    pub const fn with_receives_events(mut self, receives: bool) -> Self {
        self.receives_events = receives;
        self
    }

    /// Set the select options
    #[must_use]
    pub fn with_select_options(mut self, options: Vec<SelectOption>) -> Self {
        self.select_options = options;
        self
    }

    /// Set the bounding box
    #[must_use]
    pub const fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = bounding_box;
        self
    }

    /// The implicit ARIA role derived from the tag, used when no explicit
    /// role is set
    #[must_use]
    pub fn implicit_role(&self) -> Option<&'static str> {
        match self.tag.as_str() {
            "button" => Some("button"),
            "a" => Some("link"),
            "select" => Some("combobox"),
            "textarea" => Some("textbox"),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some("heading"),
            "input" => match self.attributes.get("type").map(String::as_str) {
                Some("checkbox") => Some("checkbox"),
                Some("radio") => Some("radio"),
                Some("button") | Some("submit") => Some("button"),
                _ => Some("textbox"),
            },
            _ => None,
        }
    }

    /// The effective role: explicit role, else the implicit one
    #[must_use]
    pub fn effective_role(&self) -> Option<&str> {
        self.role.as_deref().or_else(|| self.implicit_role())
    }

    /// The element's accessible name: `aria-label` if present, else text
    #[must_use]
    pub fn accessible_name(&self) -> &str {
        self.attributes
            .get("aria-label")
            .map_or(self.text.as_str(), String::as_str)
    }

    /// Look up an attribute, folding the modeled fields (`id`, `class`,
    /// `value`, `placeholder`, `data-testid`) in with the attribute map
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.dom_id.clone(),
            "class" => {
                if self.classes.is_empty() {
                    None
                } else {
                    Some(self.classes.join(" "))
                }
            }
            "value" => Some(self.value.clone()),
            "placeholder" => self.placeholder.clone(),
            "data-testid" => self.test_id.clone(),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

// =============================================================================
// LIVE DOCUMENT
// =============================================================================

/// Handler invoked when a click is delivered to an element.
///
/// Runs without the document lock held, so it may freely mutate the
/// document through the handle it receives.
pub type ClickHandler = Box<dyn FnMut(&Document) + Send>;

/// Handler invoked when a drag lands on its target element; receives the
/// source element id.
pub type DropHandler = Box<dyn FnMut(&Document, u64) + Send>;

#[derive(Default)]
struct DocumentInner {
    elements: Vec<ElementState>,
    next_id: u64,
    closed: bool,
    drags: Vec<(u64, u64)>,
}

/// The live, concurrently mutable document.
///
/// Cloning produces another handle to the same document. The engine reads
/// snapshots; the host mutates through the same handle, typically from a
/// spawned thread to simulate asynchronous page behavior.
#[derive(Clone, Default)]
pub struct Document {
    inner: Arc<Mutex<DocumentInner>>,
    click_handlers: Arc<Mutex<HashMap<u64, ClickHandler>>>,
    drop_handlers: Arc<Mutex<HashMap<u64, DropHandler>>>,
}

impl Document {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an element, returning its document-assigned id
    pub fn insert(&self, mut element: ElementState) -> u64 {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        element.id = id;
        inner.elements.push(element);
        id
    }

    /// Detach an element. Returns whether it was attached.
    pub fn remove(&self, id: u64) -> bool {
        let mut inner = self.lock();
        let before = inner.elements.len();
        inner.elements.retain(|el| el.id != id);
        inner.elements.len() != before
    }

    /// Mutate an element in place. Returns whether it was attached.
    pub fn update<F>(&self, id: u64, f: F) -> bool
    where
        F: FnOnce(&mut ElementState),
    {
        let mut inner = self.lock();
        match inner.elements.iter_mut().find(|el| el.id == id) {
            Some(el) => {
                f(el);
                true
            }
            None => false,
        }
    }

    /// Snapshot one element by id
    #[must_use]
    pub fn get(&self, id: u64) -> Option<ElementState> {
        self.lock().elements.iter().find(|el| el.id == id).cloned()
    }

    /// Snapshot every attached element in document order.
    ///
    /// # Errors
    ///
    /// Returns [`EsperarError::PageClosed`] once the document is closed.
    pub fn snapshot(&self) -> EsperarResult<Vec<ElementState>> {
        let inner = self.lock();
        if inner.closed {
            return Err(EsperarError::PageClosed);
        }
        Ok(inner.elements.clone())
    }

    /// Number of attached elements
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.lock().elements.len()
    }

    /// Simulate a page crash or close. Every subsequent engine operation
    /// fails with [`EsperarError::PageClosed`].
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Whether the document has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Register a handler to run whenever a click lands on `id`
    pub fn on_click<F>(&self, id: u64, handler: F)
    where
        F: FnMut(&Document) + Send + 'static,
    {
        if let Ok(mut handlers) = self.click_handlers.lock() {
            handlers.insert(id, Box::new(handler));
        }
    }

    /// Register a handler to run whenever a drag lands on target `id`
    pub fn on_drop<F>(&self, id: u64, handler: F)
    where
        F: FnMut(&Document, u64) + Send + 'static,
    {
        if let Ok(mut handlers) = self.drop_handlers.lock() {
            handlers.insert(id, Box::new(handler));
        }
    }

    /// Deliver a click to an element: bump its click count, then run any
    /// registered click handler with no lock held.
    pub(crate) fn deliver_click(&self, id: u64) {
        self.update(id, |el| el.clicks += 1);
        let handler = self
            .click_handlers
            .lock()
            .ok()
            .and_then(|mut handlers| handlers.remove(&id));
        if let Some(mut handler) = handler {
            handler(self);
            if let Ok(mut handlers) = self.click_handlers.lock() {
                handlers.entry(id).or_insert(handler);
            }
        }
    }

    /// Record a drag from `source` landing on `target` and run any drop
    /// handler registered on the target.
    pub(crate) fn deliver_drag(&self, source: u64, target: u64) {
        self.lock().drags.push((source, target));
        let handler = self
            .drop_handlers
            .lock()
            .ok()
            .and_then(|mut handlers| handlers.remove(&target));
        if let Some(mut handler) = handler {
            handler(self, source);
            if let Ok(mut handlers) = self.drop_handlers.lock() {
                handlers.entry(target).or_insert(handler);
            }
        }
    }

    /// Drags delivered so far, as (source id, target id) pairs
    #[must_use]
    pub fn drags(&self) -> Vec<(u64, u64)> {
        self.lock().drags.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DocumentInner> {
        // A poisoned document lock means a host hook panicked; the page is
        // unusable either way.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Document")
            .field("elements", &inner.elements.len())
            .field("closed", &inner.closed)
            .finish_non_exhaustive()
    }
}

//! Selector expressions for locating elements.
//!
//! Selectors are inert descriptions: constructing one performs no I/O and
//! cannot fail. An unparseable CSS expression simply matches nothing.

use regex::Regex;
use std::fmt;

use crate::dom::ElementState;

// =============================================================================
// TEXT MATCHING
// =============================================================================

/// Text matching mode for filters, text selectors, and text assertions
#[derive(Debug, Clone)]
pub enum TextMatch {
    /// Case-sensitive substring match
    Substring(String),
    /// Exact equality after trimming
    Exact(String),
    /// Regular expression match
    Pattern(Regex),
}

impl TextMatch {
    /// Create an exact match
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Create a substring match
    #[must_use]
    pub fn substring(text: impl Into<String>) -> Self {
        Self::Substring(text.into())
    }

    /// Check whether `text` satisfies this matcher
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Substring(needle) => text.contains(needle.as_str()),
            Self::Exact(expected) => text.trim() == expected,
            Self::Pattern(pattern) => pattern.is_match(text),
        }
    }
}

impl fmt::Display for TextMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring(needle) => write!(f, "~{needle:?}"),
            Self::Exact(expected) => write!(f, "={expected:?}"),
            Self::Pattern(pattern) => write!(f, "=/{}/", pattern.as_str()),
        }
    }
}

impl From<&str> for TextMatch {
    fn from(text: &str) -> Self {
        Self::Substring(text.to_string())
    }
}

impl From<String> for TextMatch {
    fn from(text: String) -> Self {
        Self::Substring(text)
    }
}

impl From<Regex> for TextMatch {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

// =============================================================================
// CSS SELECTORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum CssPart {
    Tag(String),
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
}

/// A compound simple CSS selector: `tag`, `#id`, `.class`,
/// `[attr="value"]`, and conjunctions thereof (e.g.
/// `input.form-field[type="text"]`).
///
/// Combinators are not supported; an expression using them matches nothing.
#[derive(Debug, Clone)]
pub struct CssSelector {
    raw: String,
    parts: Option<Vec<CssPart>>,
}

impl CssSelector {
    /// Parse a selector expression. Never fails: an unsupported expression
    /// produces a selector that matches no element.
    #[must_use]
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parts = Self::parse_parts(&raw);
        Self { raw, parts }
    }

    /// The original expression text
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the expression parsed as a supported compound selector
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.parts.is_some()
    }

    fn parse_parts(raw: &str) -> Option<Vec<CssPart>> {
        let mut parts = Vec::new();
        let mut chars = raw.trim().chars().peekable();
        if chars.peek().is_none() {
            return None;
        }

        let ident = |chars: &mut std::iter::Peekable<std::str::Chars<'_>>| {
            let mut out = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    out.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            out
        };

        // Optional leading tag
        if chars.peek().is_some_and(|c| c.is_alphabetic()) {
            parts.push(CssPart::Tag(ident(&mut chars).to_lowercase()));
        }

        while let Some(&c) = chars.peek() {
            match c {
                '#' => {
                    chars.next();
                    let name = ident(&mut chars);
                    if name.is_empty() {
                        return None;
                    }
                    parts.push(CssPart::Id(name));
                }
                '.' => {
                    chars.next();
                    let name = ident(&mut chars);
                    if name.is_empty() {
                        return None;
                    }
                    parts.push(CssPart::Class(name));
                }
                '[' => {
                    chars.next();
                    let name = ident(&mut chars);
                    if name.is_empty() {
                        return None;
                    }
                    let value = if chars.peek() == Some(&'=') {
                        chars.next();
                        let quoted = matches!(chars.peek(), Some('"' | '\''));
                        if quoted {
                            let quote = chars.next()?;
                            let mut v = String::new();
                            loop {
                                match chars.next() {
                                    Some(c) if c == quote => break,
                                    Some(c) => v.push(c),
                                    None => return None,
                                }
                            }
                            Some(v)
                        } else {
                            Some(ident(&mut chars))
                        }
                    } else {
                        None
                    };
                    if chars.next() != Some(']') {
                        return None;
                    }
                    parts.push(CssPart::Attr { name, value });
                }
                // Combinators and anything else are unsupported
                _ => return None,
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts)
        }
    }

    /// Check whether an element satisfies every part of this selector
    #[must_use]
    pub fn matches(&self, el: &ElementState) -> bool {
        let Some(parts) = &self.parts else {
            return false;
        };
        parts.iter().all(|part| match part {
            CssPart::Tag(tag) => el.tag == *tag,
            CssPart::Id(id) => el.dom_id.as_deref() == Some(id.as_str()),
            CssPart::Class(class) => el.classes.iter().any(|c| c == class),
            CssPart::Attr { name, value } => {
                let actual = match name.as_str() {
                    "placeholder" => el.placeholder.as_deref(),
                    "data-testid" => el.test_id.as_deref(),
                    "value" => Some(el.value.as_str()),
                    _ => el.attributes.get(name).map(String::as_str),
                };
                match (actual, value) {
                    (Some(actual), Some(expected)) => actual == expected,
                    (Some(_), None) => true,
                    (None, _) => false,
                }
            }
        })
    }
}

// =============================================================================
// SELECTOR
// =============================================================================

/// Selector expression: how a locator finds its candidate elements
#[derive(Debug, Clone)]
pub enum Selector {
    /// Compound simple CSS selector
    Css(CssSelector),
    /// ARIA role, with an optional accessible-name constraint
    Role {
        /// Role to match (explicit or implicit)
        role: String,
        /// Accessible-name constraint
        name: Option<TextMatch>,
    },
    /// Rendered text content
    Text(TextMatch),
    /// Placeholder text
    Placeholder(TextMatch),
    /// Test identifier (`data-testid`)
    TestId(String),
}

impl Selector {
    /// CSS selector
    #[must_use]
    pub fn css(expression: impl Into<String>) -> Self {
        Self::Css(CssSelector::parse(expression))
    }

    /// Role selector
    #[must_use]
    pub fn role(role: impl Into<String>, name: Option<TextMatch>) -> Self {
        Self::Role {
            role: role.into(),
            name,
        }
    }

    /// Text selector
    #[must_use]
    pub fn text(text: impl Into<TextMatch>) -> Self {
        Self::Text(text.into())
    }

    /// Placeholder selector
    #[must_use]
    pub fn placeholder(text: impl Into<TextMatch>) -> Self {
        Self::Placeholder(text.into())
    }

    /// Test-id selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Check whether an element satisfies this selector
    #[must_use]
    pub fn matches(&self, el: &ElementState) -> bool {
        match self {
            Self::Css(css) => css.matches(el),
            Self::Role { role, name } => {
                el.effective_role() == Some(role.as_str())
                    && name
                        .as_ref()
                        .map_or(true, |name| name.matches(el.accessible_name()))
            }
            Self::Text(text) => text.matches(&el.text),
            Self::Placeholder(text) => {
                el.placeholder.as_deref().is_some_and(|p| text.matches(p))
            }
            Self::TestId(id) => el.test_id.as_deref() == Some(id.as_str()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(css) => write!(f, "css={}", css.raw()),
            Self::Role { role, name } => match name {
                Some(name) => write!(f, "role={role}[name{name}]"),
                None => write!(f, "role={role}"),
            },
            Self::Text(text) => write!(f, "text{text}"),
            Self::Placeholder(text) => write!(f, "placeholder{text}"),
            Self::TestId(id) => write!(f, "testid={id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod text_match {
        use super::*;

        #[test]
        fn test_substring() {
            let tm = TextMatch::substring("Sauce Labs");
            assert!(tm.matches("Sauce Labs Onesie"));
            assert!(!tm.matches("Backpack"));
        }

        #[test]
        fn test_exact_trims() {
            let tm = TextMatch::exact("Apply 5s");
            assert!(tm.matches("Apply 5s"));
            assert!(tm.matches("  Apply 5s  "));
            assert!(!tm.matches("Apply 5s!"));
        }

        #[test]
        fn test_pattern() {
            let tm = TextMatch::from(Regex::new(r"^Item \d+$").unwrap());
            assert!(tm.matches("Item 24"));
            assert!(!tm.matches("Item"));
        }

        #[test]
        fn test_from_str_is_substring() {
            let tm: TextMatch = "Remove".into();
            assert!(matches!(tm, TextMatch::Substring(_)));
        }
    }

    mod css {
        use super::*;

        #[test]
        fn test_id_selector() {
            let css = CssSelector::parse("#user-name");
            let el = ElementState::new("input").with_dom_id("user-name");
            assert!(css.matches(&el));
            assert!(!css.matches(&ElementState::new("input")));
        }

        #[test]
        fn test_compound_classes() {
            let css = CssSelector::parse(".submit-button.btn_action");
            let el = ElementState::new("input")
                .with_class("submit-button")
                .with_class("btn_action");
            assert!(css.matches(&el));
            let partial = ElementState::new("input").with_class("submit-button");
            assert!(!css.matches(&partial));
        }

        #[test]
        fn test_tag_with_class() {
            let css = CssSelector::parse("button.primary");
            assert!(css.matches(&ElementState::new("button").with_class("primary")));
            assert!(!css.matches(&ElementState::new("a").with_class("primary")));
        }

        #[test]
        fn test_attribute_value() {
            let css = CssSelector::parse(r#"input[type="checkbox"]"#);
            let el = ElementState::new("input").with_attribute("type", "checkbox");
            assert!(css.matches(&el));
            let text_input = ElementState::new("input").with_attribute("type", "text");
            assert!(!css.matches(&text_input));
        }

        #[test]
        fn test_attribute_presence() {
            let css = CssSelector::parse("[disabled]");
            let el = ElementState::new("button").with_attribute("disabled", "");
            assert!(css.matches(&el));
            assert!(!css.matches(&ElementState::new("button")));
        }

        #[test]
        fn test_placeholder_attribute_reads_field() {
            let css = CssSelector::parse(r#"[placeholder="Username"]"#);
            let el = ElementState::new("input").with_placeholder("Username");
            assert!(css.matches(&el));
        }

        #[test]
        fn test_unsupported_combinator_matches_nothing() {
            let css = CssSelector::parse("div > button");
            assert!(!css.is_supported());
            assert!(!css.matches(&ElementState::new("button")));
        }

        #[test]
        fn test_empty_expression_matches_nothing() {
            let css = CssSelector::parse("");
            assert!(!css.is_supported());
        }

        #[test]
        fn test_raw_preserved_for_messages() {
            let css = CssSelector::parse("#applyButton5");
            assert_eq!(css.raw(), "#applyButton5");
        }
    }

    mod selector {
        use super::*;

        #[test]
        fn test_role_with_name() {
            let sel = Selector::role("button", Some("Login".into()));
            let el = ElementState::new("button").with_text("Login");
            assert!(sel.matches(&el));
            let other = ElementState::new("button").with_text("Cancel");
            assert!(!sel.matches(&other));
        }

        #[test]
        fn test_role_matches_implicit_checkbox() {
            let sel = Selector::role("checkbox", Some("enabled".into()));
            let el = ElementState::new("input")
                .with_attribute("type", "checkbox")
                .with_attribute("aria-label", "enabled");
            assert!(sel.matches(&el));
        }

        #[test]
        fn test_text_selector() {
            let sel = Selector::text("Data loaded with AJAX get request.");
            let el = ElementState::new("p").with_text("Data loaded with AJAX get request.");
            assert!(sel.matches(&el));
        }

        #[test]
        fn test_placeholder_selector() {
            let sel = Selector::placeholder("Password");
            let el = ElementState::new("input").with_placeholder("Password");
            assert!(sel.matches(&el));
            assert!(!sel.matches(&ElementState::new("input")));
        }

        #[test]
        fn test_test_id_selector() {
            let sel = Selector::test_id("login-button");
            let el = ElementState::new("input").with_test_id("login-button");
            assert!(sel.matches(&el));
        }

        #[test]
        fn test_display_descriptions() {
            assert_eq!(format!("{}", Selector::css("#target")), "css=#target");
            assert_eq!(
                format!("{}", Selector::role("button", Some("Login".into()))),
                "role=button[name~\"Login\"]"
            );
            assert_eq!(format!("{}", Selector::test_id("x")), "testid=x");
        }
    }
}

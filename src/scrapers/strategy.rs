//! Ordered extraction strategies.
//!
//! A cascade is a list of [`Strategy`] objects tried in order; the first one
//! that returns `Some` wins. Title, date and body each have their own cascade,
//! built from the selector-based strategies here plus the heuristic fallbacks.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::scrapers::dates;
use crate::utils::normalize_whitespace;

/// One way of locating a value in a parsed page.
pub trait Strategy<T> {
    /// Short label used in logs.
    fn name(&self) -> &str;

    fn attempt(&self, document: &Html) -> Option<T>;
}

/// Boxed cascade of strategies producing `T`.
pub type Cascade<T> = Vec<Box<dyn Strategy<T>>>;

/// Run a cascade, returning the first match and the name of the strategy
/// that produced it.
pub fn first_match<'s, T>(cascade: &'s [Box<dyn Strategy<T>>], document: &Html) -> Option<(&'s str, T)> {
    cascade.iter().find_map(|strategy| {
        let found = strategy.attempt(document);
        debug!(strategy = strategy.name(), hit = found.is_some(), "Tried strategy");
        found.map(|value| (strategy.name(), value))
    })
}

/// Parse a selector from a compile-time list.
fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

// ── Title ────────────────────────────────────────────────────────────────────

static PLATFORM_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[-|–—]\s*.*微信公众号.*$").unwrap());

static SEPARATOR_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\s*\|.*|\s+[-–—_]\s+.*)$").unwrap());

/// Remove a trailing `" - Site Name"` style suffix from a page title.
pub fn clean_title(raw: &str) -> String {
    let title = normalize_whitespace(raw);
    let title = PLATFORM_SUFFIX_RE.replace(&title, "");
    // Strip from the first separator so "Title - Section - Site" keeps "Title".
    let title = match SEPARATOR_SUFFIX_RE.find(&title) {
        Some(m) => &title[..m.start()],
        None => &title[..],
    };
    title.trim().to_string()
}

/// Text of the first element matching a selector, cleaned as a title.
pub struct TitleSelector {
    css: String,
    selector: Selector,
}

impl TitleSelector {
    pub fn new(css: &str) -> Self {
        Self {
            css: css.to_string(),
            selector: selector(css),
        }
    }
}

impl Strategy<String> for TitleSelector {
    fn name(&self) -> &str {
        &self.css
    }

    fn attempt(&self, document: &Html) -> Option<String> {
        let el = document.select(&self.selector).next()?;
        let title = clean_title(&element_text(el));
        (!title.is_empty()).then_some(title)
    }
}

// ── Date ─────────────────────────────────────────────────────────────────────

/// Text of the first element matching a selector, parsed as a date.
pub struct DateSelector {
    css: String,
    selector: Selector,
}

impl DateSelector {
    pub fn new(css: &str) -> Self {
        Self {
            css: css.to_string(),
            selector: selector(css),
        }
    }
}

impl Strategy<chrono::NaiveDate> for DateSelector {
    fn name(&self) -> &str {
        &self.css
    }

    fn attempt(&self, document: &Html) -> Option<chrono::NaiveDate> {
        let el = document.select(&self.selector).next()?;
        let text = normalize_whitespace(&element_text(el));
        let parsed = dates::parse_date_text(&text);
        if parsed.is_none() {
            debug!(selector = %self.css, %text, "Publish-time element did not parse");
        }
        parsed
    }
}

/// `content` attribute of a `<meta property=...>` tag, parsed as an ISO timestamp.
pub struct MetaDate {
    name: String,
    selector: Selector,
}

impl MetaDate {
    pub fn new(property: &str) -> Self {
        Self {
            name: format!("meta[{property}]"),
            selector: selector(&format!(r#"meta[property="{property}"]"#)),
        }
    }
}

impl Strategy<chrono::NaiveDate> for MetaDate {
    fn name(&self) -> &str {
        &self.name
    }

    fn attempt(&self, document: &Html) -> Option<chrono::NaiveDate> {
        document
            .select(&self.selector)
            .filter_map(|el| el.value().attr("content"))
            .find_map(dates::parse_iso_date)
    }
}

// ── Body ─────────────────────────────────────────────────────────────────────

/// Outer HTML of the first element matching a selector.
pub struct BodySelector {
    css: String,
    selector: Selector,
}

impl BodySelector {
    pub fn new(css: &str) -> Self {
        Self {
            css: css.to_string(),
            selector: selector(css),
        }
    }
}

impl Strategy<String> for BodySelector {
    fn name(&self) -> &str {
        &self.css
    }

    fn attempt(&self, document: &Html) -> Option<String> {
        document.select(&self.selector).next().map(|el| el.html())
    }
}

/// Elements whose text is never rendered.
const NON_RENDERED: &[&str] = &["script", "style", "noscript", "iframe", "template"];

/// Character count of the text a reader would see inside `el`.
fn rendered_text_len(el: ElementRef<'_>) -> usize {
    el.children()
        .map(|child| match child.value() {
            Node::Text(text) => text.chars().count(),
            Node::Element(e) if NON_RENDERED.contains(&e.name()) => 0,
            Node::Element(_) => ElementRef::wrap(child).map_or(0, rendered_text_len),
            _ => 0,
        })
        .sum()
}

/// Container-size heuristic: the first block container, in document order,
/// whose rendered text is longer than `min_chars` characters.
pub struct LargeContainer {
    selector: Selector,
    min_chars: usize,
}

impl LargeContainer {
    pub fn new(min_chars: usize) -> Self {
        Self {
            selector: selector("div, section, main"),
            min_chars,
        }
    }
}

impl Strategy<String> for LargeContainer {
    fn name(&self) -> &str {
        "large-container"
    }

    fn attempt(&self, document: &Html) -> Option<String> {
        document
            .select(&self.selector)
            .find(|el| rendered_text_len(*el) > self.min_chars)
            .map(|el| el.html())
    }
}

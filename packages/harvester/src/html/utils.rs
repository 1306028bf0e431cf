//! HTML utility functions for navigating and extracting text from parsed documents.

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

use crate::config::SKIPPED_TAGS;

/// Runs of whitespace, including no-break and narrow no-break spaces.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\u{00A0}\u{202F}\u{2007}]+").expect("valid regex"));

/// Inline (phrasing) tags. Their text belongs to the enclosing block.
const PHRASING_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "font",
    "i", "ins", "kbd", "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup",
    "time", "u", "var", "wbr",
];

/// Collapse whitespace runs (regular and non-breaking) to one space, trim,
/// and compose characters to NFC so that "ö" always matches "ö".
///
/// # Examples
/// ```
/// use afs_harvester::html::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("  2\u{00A0}kap.\n Allmänt "), "2 kap. Allmänt");
/// ```
pub fn normalize_whitespace(text: &str) -> String {
    let composed: String = text.nfc().collect();
    WHITESPACE_RUN.replace_all(&composed, " ").trim().to_string()
}

/// Get the lower-case tag name of an element.
pub fn tag_name<'a>(element: ElementRef<'a>) -> &'a str {
    element.value().name()
}

/// Check if an element carries the given class token.
pub fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Get an attribute value from an element.
pub fn attribute<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

/// Get all element children of an element (text and comments excluded).
pub fn element_children<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Check if the tag is a heading (`h1`..`h6`).
pub fn is_heading_tag(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Check if the tag is inline content.
pub fn is_phrasing_tag(tag: &str) -> bool {
    PHRASING_TAGS.contains(&tag)
}

/// Check if an element and its subtree must be ignored: non-content tags
/// (script, style, ...) and nodes hidden from readers.
pub fn is_skipped(element: ElementRef<'_>) -> bool {
    if SKIPPED_TAGS.contains(&tag_name(element)) {
        return true;
    }

    let value = element.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }

    value.attr("style").is_some_and(|style| {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        compact.to_ascii_lowercase().contains("display:none")
    })
}

/// Text of the element's own text nodes, excluding any child element text.
pub fn direct_text(element: ElementRef<'_>) -> String {
    let raw: Vec<&str> = element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| &**text)
        .collect();
    normalize_whitespace(&raw.join(" "))
}

/// Visible text of the element and its descendants, skipping hidden and
/// non-content subtrees.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_visible_text(element, &mut raw);
    normalize_whitespace(&raw)
}

/// Visible text of an HTML fragment, e.g. a stored element snippet.
///
/// # Examples
/// ```
/// use afs_harvester::html::fragment_text;
///
/// assert_eq!(fragment_text("<p>5&nbsp;§</p><p>Arbetsgivaren <em>ska</em></p>"), "5 § Arbetsgivaren ska");
/// ```
pub fn fragment_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    visible_text(fragment.root_element())
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !is_skipped(child_element) {
                // Block boundaries separate words even without whitespace in the markup
                let block = !is_phrasing_tag(tag_name(child_element));
                if block {
                    out.push(' ');
                }
                collect_visible_text(child_element, out);
                if block {
                    out.push(' ');
                }
            }
        }
    }
}

/// Class attribute with whitespace normalized, or `None` when absent/blank.
pub fn class_attribute(element: ElementRef<'_>) -> Option<String> {
    let classes: Vec<&str> = element.value().classes().collect();
    if classes.is_empty() {
        None
    } else {
        Some(classes.join(" "))
    }
}

/// Selector-like segment for one element: `tag.class1.class2#id`.
pub fn selector_segment(element: ElementRef<'_>) -> String {
    let mut segment = tag_name(element).to_string();
    for class in element.value().classes() {
        segment.push('.');
        segment.push_str(class);
    }
    if let Some(id) = element.value().id() {
        segment.push('#');
        segment.push_str(id);
    }
    segment
}

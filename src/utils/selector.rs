//! CSS selector helpers for the records system's WebForms markup.

use scraper::{ElementRef, Selector};

/// Parses a CSS selector with a safe fallback.
///
/// Used for selectors that come from extraction rules. If parsing fails, logs
/// an error and returns a selector that matches nothing (`*:not(*)`), so the
/// rule behaves as if its anchor were absent.
///
/// # Arguments
///
/// * `selector_str` - The CSS selector string to parse
/// * `context` - Context description for error logging (e.g., "transcript anchor")
pub fn parse_selector_with_fallback(selector_str: &str, context: &str) -> Selector {
    Selector::parse(selector_str).unwrap_or_else(|e| {
        log::error!(
            "Failed to parse CSS selector '{}' in {}: {}. Using fallback selector.",
            selector_str,
            context,
            e
        );
        parse_selector_unsafe("*:not(*)", "fallback selector")
    })
}

/// Parses a CSS selector that must succeed (for the crate's own literals).
///
/// # Panics
///
/// Panics if the selector cannot be parsed (indicates a programming error).
pub fn parse_selector_unsafe(selector_str: &str, context: &str) -> Selector {
    Selector::parse(selector_str).unwrap_or_else(|e| {
        panic!(
            "Failed to parse CSS selector '{}' in {}: {}. This is a programming error.",
            selector_str, context, e
        )
    })
}

/// Selector for a WebForms control by the end of its generated id.
///
/// WebForms prefixes control ids with their naming containers
/// (`ctl00_ContentPlaceHolder1_...`), so only the suffix is stable.
pub fn id_suffix_selector(suffix: &str, context: &str) -> Selector {
    parse_selector_with_fallback(&format!("[id$='{suffix}']"), context)
}

/// Text content of an element, joined with spaces (so `<br>` separates words).
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

//! Utility functions.
//!
//! This module provides:
//! - CSS selector parsing utilities
//! - Element text helpers

mod selector;

pub use selector::{element_text, id_suffix_selector, parse_selector_unsafe, parse_selector_with_fallback};

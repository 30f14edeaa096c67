//! Hidden form fields (view state, anti-forgery tokens) replayed on postbacks.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::utils::parse_selector_unsafe;

static FORM: LazyLock<Selector> = LazyLock::new(|| parse_selector_unsafe("form", "form lookup"));
static INPUT: LazyLock<Selector> = LazyLock::new(|| parse_selector_unsafe("input", "form inputs"));

/// Hidden fields of the most recent form seen, plus that form's action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormTokens {
    fields: Vec<(String, String)>,
    action: Option<String>,
}

impl FormTokens {
    /// The hidden fields in document order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// The form's `action` attribute, when present and non-empty.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Value of a hidden field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether at least one of `names` is present with a non-empty value.
    pub fn has_any(&self, names: &[String]) -> bool {
        names
            .iter()
            .any(|name| self.get(name).is_some_and(|v| !v.is_empty()))
    }

    /// Builds a postback body: hidden fields first, then `explicit`.
    ///
    /// A hidden field that `explicit` also names is dropped, so explicit
    /// values win (WebForms pages carry an empty `__EVENTTARGET` input).
    pub fn merge(self, explicit: Vec<(String, String)>) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = self
            .fields
            .into_iter()
            .filter(|(name, _)| !explicit.iter().any(|(k, _)| k == name))
            .collect();
        form.extend(explicit);
        form
    }
}

/// Collects the hidden inputs of the first form that has any.
///
/// Returns `None` when the document contains no form with hidden inputs.
pub fn extract_form_tokens(html: &str) -> Option<FormTokens> {
    let document = Html::parse_document(html);
    document.select(&FORM).find_map(|form| {
        let fields = hidden_inputs(form);
        if fields.is_empty() {
            return None;
        }
        let action = form
            .value()
            .attr("action")
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| a.replace("&amp;", "&"));
        Some(FormTokens { fields, action })
    })
}

fn hidden_inputs(form: ElementRef<'_>) -> Vec<(String, String)> {
    form.select(&INPUT)
        .filter(|input| {
            input
                .value()
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"))
        })
        .filter_map(|input| {
            let name = input.value().attr("name")?.trim();
            if name.is_empty() {
                return None;
            }
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Whether the document is the login form (it has the password input).
pub fn is_login_form(html: &str, password_field: &str) -> bool {
    let document = Html::parse_document(html);
    document.select(&INPUT).any(|input| {
        let attrs = input.value();
        attrs.attr("name") == Some(password_field)
            || attrs
                .attr("id")
                .is_some_and(|id| id.ends_with(password_field))
    })
}

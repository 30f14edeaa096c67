//! Authentication state and the anti-forgery token lifecycle.
//!
//! A `Session` holds everything the records system expects a browser to carry
//! between requests: cookies, the hidden fields of the last form served, and
//! whether the login went through. `SessionManager` drives the state machine:
//!
//! ```text
//! Anonymous --login--> Authenticated --expiry--> Expired --re-auth--> Authenticated
//!                                                   \--re-auth fails--> Anonymous
//! ```
//!
//! All mutation goes through `&mut Session`, so two requests can never replay
//! the same token set concurrently.

mod manager;
mod tokens;

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use url::Url;

pub use manager::SessionManager;
pub use tokens::{extract_form_tokens, is_login_form, FormTokens};

use crate::config::LoginFields;
use crate::transport::HttpResponse;

/// Authentication status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
    Expired,
}

/// Login credentials, with optional form field name overrides.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
    /// Overrides `Config::login_fields` for this login
    pub fields: Option<LoginFields>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: LoginFields) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("fields", &self.fields)
            .finish()
    }
}

/// Per-client session state.
#[derive(Debug, Clone)]
pub struct Session {
    base_url: Url,
    state: AuthState,
    cookies: BTreeMap<String, String>,
    tokens: Option<FormTokens>,
    credentials: Option<Credentials>,
}

impl Session {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            state: AuthState::Anonymous,
            cookies: BTreeMap::new(),
            tokens: None,
            credentials: None,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// `Cookie` header value for the stored cookies, if any.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Hidden fields of the last form seen, if not yet consumed.
    pub fn tokens(&self) -> Option<&FormTokens> {
        self.tokens.as_ref()
    }

    /// Consumes the stored tokens; the next postback needs fresh ones.
    pub fn take_tokens(&mut self) -> FormTokens {
        self.tokens.take().unwrap_or_default()
    }

    pub(crate) fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Applies `Set-Cookie` headers and replaces tokens if the body has a form.
    pub fn absorb(&mut self, response: &HttpResponse) {
        self.absorb_cookies(response);
        if let Some(tokens) = extract_form_tokens(&response.body) {
            debug!("Captured {} hidden form fields", tokens.fields().len());
            self.tokens = Some(tokens);
        }
    }

    fn absorb_cookies(&mut self, response: &HttpResponse) {
        for header in response.set_cookies() {
            let mut parts = header.split(';');
            let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let cleared = value.trim().is_empty()
                || parts.any(|attr| attr.trim().eq_ignore_ascii_case("max-age=0"));
            if cleared {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.trim().to_string());
            }
        }
    }

    /// Resolves `target` against `from` (a path on the base URL) to a request path.
    ///
    /// Targets on the same origin become `path?query`; others stay absolute.
    pub fn resolve(&self, from: &str, target: &str) -> Option<String> {
        let url = self.base_url.join(from).ok()?.join(target).ok()?;
        if url.origin() == self.base_url.origin() {
            Some(match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            })
        } else {
            Some(url.to_string())
        }
    }

    /// Path component of `target` resolved against the base URL.
    pub fn path_of(&self, target: &str) -> Option<String> {
        self.base_url
            .join(target)
            .ok()
            .map(|url| url.path().to_string())
    }

    pub(crate) fn mark_authenticated(&mut self, credentials: Credentials) {
        self.state = AuthState::Authenticated;
        self.credentials = Some(credentials);
    }

    pub(crate) fn mark_expired(&mut self) {
        if self.state == AuthState::Authenticated {
            self.state = AuthState::Expired;
        }
    }

    /// Forgets cookies, tokens and credentials.
    pub fn reset(&mut self) {
        self.state = AuthState::Anonymous;
        self.cookies.clear();
        self.tokens = None;
        self.credentials = None;
    }
}

//! Error type definitions.
//!
//! This module defines the error, failure-reason and warning types used
//! throughout the client.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

use crate::pages::PageKind;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// The configured base URL cannot be parsed.
    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}

/// Failure of the transport to deliver a request or read its response.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Error raised by the HTTP client.
    #[error("HTTP request failed ({kind}): {source}")]
    Request {
        kind: NetworkErrorKind,
        #[source]
        source: ReqwestError,
    },

    /// The request path could not be resolved against the base URL.
    #[error("Invalid request URL '{0}'")]
    InvalidUrl(String),
}

impl From<ReqwestError> for TransportError {
    fn from(source: ReqwestError) -> Self {
        TransportError::Request {
            kind: super::categorize_reqwest_error(&source),
            source,
        }
    }
}

/// Coarse category of a network failure, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum NetworkErrorKind {
    Builder,
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Other,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NetworkErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkErrorKind::Builder => "request builder error",
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Connect => "connect error",
            NetworkErrorKind::Request => "request error",
            NetworkErrorKind::Body => "body error",
            NetworkErrorKind::Decode => "decode error",
            NetworkErrorKind::Other => "other error",
        }
    }
}

/// Why a login attempt failed.
#[derive(Error, Debug)]
pub enum AuthFailure {
    /// The server answered with the login form again.
    #[error("Login rejected: bad credentials")]
    BadCredentials,

    /// The login page carried none of the expected anti-forgery fields.
    #[error("Login page has no anti-forgery token")]
    TokenMissing,

    /// The response matched neither the success marker nor the login form.
    #[error("Unexpected login response (HTTP {status})")]
    UnexpectedResponse { status: u16 },

    /// The transport failed.
    #[error("Network error during login: {0}")]
    Network(#[from] TransportError),
}

/// Why a page's structural anchor could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureReason {
    /// None of the rule's anchors occur in the markup
    AnchorMissing,
    /// The page is populated by client-side script
    ScriptRendered,
    /// No extraction rule is registered for the page
    NoRule,
}

impl std::fmt::Display for StructureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StructureReason::AnchorMissing => "structural anchor not found",
            StructureReason::ScriptRendered => "page content is rendered by client-side script",
            StructureReason::NoRule => "no extraction rule registered",
        })
    }
}

/// Errors surfaced by the client's public operations.
#[derive(Error, Debug)]
pub enum ObsError {
    /// Transport failure, surfaced as-is.
    #[error(transparent)]
    Network(#[from] TransportError),

    /// A login attempt failed.
    #[error("Authentication failed: {0}")]
    AuthFailed(#[from] AuthFailure),

    /// The operation needs an authenticated session.
    #[error("Not logged in")]
    NotAuthenticated,

    /// The session expired and the single re-authentication did not help.
    #[error("Session expired")]
    SessionExpired,

    /// The server answered with an error status or the login page.
    #[error("Page needs re-authentication (HTTP {status})")]
    NeedsReauth { status: u16 },

    /// The page's expected layout is absent.
    #[error("Structure not found on {page} page: {reason}")]
    StructureNotFound {
        page: PageKind,
        reason: StructureReason,
    },
}

/// Kind of a non-fatal extraction problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The row was skipped because a key field is absent
    MalformedRow,
    /// A field could not be located; the record is partial
    MissingField,
    /// A field was located but its value could not be parsed
    UnparseableValue,
}

impl WarningKind {
    /// Returns a human-readable string representation of the warning kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::MalformedRow => "Malformed row skipped",
            WarningKind::MissingField => "Missing field",
            WarningKind::UnparseableValue => "Unparseable value",
        }
    }
}

//! Error handling.
//!
//! This module provides:
//! - Error type definitions for initialization, transport, login and page operations
//! - Network error categorization
//! - Warning kinds for partial extraction
//!
//! Failures are categorized into:
//! - **Errors**: page- or login-level failures returned to the caller
//! - **Warnings**: skipped rows and missing fields, carried alongside records

mod categorization;
mod types;

// Re-export public API
pub use categorization::categorize_reqwest_error;
pub use types::{
    AuthFailure, InitializationError, NetworkErrorKind, ObsError, StructureReason, TransportError,
    WarningKind,
};

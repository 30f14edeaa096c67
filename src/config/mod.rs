//! Client configuration and constants.
//!
//! This module provides:
//! - Default values for the login form, page paths and analytics thresholds
//! - HTTP header name constants
//! - The `Config` and `AnalyticsConfig` structs consumed by the core

mod constants;
mod headers;
mod types;

// Re-export all constants
pub use constants::*;
pub use headers::*;
pub use types::{AnalyticsConfig, Config, LogFormat, LogLevel, LoginFields, SuccessMarker};

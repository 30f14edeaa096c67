//! HTTP header name constants.
//!
//! Response header names are stored lowercased by the transport, so lookups
//! use the lowercase forms.

/// Request header carrying the session cookies
pub const HEADER_COOKIE: &str = "Cookie";
/// Response header setting a cookie
pub const HEADER_SET_COOKIE: &str = "set-cookie";
/// Redirect target of a 3xx response
pub const HEADER_LOCATION: &str = "location";
/// Some WebForms pages need a referer matching the login page on POST
pub const HEADER_REFERER: &str = "Referer";

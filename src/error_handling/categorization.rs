//! Network error categorization.

use super::types::NetworkErrorKind;

/// Categorizes a `reqwest::Error` into a `NetworkErrorKind`.
///
/// The records system sits behind slow campus links, so timeouts and connect
/// failures are worth telling apart in the logs.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> NetworkErrorKind {
    if error.is_builder() {
        NetworkErrorKind::Builder
    } else if error.is_timeout() {
        NetworkErrorKind::Timeout
    } else if error.is_connect() {
        NetworkErrorKind::Connect
    } else if error.is_request() {
        NetworkErrorKind::Request
    } else if error.is_body() {
        NetworkErrorKind::Body
    } else if error.is_decode() {
        NetworkErrorKind::Decode
    } else {
        NetworkErrorKind::Other
    }
}
